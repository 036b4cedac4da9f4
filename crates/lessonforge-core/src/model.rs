//! Core data model types for lessonforge.
//!
//! These are the fundamental types the whole system uses to represent
//! lessons, quizzes, questions, responses, and in-progress attempts.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QuizError;

/// The closed set of question kinds the engine can grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultiChoice,
    Ordering,
}

impl QuestionKind {
    /// Whether options of this kind are shown in a per-attempt shuffled order.
    pub fn is_shuffled(self) -> bool {
        matches!(self, QuestionKind::SingleChoice | QuestionKind::MultiChoice)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::SingleChoice => write!(f, "single_choice"),
            QuestionKind::MultiChoice => write!(f, "multi_choice"),
            QuestionKind::Ordering => write!(f, "ordering"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_choice" | "multiple_choice" => Ok(QuestionKind::SingleChoice),
            "multi_choice" | "multiple_select" => Ok(QuestionKind::MultiChoice),
            "ordering" => Ok(QuestionKind::Ordering),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// The canonical correct answer of a question, in canonical index space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerKey {
    SingleChoice { correct_answer: usize },
    MultiChoice { correct_answers: Vec<usize> },
    Ordering { correct_order: Vec<usize> },
}

impl AnswerKey {
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerKey::SingleChoice { .. } => QuestionKind::SingleChoice,
            AnswerKey::MultiChoice { .. } => QuestionKind::MultiChoice,
            AnswerKey::Ordering { .. } => QuestionKind::Ordering,
        }
    }

    /// Check that the key only references options in `0..option_count`.
    ///
    /// Ordering keys must additionally be a full permutation of the option
    /// pool, and multi-choice keys may not repeat an index.
    pub fn validate(&self, question: usize, option_count: usize) -> Result<(), QuizError> {
        let invalid = |reason: String| QuizError::InvalidQuestionDefinition { question, reason };

        match self {
            AnswerKey::SingleChoice { correct_answer } => {
                if *correct_answer >= option_count {
                    return Err(invalid(format!(
                        "correct_answer {correct_answer} is outside 0..{option_count}"
                    )));
                }
            }
            AnswerKey::MultiChoice { correct_answers } => {
                let mut seen = HashSet::new();
                for &idx in correct_answers {
                    if idx >= option_count {
                        return Err(invalid(format!(
                            "correct_answers entry {idx} is outside 0..{option_count}"
                        )));
                    }
                    if !seen.insert(idx) {
                        return Err(invalid(format!("correct_answers repeats index {idx}")));
                    }
                }
            }
            AnswerKey::Ordering { correct_order } => {
                if correct_order.len() != option_count {
                    return Err(invalid(format!(
                        "correct_order has {} entries but there are {option_count} options",
                        correct_order.len()
                    )));
                }
                let mut seen = HashSet::new();
                for &idx in correct_order {
                    if idx >= option_count || !seen.insert(idx) {
                        return Err(invalid(format!(
                            "correct_order is not a permutation of 0..{option_count}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether `canonical` (already in canonical space) matches this key.
    ///
    /// Multi-choice requires the exact set; there is no partial credit.
    pub fn matches(&self, question: usize, canonical: &Response) -> Result<bool, QuizError> {
        match (self, canonical) {
            (AnswerKey::SingleChoice { correct_answer }, Response::SingleChoice(idx)) => {
                Ok(idx == correct_answer)
            }
            (AnswerKey::MultiChoice { correct_answers }, Response::MultiChoice(selected)) => {
                let expected: BTreeSet<usize> = correct_answers.iter().copied().collect();
                Ok(&expected == selected)
            }
            (AnswerKey::Ordering { correct_order }, Response::Ordering(order)) => {
                Ok(order == correct_order)
            }
            (key, response) => Err(QuizError::ResponseKindMismatch {
                question,
                expected: key.kind(),
                actual: response.kind(),
            }),
        }
    }

    /// Canonical indices that are part of the correct answer.
    pub fn correct_indices(&self) -> BTreeSet<usize> {
        match self {
            AnswerKey::SingleChoice { correct_answer } => BTreeSet::from([*correct_answer]),
            AnswerKey::MultiChoice { correct_answers } => correct_answers.iter().copied().collect(),
            AnswerKey::Ordering { correct_order } => correct_order.iter().copied().collect(),
        }
    }
}

/// One evaluable question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Display text.
    pub prompt: String,
    /// Options in canonical order; position `i` is canonical index `i`.
    pub options: Vec<String>,
    /// Canonical correct answer.
    #[serde(flatten)]
    pub answer: AnswerKey,
    /// Shown after submission.
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        self.answer.kind()
    }

    /// Validate the answer key against this question's options.
    pub fn validate(&self, index: usize) -> Result<(), QuizError> {
        self.answer.validate(index, self.options.len())
    }
}

/// An ordered list of questions plus display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    /// Unique quiz identifier.
    pub id: u32,
    /// Human-readable title.
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Lesson this quiz belongs to, if any.
    #[serde(default)]
    pub lesson_id: Option<u32>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A unit of static lesson content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number; lessons unlock in ascending id order.
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Markdown body.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
}

impl Lesson {
    /// A lesson is open once every earlier lesson is complete, i.e. the
    /// completed lessons plus the next one.
    pub fn is_unlocked(&self, progress: u32) -> bool {
        self.id <= progress.saturating_add(1)
    }
}

/// A user's answer to one question.
///
/// Choice responses are in presentation space (positions in the shuffled
/// list the user saw); ordering responses are canonical option indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Response {
    SingleChoice(usize),
    MultiChoice(BTreeSet<usize>),
    Ordering(Vec<usize>),
}

impl Response {
    pub fn kind(&self) -> QuestionKind {
        match self {
            Response::SingleChoice(_) => QuestionKind::SingleChoice,
            Response::MultiChoice(_) => QuestionKind::MultiChoice,
            Response::Ordering(_) => QuestionKind::Ordering,
        }
    }

    /// Convenience constructor for a multi-choice selection.
    pub fn multi(selected: impl IntoIterator<Item = usize>) -> Self {
        Response::MultiChoice(selected.into_iter().collect())
    }
}

/// Per-attempt option order: `presented[j]` is the canonical index of the
/// option displayed at position `j`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresentationMapping(Vec<usize>);

impl PresentationMapping {
    /// The unshuffled order.
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// A uniformly random permutation of `0..n`.
    pub fn shuffled<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        Self(order)
    }

    /// Build a mapping from an explicit order, rejecting non-permutations.
    pub fn from_order(order: Vec<usize>) -> Option<Self> {
        let mapping = Self(order);
        mapping.is_permutation().then_some(mapping)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Canonical index of the option shown at `presented`.
    pub fn canonical(&self, presented: usize) -> Option<usize> {
        self.0.get(presented).copied()
    }

    /// Display position of canonical option `canonical`.
    pub fn presented(&self, canonical: usize) -> Option<usize> {
        self.0.iter().position(|&c| c == canonical)
    }

    pub fn is_permutation(&self) -> bool {
        let mut sorted = self.0.clone();
        sorted.sort_unstable();
        sorted.iter().enumerate().all(|(i, &c)| i == c)
    }
}

/// Lifecycle of an attempt: `NotStarted -> Started -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    Started,
    Completed,
}

/// Transient state of one user working through one quiz.
///
/// The calling layer owns the value and passes it to every engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Unique attempt identifier.
    pub id: Uuid,
    pub quiz_id: u32,
    pub status: AttemptStatus,
    /// Responses keyed by question index.
    #[serde(default)]
    pub responses: BTreeMap<usize, Response>,
    /// Option order for each shuffled question, keyed by question index.
    #[serde(default)]
    pub presentation_mappings: BTreeMap<usize, PresentationMapping>,
    /// Percentage in `0.0..=100.0`, set on submission.
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Attempt {
    /// The not-yet-started attempt created when a quiz is selected.
    pub fn new(quiz_id: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            quiz_id,
            status: AttemptStatus::NotStarted,
            responses: BTreeMap::new(),
            presentation_mappings: BTreeMap::new(),
            score: 0.0,
            started_at: None,
            completed_at: None,
        }
    }

    /// True once the attempt has been started, including after submission.
    pub fn is_started(&self) -> bool {
        self.status != AttemptStatus::NotStarted
    }

    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }

    pub fn mapping(&self, question: usize) -> Option<&PresentationMapping> {
        self.presentation_mappings.get(&question)
    }

    pub fn response(&self, question: usize) -> Option<&Response> {
        self.responses.get(&question)
    }
}

//! The quiz engine.
//!
//! Starts attempts with a fresh option shuffle, records responses, and grades
//! submissions by mapping presentation-space responses back to canonical
//! indices. A `Quiz` is never written to: everything derived from a shuffle
//! lives on the `Attempt`.

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::error::QuizError;
use crate::model::{Attempt, AttemptStatus, PresentationMapping, Question, Quiz, Response};

/// Start a new attempt, shuffling every choice question's options.
pub fn start_attempt(quiz: &Quiz) -> Attempt {
    start_attempt_with_rng(quiz, &mut rand::rng())
}

/// Start a new attempt using the supplied generator for the shuffles.
pub fn start_attempt_with_rng<R: Rng + ?Sized>(quiz: &Quiz, rng: &mut R) -> Attempt {
    let mut attempt = Attempt::new(quiz.id);

    for (i, question) in quiz.questions.iter().enumerate() {
        if question.kind().is_shuffled() {
            attempt
                .presentation_mappings
                .insert(i, PresentationMapping::shuffled(question.options.len(), rng));
        }
    }

    attempt.status = AttemptStatus::Started;
    attempt.started_at = Some(Utc::now());

    tracing::debug!(
        quiz_id = quiz.id,
        attempt_id = %attempt.id,
        shuffled = attempt.presentation_mappings.len(),
        "started quiz attempt"
    );
    attempt
}

/// Discard the previous attempt and start over with a fresh shuffle.
pub fn retry(quiz: &Quiz) -> Attempt {
    start_attempt(quiz)
}

/// Store `response` for `question_index`, replacing any earlier response.
///
/// The index is not checked against the quiz; use
/// [`record_response_checked`] at an untrusted boundary.
pub fn record_response(
    attempt: &mut Attempt,
    question_index: usize,
    response: Response,
) -> Result<(), QuizError> {
    match attempt.status {
        AttemptStatus::NotStarted => Err(QuizError::AttemptNotStarted),
        AttemptStatus::Completed => Err(QuizError::AttemptCompleted),
        AttemptStatus::Started => {
            attempt.responses.insert(question_index, response);
            Ok(())
        }
    }
}

/// Like [`record_response`], but first checks the question index, the
/// response kind, and that choice indices fall inside the presented list.
pub fn record_response_checked(
    attempt: &mut Attempt,
    quiz: &Quiz,
    question_index: usize,
    response: Response,
) -> Result<(), QuizError> {
    if attempt.quiz_id != quiz.id {
        return Err(QuizError::QuizMismatch {
            attempt_quiz: attempt.quiz_id,
            quiz: quiz.id,
        });
    }

    let question = quiz
        .questions
        .get(question_index)
        .ok_or_else(|| QuizError::OutOfRangeResponse {
            question: question_index,
            reason: format!("quiz has {} questions", quiz.questions.len()),
        })?;

    if question.kind() != response.kind() {
        return Err(QuizError::ResponseKindMismatch {
            question: question_index,
            expected: question.kind(),
            actual: response.kind(),
        });
    }

    let option_count = question.options.len();
    let indices: Vec<usize> = match &response {
        Response::SingleChoice(idx) => vec![*idx],
        Response::MultiChoice(selected) => selected.iter().copied().collect(),
        Response::Ordering(order) => order.clone(),
    };
    if let Some(bad) = indices.iter().find(|&&idx| idx >= option_count) {
        return Err(QuizError::OutOfRangeResponse {
            question: question_index,
            reason: format!("option {bad} is outside 0..{option_count}"),
        });
    }

    record_response(attempt, question_index, response)
}

/// Map a recorded response into canonical index space.
///
/// Choice responses go through `mapping` when there is one; without a
/// mapping no shuffle happened and the response is already canonical.
/// Ordering responses are always canonical.
pub fn resolve_response(
    question_index: usize,
    question: &Question,
    mapping: Option<&PresentationMapping>,
    response: &Response,
) -> Result<Response, QuizError> {
    if question.kind() != response.kind() {
        return Err(QuizError::ResponseKindMismatch {
            question: question_index,
            expected: question.kind(),
            actual: response.kind(),
        });
    }

    let option_count = question.options.len();
    let to_canonical = |presented: usize| -> Result<usize, QuizError> {
        let canonical = match mapping {
            Some(m) => m.canonical(presented),
            None => (presented < option_count).then_some(presented),
        };
        canonical.ok_or_else(|| QuizError::OutOfRangeResponse {
            question: question_index,
            reason: format!("presented option {presented} is outside 0..{option_count}"),
        })
    };

    match response {
        Response::SingleChoice(presented) => Ok(Response::SingleChoice(to_canonical(*presented)?)),
        Response::MultiChoice(selected) => Ok(Response::MultiChoice(
            selected
                .iter()
                .map(|&p| to_canonical(p))
                .collect::<Result<_, _>>()?,
        )),
        Response::Ordering(order) => Ok(Response::Ordering(order.clone())),
    }
}

/// Options of `question` in the order the user sees them.
pub fn presented_options<'a>(
    question: &'a Question,
    mapping: Option<&PresentationMapping>,
) -> Vec<&'a str> {
    match mapping {
        Some(m) => m
            .as_slice()
            .iter()
            .filter_map(|&c| question.options.get(c).map(String::as_str))
            .collect(),
        None => question.options.iter().map(String::as_str).collect(),
    }
}

/// How a single question fared in a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOutcome {
    Correct,
    Incorrect,
    Unanswered,
    /// Grading failed; see [`Submission::failures`]. Counts as incorrect.
    Failed,
}

/// A question that could not be graded.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionFailure {
    pub question: usize,
    pub error: QuizError,
}

/// Result of grading a submitted attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub attempt_id: Uuid,
    pub quiz_id: u32,
    /// Percentage of questions answered correctly.
    pub score: f64,
    pub correct: usize,
    pub total: usize,
    /// One outcome per question, in quiz order.
    pub outcomes: Vec<QuestionOutcome>,
    pub failures: Vec<QuestionFailure>,
}

impl Submission {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Grade `attempt` against `quiz` and mark it completed.
///
/// Unanswered questions count as incorrect. A question whose definition or
/// response cannot be graded is recorded in `failures` and also counts as
/// incorrect; the rest of the quiz still grades normally.
pub fn submit(attempt: &mut Attempt, quiz: &Quiz) -> Result<Submission, QuizError> {
    match attempt.status {
        AttemptStatus::NotStarted => return Err(QuizError::AttemptNotStarted),
        AttemptStatus::Completed => return Err(QuizError::AttemptCompleted),
        AttemptStatus::Started => {}
    }
    if attempt.quiz_id != quiz.id {
        return Err(QuizError::QuizMismatch {
            attempt_quiz: attempt.quiz_id,
            quiz: quiz.id,
        });
    }

    let total = quiz.questions.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut failures = Vec::new();
    let mut correct = 0usize;

    for (i, question) in quiz.questions.iter().enumerate() {
        let graded = question.validate(i).and_then(|()| {
            attempt
                .response(i)
                .map(|response| grade_question(i, question, attempt.mapping(i), response))
                .transpose()
        });

        let outcome = match graded {
            Ok(None) => QuestionOutcome::Unanswered,
            Ok(Some(true)) => {
                correct += 1;
                QuestionOutcome::Correct
            }
            Ok(Some(false)) => QuestionOutcome::Incorrect,
            Err(error) => {
                tracing::warn!(quiz_id = quiz.id, question = i, "could not grade: {error}");
                failures.push(QuestionFailure { question: i, error });
                QuestionOutcome::Failed
            }
        };
        outcomes.push(outcome);
    }

    for &stray in attempt.responses.keys().filter(|&&i| i >= total) {
        failures.push(QuestionFailure {
            question: stray,
            error: QuizError::OutOfRangeResponse {
                question: stray,
                reason: format!("quiz has {total} questions"),
            },
        });
    }

    let score = score_percentage(correct, total);
    attempt.status = AttemptStatus::Completed;
    attempt.score = score;
    attempt.completed_at = Some(Utc::now());

    tracing::info!(
        quiz_id = quiz.id,
        attempt_id = %attempt.id,
        correct,
        total,
        failed = failures.len(),
        "graded quiz attempt: {score:.1}%"
    );

    Ok(Submission {
        attempt_id: attempt.id,
        quiz_id: quiz.id,
        score,
        correct,
        total,
        outcomes,
        failures,
    })
}

fn grade_question(
    index: usize,
    question: &Question,
    mapping: Option<&PresentationMapping>,
    response: &Response,
) -> Result<bool, QuizError> {
    let canonical = resolve_response(index, question, mapping, response)?;
    question.answer.matches(index, &canonical)
}

/// `100 * correct / total`, or `0` for an empty quiz.
pub fn score_percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * correct as f64 / total as f64
}

/// Feedback band shown alongside a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    NeedsReview,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ScoreBand::Excellent
        } else if score >= 60.0 {
            ScoreBand::Good
        } else {
            ScoreBand::NeedsReview
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Great job!",
            ScoreBand::Good => "Good effort!",
            ScoreBand::NeedsReview => "Keep learning!",
        }
    }
}

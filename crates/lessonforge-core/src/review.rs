//! Post-submission answer review.
//!
//! Computes, per question, which options to highlight as correct, wrongly
//! selected, or missed. Correct answers are translated into presentation
//! order on demand from the attempt's mapping.

use serde::{Deserialize, Serialize};

use crate::engine::resolve_response;
use crate::model::{AnswerKey, Attempt, PresentationMapping, Question, Quiz, Response};

/// Highlight for one option in a choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    /// Part of the correct answer and selected.
    Correct,
    /// Selected but not part of the correct answer.
    SelectedWrong,
    /// Part of the correct answer but not selected.
    Missed,
    Neutral,
}

impl Mark {
    pub fn symbol(self) -> &'static str {
        match self {
            Mark::Correct => "[x]",
            Mark::SelectedWrong => "[!]",
            Mark::Missed => "[ ]*",
            Mark::Neutral => "[ ]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewedOption {
    pub text: String,
    pub canonical_index: usize,
    pub mark: Mark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStep {
    pub text: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewBody {
    /// Options listed in the order the user saw them.
    Choice { options: Vec<ReviewedOption> },
    Ordering {
        correct_order: Vec<String>,
        /// The user's order with per-position correctness; empty if unanswered.
        user_order: Vec<OrderStep>,
    },
    /// The question could not be reviewed (bad definition or response).
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub index: usize,
    pub prompt: String,
    pub answered: bool,
    pub body: ReviewBody,
    pub explanation: String,
}

/// Review one question given its mapping and the user's response.
pub fn review_question(
    index: usize,
    question: &Question,
    mapping: Option<&PresentationMapping>,
    response: Option<&Response>,
) -> QuestionReview {
    let body = match build_body(index, question, mapping, response) {
        Ok(body) => body,
        Err(reason) => ReviewBody::Unavailable { reason },
    };

    QuestionReview {
        index,
        prompt: question.prompt.clone(),
        answered: response.is_some(),
        body,
        explanation: question.explanation.clone(),
    }
}

/// Review every question of a quiz for an attempt.
pub fn review_attempt(attempt: &Attempt, quiz: &Quiz) -> Vec<QuestionReview> {
    quiz.questions
        .iter()
        .enumerate()
        .map(|(i, q)| review_question(i, q, attempt.mapping(i), attempt.response(i)))
        .collect()
}

fn build_body(
    index: usize,
    question: &Question,
    mapping: Option<&PresentationMapping>,
    response: Option<&Response>,
) -> Result<ReviewBody, String> {
    question.validate(index).map_err(|e| e.to_string())?;

    let canonical = response
        .map(|r| resolve_response(index, question, mapping, r))
        .transpose()
        .map_err(|e| e.to_string())?;

    if let AnswerKey::Ordering { correct_order } = &question.answer {
        let text = |idx: usize| question.options.get(idx).cloned().unwrap_or_default();
        let user_order = match canonical {
            Some(Response::Ordering(order)) => order
                .iter()
                .enumerate()
                .map(|(pos, &idx)| OrderStep {
                    text: text(idx),
                    correct: correct_order.get(pos) == Some(&idx),
                })
                .collect(),
            _ => Vec::new(),
        };
        return Ok(ReviewBody::Ordering {
            correct_order: correct_order.iter().map(|&idx| text(idx)).collect(),
            user_order,
        });
    }

    let selected: Vec<usize> = match canonical {
        Some(Response::SingleChoice(idx)) => vec![idx],
        Some(Response::MultiChoice(set)) => set.into_iter().collect(),
        _ => Vec::new(),
    };
    let correct = question.answer.correct_indices();

    let order: Vec<usize> = match mapping {
        Some(m) => m.as_slice().to_vec(),
        None => (0..question.options.len()).collect(),
    };

    let options = order
        .into_iter()
        .filter_map(|idx| {
            let text = question.options.get(idx)?.clone();
            let mark = match (correct.contains(&idx), selected.contains(&idx)) {
                (true, true) => Mark::Correct,
                (false, true) => Mark::SelectedWrong,
                (true, false) => Mark::Missed,
                (false, false) => Mark::Neutral,
            };
            Some(ReviewedOption {
                text,
                canonical_index: idx,
                mark,
            })
        })
        .collect();

    Ok(ReviewBody::Choice { options })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multi_question() -> Question {
        Question {
            prompt: "Which are fruit?".into(),
            options: vec!["apple".into(), "carrot".into(), "pear".into()],
            answer: AnswerKey::MultiChoice {
                correct_answers: vec![0, 2],
            },
            explanation: "Apples and pears grow on trees.".into(),
        }
    }

    #[test]
    fn choice_review_uses_presented_order() {
        let question = multi_question();
        let mapping = PresentationMapping::from_order(vec![2, 1, 0]).unwrap();
        // Presented: pear, carrot, apple. User picks pear and carrot.
        let response = Response::multi([0, 1]);

        let review = review_question(0, &question, Some(&mapping), Some(&response));
        let ReviewBody::Choice { options } = review.body else {
            panic!("expected choice review");
        };
        let marks: Vec<(&str, Mark)> = options.iter().map(|o| (o.text.as_str(), o.mark)).collect();
        assert_eq!(
            marks,
            vec![
                ("pear", Mark::Correct),
                ("carrot", Mark::SelectedWrong),
                ("apple", Mark::Missed),
            ]
        );
        assert!(review.answered);
    }

    #[test]
    fn unanswered_choice_marks_missed() {
        let question = multi_question();
        let review = review_question(0, &question, None, None);
        let ReviewBody::Choice { options } = review.body else {
            panic!("expected choice review");
        };
        assert_eq!(options[0].mark, Mark::Missed);
        assert_eq!(options[1].mark, Mark::Neutral);
        assert!(!review.answered);
    }

    #[test]
    fn ordering_review_marks_positions() {
        let question = Question {
            prompt: "Order".into(),
            options: vec!["first".into(), "second".into(), "third".into()],
            answer: AnswerKey::Ordering {
                correct_order: vec![0, 1, 2],
            },
            explanation: String::new(),
        };
        let response = Response::Ordering(vec![1, 0, 2]);
        let review = review_question(0, &question, None, Some(&response));
        let ReviewBody::Ordering {
            correct_order,
            user_order,
        } = review.body
        else {
            panic!("expected ordering review");
        };
        assert_eq!(correct_order, vec!["first", "second", "third"]);
        let flags: Vec<bool> = user_order.iter().map(|s| s.correct).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn invalid_question_is_unavailable() {
        let mut question = multi_question();
        question.answer = AnswerKey::SingleChoice { correct_answer: 8 };
        let review = review_question(3, &question, None, None);
        assert!(matches!(review.body, ReviewBody::Unavailable { .. }));
    }
}

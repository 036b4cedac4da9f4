//! Quiz engine error types.
//!
//! Defined once in `lessonforge-core` so the shell can match on the failure
//! class (missing content, bad authoring, bad caller input) without string
//! matching.

use thiserror::Error;

use crate::model::QuestionKind;

/// Errors raised by the quiz engine and the content repository.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuizError {
    /// The requested quiz or lesson id is not in the content repository.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u32 },

    /// A question's answer key references options that do not exist.
    #[error("question {question} is invalid: {reason}")]
    InvalidQuestionDefinition { question: usize, reason: String },

    /// The caller used a question index or option index outside the quiz.
    #[error("response out of range for question {question}: {reason}")]
    OutOfRangeResponse { question: usize, reason: String },

    /// The recorded response does not match the question's kind.
    #[error("question {question} expects a {expected} response, got {actual}")]
    ResponseKindMismatch {
        question: usize,
        expected: QuestionKind,
        actual: QuestionKind,
    },

    /// The attempt has not been started yet.
    #[error("attempt has not been started")]
    AttemptNotStarted,

    /// The attempt was already submitted; a new attempt must be started.
    #[error("attempt was already submitted")]
    AttemptCompleted,

    /// The attempt was started for a different quiz.
    #[error("attempt belongs to quiz {attempt_quiz}, not quiz {quiz}")]
    QuizMismatch { attempt_quiz: u32, quiz: u32 },

    /// The lesson is ahead of the user's progress.
    #[error("lesson {id} is locked (completed through lesson {progress})")]
    LessonLocked { id: u32, progress: u32 },

    /// A prompt template was rendered without a value for a placeholder.
    #[error("missing value for placeholder '{0}'")]
    MissingPlaceholder(String),
}

impl QuizError {
    pub fn quiz_not_found(id: u32) -> Self {
        QuizError::NotFound { kind: "quiz", id }
    }

    pub fn lesson_not_found(id: u32) -> Self {
        QuizError::NotFound { kind: "lesson", id }
    }

    /// Returns `true` if the error is a content-authoring defect rather than
    /// a caller mistake.
    pub fn is_content_defect(&self) -> bool {
        matches!(self, QuizError::InvalidQuestionDefinition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages() {
        assert_eq!(QuizError::quiz_not_found(7).to_string(), "quiz 7 not found");
        assert_eq!(
            QuizError::lesson_not_found(2).to_string(),
            "lesson 2 not found"
        );
    }

    #[test]
    fn content_defect_classification() {
        let defect = QuizError::InvalidQuestionDefinition {
            question: 0,
            reason: "index 9 out of range".into(),
        };
        assert!(defect.is_content_defect());
        assert!(!QuizError::AttemptCompleted.is_content_defect());
    }
}

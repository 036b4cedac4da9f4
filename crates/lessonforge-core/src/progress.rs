//! Persisting quiz results and lesson progress through a [`ProgressStore`].
//!
//! Grading and persistence are separate steps: a store failure is reported
//! back to the caller but never touches the already-computed score.

use crate::error::QuizError;
use crate::model::Attempt;
use crate::traits::{ContentRepository, ProgressStore};

/// What happened when a completed attempt was handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// The score became the user's recorded score for this quiz.
    Saved,
    /// A higher score was already on record and was kept.
    KeptExisting,
    /// The attempt has not been submitted yet; nothing was written.
    NotCompleted,
    /// The store failed; the message describes why.
    Failed(String),
}

/// Save a submitted attempt's score and answers for `user`.
pub fn record_result(store: &dyn ProgressStore, user: &str, attempt: &Attempt) -> PersistOutcome {
    if !attempt.is_completed() {
        return PersistOutcome::NotCompleted;
    }

    match store.save_quiz_score(user, attempt.quiz_id, attempt.score, attempt.responses.clone()) {
        Ok(true) => {
            tracing::info!(
                user,
                quiz_id = attempt.quiz_id,
                "saved quiz score {:.1}%",
                attempt.score
            );
            PersistOutcome::Saved
        }
        Ok(false) => PersistOutcome::KeptExisting,
        Err(e) => {
            tracing::error!(user, quiz_id = attempt.quiz_id, "failed to save quiz score: {e:#}");
            PersistOutcome::Failed(format!("{e:#}"))
        }
    }
}

/// Mark a lesson complete, refusing lessons that are not unlocked yet.
///
/// Returns `true` if the user's progress advanced.
pub fn complete_lesson(
    store: &dyn ProgressStore,
    content: &dyn ContentRepository,
    user: &str,
    lesson_id: u32,
) -> anyhow::Result<bool> {
    let lesson = content.require_lesson(lesson_id)?;
    let progress = store.get_progress(user)?;

    if !lesson.is_unlocked(progress) {
        return Err(QuizError::LessonLocked {
            id: lesson_id,
            progress,
        }
        .into());
    }

    let advanced = store.update_progress(user, lesson_id)?;
    if advanced {
        tracing::info!(user, lesson_id, "lesson completed");
    }
    Ok(advanced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use crate::content::ContentLibrary;
    use crate::engine::{record_response, start_attempt, submit};
    use crate::model::{AnswerKey, Lesson, Question, Quiz, Response};
    use crate::traits::QuizScoreRecord;

    #[derive(Default)]
    struct MemoryStore {
        progress: Mutex<u32>,
        scores: Mutex<BTreeMap<String, f64>>,
        fail: bool,
    }

    impl ProgressStore for MemoryStore {
        fn get_progress(&self, _: &str) -> anyhow::Result<u32> {
            Ok(*self.progress.lock().unwrap())
        }

        fn update_progress(&self, _: &str, lesson_id: u32) -> anyhow::Result<bool> {
            let mut progress = self.progress.lock().unwrap();
            if lesson_id > *progress {
                *progress = lesson_id;
                return Ok(true);
            }
            Ok(false)
        }

        fn get_quiz_scores(&self, _: &str) -> anyhow::Result<BTreeMap<String, QuizScoreRecord>> {
            Ok(BTreeMap::new())
        }

        fn save_quiz_score(
            &self,
            _: &str,
            quiz_id: u32,
            score: f64,
            _: BTreeMap<usize, Response>,
        ) -> anyhow::Result<bool> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            let mut scores = self.scores.lock().unwrap();
            let entry = scores.entry(quiz_id.to_string()).or_insert(f64::MIN);
            if score >= *entry {
                *entry = score;
                return Ok(true);
            }
            Ok(false)
        }
    }

    fn one_question_quiz() -> Quiz {
        Quiz {
            id: 1,
            title: "One".into(),
            description: String::new(),
            lesson_id: None,
            questions: vec![Question {
                prompt: "Pick A".into(),
                options: vec!["A".into(), "B".into()],
                answer: AnswerKey::SingleChoice { correct_answer: 0 },
                explanation: String::new(),
            }],
        }
    }

    fn completed_attempt(correct: bool) -> Attempt {
        let quiz = one_question_quiz();
        let mut attempt = start_attempt(&quiz);
        let canonical = if correct { 0 } else { 1 };
        let presented = attempt.mapping(0).unwrap().presented(canonical).unwrap();
        record_response(&mut attempt, 0, Response::SingleChoice(presented)).unwrap();
        submit(&mut attempt, &quiz).unwrap();
        attempt
    }

    #[test]
    fn saves_and_keeps_best_score() {
        let store = MemoryStore::default();
        assert_eq!(
            record_result(&store, "ada", &completed_attempt(true)),
            PersistOutcome::Saved
        );
        assert_eq!(
            record_result(&store, "ada", &completed_attempt(false)),
            PersistOutcome::KeptExisting
        );
    }

    #[test]
    fn store_failure_keeps_score() {
        let store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let attempt = completed_attempt(true);
        let outcome = record_result(&store, "ada", &attempt);
        assert!(matches!(outcome, PersistOutcome::Failed(msg) if msg.contains("disk full")));
        assert_eq!(attempt.score, 100.0);
    }

    #[test]
    fn unsubmitted_attempt_is_not_saved() {
        let store = MemoryStore::default();
        let attempt = start_attempt(&one_question_quiz());
        assert_eq!(
            record_result(&store, "ada", &attempt),
            PersistOutcome::NotCompleted
        );
    }

    #[test]
    fn lessons_complete_in_order() {
        let mut content = ContentLibrary::new();
        for id in 1..=3 {
            content.insert_lesson(Lesson {
                id,
                title: format!("Lesson {id}"),
                description: String::new(),
                content: String::new(),
                estimated_minutes: None,
            });
        }
        let store = MemoryStore::default();

        let err = complete_lesson(&store, &content, "ada", 2).unwrap_err();
        assert!(err.to_string().contains("locked"));

        assert!(complete_lesson(&store, &content, "ada", 1).unwrap());
        assert!(complete_lesson(&store, &content, "ada", 2).unwrap());
        assert!(!complete_lesson(&store, &content, "ada", 1).unwrap());
        assert!(complete_lesson(&store, &content, "ada", 7).is_err());
    }
}

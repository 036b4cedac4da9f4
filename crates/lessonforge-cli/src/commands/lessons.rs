//! The `lessonforge lessons` and `lessonforge lesson` commands.

use anyhow::Result;
use comfy_table::{Cell, Table};

use lessonforge_core::error::QuizError;
use lessonforge_core::progress::complete_lesson;
use lessonforge_core::traits::{ContentRepository, ProgressStore};

use super::Paths;

pub fn list(paths: &Paths, user: Option<String>) -> Result<()> {
    let config = paths.load_config()?;
    let library = paths.load_content(&config)?;

    let status = match &user {
        Some(user) => {
            let store = paths.open_store(&config)?;
            Some((store.get_progress(user)?, store.completed_lessons(user)?))
        }
        None => None,
    };

    let mut table = Table::new();
    let mut header = vec!["ID", "Lesson", "Minutes"];
    if status.is_some() {
        header.push("Status");
    }
    table.set_header(header);

    for lesson in library.lessons() {
        let mut row = vec![
            Cell::new(lesson.id),
            Cell::new(&lesson.title),
            Cell::new(
                lesson
                    .estimated_minutes
                    .map(|m| m.to_string())
                    .unwrap_or_default(),
            ),
        ];
        if let Some((progress, completed)) = &status {
            let label = if completed.contains(&lesson.id) || lesson.id <= *progress {
                "completed"
            } else if lesson.is_unlocked(*progress) {
                "available"
            } else {
                "locked"
            };
            row.push(Cell::new(label));
        }
        table.add_row(row);
    }

    println!("{table}");
    if let Some((progress, _)) = status {
        println!(
            "Completed through lesson {progress} of {}.",
            library.lesson_count()
        );
    }
    Ok(())
}

pub fn show(paths: &Paths, id: u32, user: Option<String>, complete: bool) -> Result<()> {
    let config = paths.load_config()?;
    let library = paths.load_content(&config)?;
    let lesson = library.require_lesson(id)?;

    let store = match &user {
        Some(_) => Some(paths.open_store(&config)?),
        None => None,
    };

    if let (Some(store), Some(user)) = (&store, &user) {
        let progress = store.get_progress(user)?;
        if !lesson.is_unlocked(progress) {
            return Err(QuizError::LessonLocked { id, progress }.into());
        }
    }

    println!("Lesson {}: {}", lesson.id, lesson.title);
    if !lesson.description.is_empty() {
        println!("{}", lesson.description);
    }
    println!("\n{}", lesson.content.trim());

    let quizzes: Vec<_> = library
        .quizzes()
        .filter(|q| q.lesson_id == Some(id))
        .collect();
    for quiz in &quizzes {
        println!("\nCheck your understanding: lessonforge quiz --id {}", quiz.id);
    }

    if complete {
        if let (Some(store), Some(user)) = (&store, &user) {
            if complete_lesson(store, &library, user, id)? {
                println!("\nLesson {id} marked as completed.");
            } else {
                println!("\nLesson {id} was already completed.");
            }
        }
    }
    Ok(())
}

//! The `lessonforge validate` command.

use anyhow::Result;

use lessonforge_core::content::validate_library;

use super::Paths;

pub fn execute(paths: &Paths) -> Result<()> {
    let config = paths.load_config()?;
    let library = paths.load_content(&config)?;

    let lesson_count = library.lessons().count();
    let quiz_count = library.quizzes().count();
    let question_count: usize = library.quizzes().map(|q| q.questions.len()).sum();
    let template_count = library.templates().len();
    println!(
        "Content: {lesson_count} lessons, {quiz_count} quizzes ({question_count} questions), \
         {template_count} templates"
    );

    let warnings = validate_library(&library);
    for w in &warnings {
        let prefix = match (w.quiz_id, w.question) {
            (Some(quiz), Some(question)) => format!("  [quiz {quiz} q{}]", question + 1),
            (Some(quiz), None) => format!("  [quiz {quiz}]"),
            _ => "  ".to_string(),
        };
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("All content valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}

//! The `lessonforge quizzes` and `lessonforge quiz` commands.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use anyhow::Result;
use comfy_table::{Cell, Table};
use rand::rngs::StdRng;
use rand::SeedableRng;

use lessonforge_core::engine::{
    presented_options, record_response_checked, start_attempt, start_attempt_with_rng, submit,
    Submission,
};
use lessonforge_core::model::{Attempt, QuestionKind, Quiz, Response};
use lessonforge_core::progress::{record_result, PersistOutcome};
use lessonforge_core::review::{review_attempt, ReviewBody};
use lessonforge_core::traits::{ContentRepository, ProgressStore};

use super::{read_line, Paths};

pub fn list(paths: &Paths, user: Option<String>) -> Result<()> {
    let config = paths.load_config()?;
    let library = paths.load_content(&config)?;

    let scores = match &user {
        Some(user) => Some(paths.open_store(&config)?.get_quiz_scores(user)?),
        None => None,
    };

    let mut table = Table::new();
    let mut header = vec!["ID", "Quiz", "Questions", "Lesson"];
    if scores.is_some() {
        header.push("Best score");
    }
    table.set_header(header);

    for quiz in library.quizzes() {
        let mut row = vec![
            Cell::new(quiz.id),
            Cell::new(&quiz.title),
            Cell::new(quiz.questions.len()),
            Cell::new(quiz.lesson_id.map(|id| id.to_string()).unwrap_or_default()),
        ];
        if let Some(scores) = &scores {
            let best = scores
                .get(&quiz.id.to_string())
                .map(|record| format!("{:.1}%", record.score))
                .unwrap_or_else(|| "-".to_string());
            row.push(Cell::new(best));
        }
        table.add_row(row);
    }

    println!("{table}");
    Ok(())
}

pub fn execute(paths: &Paths, id: u32, user: Option<String>, seed: Option<u64>) -> Result<()> {
    let config = paths.load_config()?;
    let library = paths.load_content(&config)?;
    let quiz = library.require_quiz(id)?;

    let store = match &user {
        Some(user) => {
            let store = paths.open_store(&config)?;
            // Fail before the quiz rather than after it.
            store.get_user(user)?;
            Some(store)
        }
        None => None,
    };

    let mut attempt = match seed {
        Some(seed) => start_attempt_with_rng(quiz, &mut StdRng::seed_from_u64(seed)),
        None => start_attempt(quiz),
    };

    let mut input = io::stdin().lock();
    let mut out = io::stdout().lock();

    take_quiz(quiz, &mut attempt, &mut input, &mut out)?;
    let submission = submit(&mut attempt, quiz)?;
    print_results(&mut out, quiz, &attempt, &submission)?;

    if let (Some(store), Some(user)) = (&store, &user) {
        match record_result(store, user, &attempt) {
            PersistOutcome::Saved => writeln!(out, "\nScore saved for {user}.")?,
            PersistOutcome::KeptExisting => {
                writeln!(out, "\nA higher score for this quiz is already on record.")?
            }
            PersistOutcome::NotCompleted => {}
            PersistOutcome::Failed(reason) => {
                eprintln!("Warning: could not save score: {reason}")
            }
        }
    }
    Ok(())
}

/// Ask every question, recording each valid answer on `attempt`.
///
/// A blank line skips a question; end of input leaves the remaining
/// questions unanswered.
fn take_quiz<R: BufRead, W: Write>(
    quiz: &Quiz,
    attempt: &mut Attempt,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", quiz.title)?;
    if !quiz.description.is_empty() {
        writeln!(out, "{}", quiz.description)?;
    }

    let total = quiz.questions.len();
    for (i, question) in quiz.questions.iter().enumerate() {
        let options = presented_options(question, attempt.mapping(i));

        writeln!(out, "\nQuestion {}/{total}: {}", i + 1, question.prompt)?;
        for (n, text) in options.iter().enumerate() {
            writeln!(out, "  {}. {text}", n + 1)?;
        }
        writeln!(out, "{}", answer_hint(question.kind()))?;

        loop {
            write!(out, "> ")?;
            out.flush()?;

            let Some(line) = read_line(input)? else {
                writeln!(out)?;
                return Ok(());
            };
            if line.trim().is_empty() {
                writeln!(out, "Skipped.")?;
                break;
            }

            let recorded = parse_answer(question.kind(), &line, options.len())
                .and_then(|response| {
                    record_response_checked(attempt, quiz, i, response).map_err(|e| e.to_string())
                });
            match recorded {
                Ok(()) => break,
                Err(reason) => writeln!(out, "{reason}. Try again.")?,
            }
        }
    }
    Ok(())
}

fn answer_hint(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::SingleChoice => "Enter one option number (blank to skip).",
        QuestionKind::MultiChoice => "Enter all correct option numbers, e.g. 1,3 (blank to skip).",
        QuestionKind::Ordering => {
            "Enter the option numbers in the correct order, e.g. 2,1,3 (blank to skip)."
        }
    }
}

/// Parse 1-based option numbers separated by commas or spaces into 0-based
/// indices.
fn parse_numbers(line: &str, option_count: usize) -> Result<Vec<usize>, String> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let n: usize = part
                .parse()
                .map_err(|_| format!("'{part}' is not a number"))?;
            if n == 0 || n > option_count {
                return Err(format!("{n} is not between 1 and {option_count}"));
            }
            Ok(n - 1)
        })
        .collect()
}

fn parse_answer(kind: QuestionKind, line: &str, option_count: usize) -> Result<Response, String> {
    let numbers = parse_numbers(line, option_count)?;
    match kind {
        QuestionKind::SingleChoice => match numbers.as_slice() {
            [single] => Ok(Response::SingleChoice(*single)),
            _ => Err("Pick exactly one option".to_string()),
        },
        QuestionKind::MultiChoice => {
            let selected: BTreeSet<usize> = numbers.iter().copied().collect();
            if selected.len() != numbers.len() {
                return Err("Each option can only be picked once".to_string());
            }
            Ok(Response::MultiChoice(selected))
        }
        QuestionKind::Ordering => {
            let distinct: BTreeSet<usize> = numbers.iter().copied().collect();
            if numbers.len() != option_count || distinct.len() != option_count {
                return Err(format!("Use each of the {option_count} options exactly once"));
            }
            Ok(Response::Ordering(numbers))
        }
    }
}

fn print_results<W: Write>(
    out: &mut W,
    quiz: &Quiz,
    attempt: &Attempt,
    submission: &Submission,
) -> Result<()> {
    writeln!(
        out,
        "\nScore: {:.1}% ({}/{} correct)",
        submission.score, submission.correct, submission.total
    )?;
    writeln!(out, "{}", submission.band().message())?;

    for failure in &submission.failures {
        writeln!(
            out,
            "Question {} could not be graded: {}",
            failure.question + 1,
            failure.error
        )?;
    }

    writeln!(out, "\nReview:")?;
    for review in review_attempt(attempt, quiz) {
        let status = if review.answered { "" } else { " (not answered)" };
        writeln!(out, "\nQ{}. {}{status}", review.index + 1, review.prompt)?;

        match &review.body {
            ReviewBody::Choice { options } => {
                for option in options {
                    writeln!(out, "  {} {}", option.mark.symbol(), option.text)?;
                }
            }
            ReviewBody::Ordering {
                correct_order,
                user_order,
            } => {
                if !user_order.is_empty() {
                    writeln!(out, "  Your order:")?;
                    for (pos, step) in user_order.iter().enumerate() {
                        let mark = if step.correct { "[x]" } else { "[!]" };
                        writeln!(out, "    {}. {mark} {}", pos + 1, step.text)?;
                    }
                }
                writeln!(out, "  Correct order:")?;
                for (pos, text) in correct_order.iter().enumerate() {
                    writeln!(out, "    {}. {text}", pos + 1)?;
                }
            }
            ReviewBody::Unavailable { reason } => {
                writeln!(out, "  Review unavailable: {reason}")?;
            }
        }

        if !review.explanation.is_empty() {
            writeln!(out, "  Explanation: {}", review.explanation)?;
        }
    }
    Ok(())
}

//! Account commands: `register`, `login`, `settings`, and `progress`.

use anyhow::Result;
use comfy_table::{Cell, Table};

use lessonforge_core::traits::ContentRepository;
use lessonforge_store::{NewUser, ProfileUpdate};

use super::{read_secret, Paths};

pub fn register(
    paths: &Paths,
    username: String,
    email: String,
    name: String,
    organization: String,
) -> Result<()> {
    let config = paths.load_config()?;
    let store = paths.open_store(&config)?;

    let password = read_secret("password")?;
    let user = store.create_user(NewUser {
        username,
        password,
        name,
        email,
        organization,
    })?;

    println!("Registered {} <{}>.", user.username, user.email);
    Ok(())
}

pub fn login(paths: &Paths, username: &str) -> Result<()> {
    let config = paths.load_config()?;
    let store = paths.open_store(&config)?;

    let password = read_secret("password")?;
    if !store.verify_credentials(username, &password)? {
        anyhow::bail!("invalid username or password");
    }

    let user = store.get_user(username)?;
    let display_name = if user.name.is_empty() {
        &user.username
    } else {
        &user.name
    };
    println!(
        "Welcome back, {display_name}! Completed through lesson {}.",
        user.lesson_progress
    );
    Ok(())
}

pub struct SettingsArgs {
    pub user: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub change_password: bool,
    pub reset_progress: bool,
    pub yes: bool,
}

/// Show or change a user's profile. Every change needs the current
/// password, read from the first stdin line.
pub fn settings(paths: &Paths, args: SettingsArgs) -> Result<()> {
    if args.reset_progress && !args.yes {
        anyhow::bail!(
            "resetting clears all lesson progress and quiz scores; pass --yes to confirm"
        );
    }

    let config = paths.load_config()?;
    let store = paths.open_store(&config)?;

    let current = read_secret("current password")?;
    if !store.verify_credentials(&args.user, &current)? {
        anyhow::bail!("invalid username or password");
    }

    let update = ProfileUpdate {
        name: args.name,
        email: args.email,
        organization: args.organization,
    };
    let mut changed = false;

    if !update.is_empty() {
        store.update_profile(&args.user, update)?;
        println!("Profile updated.");
        changed = true;
    }

    if args.change_password {
        let new_password = read_secret("new password")?;
        let confirmation = read_secret("password confirmation")?;
        if new_password != confirmation {
            anyhow::bail!("new passwords do not match");
        }
        store.change_password(&args.user, &current, &new_password)?;
        println!("Password changed.");
        changed = true;
    }

    if args.reset_progress {
        store.reset_progress(&args.user)?;
        println!("Learning progress reset.");
        changed = true;
    }

    if !changed {
        let user = store.get_user(&args.user)?;
        println!("Username:     {}", user.username);
        println!("Name:         {}", user.name);
        println!("Email:        {}", user.email);
        println!("Organization: {}", user.organization);
        println!(
            "Registered:   {}",
            user.created_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    Ok(())
}

pub fn progress(paths: &Paths, username: &str, json: bool) -> Result<()> {
    let config = paths.load_config()?;
    let store = paths.open_store(&config)?;
    let user = store.get_user(username)?;

    if json {
        let summary = serde_json::json!({
            "username": user.username,
            "lesson_progress": user.lesson_progress,
            "completed_lessons": user.completed_lessons,
            "quiz_scores": user.quiz_scores,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    // Titles are optional; progress is still shown without content.
    let library = paths.load_content(&config).ok();

    match &library {
        Some(library) => println!(
            "{}: completed through lesson {} of {}",
            user.username,
            user.lesson_progress,
            library.lesson_count()
        ),
        None => println!(
            "{}: completed through lesson {}",
            user.username, user.lesson_progress
        ),
    }

    if user.quiz_scores.is_empty() {
        println!("No quiz scores yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Quiz", "Title", "Best score", "Answered", "When"]);
    for (quiz_id, record) in &user.quiz_scores {
        let title = library
            .as_ref()
            .zip(quiz_id.parse::<u32>().ok())
            .and_then(|(library, id)| library.get_quiz(id))
            .map(|quiz| quiz.title.clone())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(quiz_id),
            Cell::new(title),
            Cell::new(format!("{:.1}%", record.score)),
            Cell::new(record.answers.len()),
            Cell::new(record.timestamp.format("%Y-%m-%d %H:%M UTC")),
        ]);
    }
    println!("{table}");
    Ok(())
}

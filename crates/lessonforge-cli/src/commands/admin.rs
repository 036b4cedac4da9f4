//! Admin commands: `users` and `delete-user`.
//!
//! Both require the `admin` account's password on stdin.

use std::io;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::Serialize;

use lessonforge_core::traits::ContentRepository;
use lessonforge_store::{FileUserStore, UserRecord};

use super::{read_secret, Paths};

const ADMIN_USER: &str = "admin";

fn require_admin(store: &FileUserStore) -> Result<()> {
    let password = read_secret("admin password")?;
    if !store.verify_credentials(ADMIN_USER, &password)? {
        anyhow::bail!("admin access denied");
    }
    Ok(())
}

/// One exported row per account.
#[derive(Serialize)]
struct UserRow<'a> {
    username: &'a str,
    name: &'a str,
    email: &'a str,
    organization: &'a str,
    lesson_progress: u32,
    completed_lessons: usize,
    quizzes_taken: usize,
    registered: String,
}

impl<'a> From<&'a UserRecord> for UserRow<'a> {
    fn from(user: &'a UserRecord) -> Self {
        Self {
            username: &user.username,
            name: &user.name,
            email: &user.email,
            organization: &user.organization,
            lesson_progress: user.lesson_progress,
            completed_lessons: user.completed_lessons.len(),
            quizzes_taken: user.quiz_scores.len(),
            registered: user.created_at.to_rfc3339(),
        }
    }
}

pub fn users(paths: &Paths, csv: bool) -> Result<()> {
    let config = paths.load_config()?;
    let store = paths.open_store(&config)?;
    require_admin(&store)?;

    let users = store.list_users()?;

    if csv {
        let mut writer = csv::Writer::from_writer(io::stdout().lock());
        for user in &users {
            writer.serialize(UserRow::from(user))?;
        }
        writer.flush().context("failed to write CSV")?;
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Username",
        "Name",
        "Email",
        "Organization",
        "Progress",
        "Registered",
    ]);
    for user in &users {
        table.add_row(vec![
            Cell::new(&user.username),
            Cell::new(&user.name),
            Cell::new(&user.email),
            Cell::new(&user.organization),
            Cell::new(user.lesson_progress),
            Cell::new(user.created_at.format("%Y-%m-%d")),
        ]);
    }
    println!("{table}");

    let active = users.iter().filter(|u| u.lesson_progress > 0).count();
    print!("Total users: {}, active: {active}", users.len());
    match paths.load_content(&config) {
        Ok(library) if library.lesson_count() > 0 => {
            let lesson_count = u32::try_from(library.lesson_count()).unwrap_or(u32::MAX);
            let finished = users
                .iter()
                .filter(|u| u.lesson_progress >= lesson_count)
                .count();
            println!(", completed course: {finished}");
        }
        _ => println!(),
    }
    Ok(())
}

pub fn delete_user(paths: &Paths, username: &str) -> Result<()> {
    let config = paths.load_config()?;
    let store = paths.open_store(&config)?;
    require_admin(&store)?;

    store.delete_user(username)?;
    println!("Deleted user {username}.");
    Ok(())
}

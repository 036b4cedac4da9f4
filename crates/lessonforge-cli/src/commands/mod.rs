//! Subcommand implementations and the plumbing they share.

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};

use lessonforge_core::content::{load_content, ContentLibrary};
use lessonforge_providers::config::{load_config_from, LessonforgeConfig};
use lessonforge_store::FileUserStore;

pub mod account;
pub mod admin;
pub mod chat;
pub mod init;
pub mod lessons;
pub mod list_models;
pub mod quiz;
pub mod validate;

/// Path overrides given on the command line.
pub struct Paths {
    pub config: Option<PathBuf>,
    pub content: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl Paths {
    pub fn load_config(&self) -> Result<LessonforgeConfig> {
        load_config_from(self.config.as_deref())
    }

    pub fn content_path(&self, config: &LessonforgeConfig) -> PathBuf {
        self.content
            .clone()
            .unwrap_or_else(|| config.content_dir.clone())
    }

    /// Load all content, failing when nothing is found.
    pub fn load_content(&self, config: &LessonforgeConfig) -> Result<ContentLibrary> {
        let path = self.content_path(config);
        if !path.exists() {
            anyhow::bail!(
                "content not found at {} (run `lessonforge init` or pass --content)",
                path.display()
            );
        }
        load_content(&path)
    }

    pub fn open_store(&self, config: &LessonforgeConfig) -> Result<FileUserStore> {
        let dir = self
            .data_dir
            .clone()
            .unwrap_or_else(|| config.data_dir.clone());
        FileUserStore::open(&dir)
            .with_context(|| format!("failed to open user store at {}", dir.display()))
    }
}

/// Read one line from stdin without its trailing newline; `None` at EOF.
pub fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Read one non-empty secret line from stdin, e.g. `what = "password"`.
pub fn read_secret(what: &str) -> Result<String> {
    let secret = read_line(&mut io::stdin().lock())?
        .with_context(|| format!("expected {what} on stdin"))?;
    if secret.is_empty() {
        anyhow::bail!("{what} must not be empty");
    }
    Ok(secret)
}

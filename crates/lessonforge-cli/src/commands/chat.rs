//! The prompt playground: `chat`, `templates`, and `conversations`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use lessonforge_core::prompts::{builtin_templates, find_template, PromptTemplate};
use lessonforge_core::traits::{ChatMessage, ChatRequest};
use lessonforge_providers::LessonforgeConfig;

use super::Paths;

pub struct ChatArgs {
    pub prompt: Option<String>,
    pub template: Option<String>,
    pub vars: Vec<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub continue_id: Option<String>,
    pub save: Option<String>,
    pub user: Option<String>,
}

pub async fn execute(paths: &Paths, args: ChatArgs) -> Result<()> {
    let config = paths.load_config()?;

    let prompt = match (args.prompt, args.template) {
        (Some(prompt), None) => prompt,
        (None, Some(name)) => {
            let templates = all_templates(paths, &config);
            let template = find_template(&templates, &name).with_context(|| {
                format!("unknown template '{name}' (see `lessonforge templates`)")
            })?;
            template.render(&parse_vars(&args.vars)?)?
        }
        _ => anyhow::bail!("pass either --prompt or --template"),
    };
    if prompt.trim().is_empty() {
        anyhow::bail!("prompt is empty");
    }

    let store = match &args.user {
        Some(_) => Some(paths.open_store(&config)?),
        None => None,
    };

    let history = match (&store, &args.user, &args.continue_id) {
        (Some(store), Some(user), Some(id)) => store.get_conversation(user, id)?.messages,
        _ => Vec::new(),
    };

    let model = args.model.unwrap_or_else(|| config.default_model.clone());
    let generator = config.generator(args.provider.as_deref(), &model)?;

    let mut request = ChatRequest::new(&model, &prompt);
    request.history = history.clone();
    request.temperature = config.default_temperature;
    request.max_tokens = config.max_tokens;

    let response = generator.generate(&request).await?;
    tracing::info!(
        provider = generator.name(),
        model = %response.model,
        tokens = response.token_usage.total_tokens,
        latency_ms = response.latency_ms,
        "chat response"
    );
    println!("{}", response.content);

    if let (Some(store), Some(user), Some(title)) = (&store, &args.user, &args.save) {
        let mut messages = history;
        messages.push(ChatMessage::user(prompt));
        messages.push(ChatMessage::assistant(response.content));
        let id = store.save_conversation(user, title, messages)?;
        println!("\nSaved conversation '{title}' ({id}).");
    }
    Ok(())
}

/// Built-in templates plus any defined in content; content wins on a
/// name clash.
fn all_templates(paths: &Paths, config: &LessonforgeConfig) -> Vec<PromptTemplate> {
    let mut templates = builtin_templates();
    match paths.load_content(config) {
        Ok(library) => {
            for template in library.templates() {
                templates.retain(|t| !t.name.eq_ignore_ascii_case(&template.name));
                templates.push(template.clone());
            }
        }
        Err(e) => tracing::debug!("no content templates: {e:#}"),
    }
    templates
}

fn parse_vars(vars: &[String]) -> Result<HashMap<String, String>> {
    vars.iter()
        .map(|var| {
            let (key, value) = var
                .split_once('=')
                .with_context(|| format!("expected KEY=VALUE, got '{var}'"))?;
            Ok((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

pub fn templates(paths: &Paths) -> Result<()> {
    let config = paths.load_config()?;

    let mut table = Table::new();
    table.set_header(vec!["Template", "Placeholders", "Description"]);
    for template in all_templates(paths, &config) {
        table.add_row(vec![
            Cell::new(&template.name),
            Cell::new(template.placeholder_names().join(", ")),
            Cell::new(&template.description),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn conversations(
    paths: &Paths,
    user: &str,
    show: Option<String>,
    delete: Option<String>,
) -> Result<()> {
    let config = paths.load_config()?;
    let store = paths.open_store(&config)?;

    if let Some(id) = delete {
        store.delete_conversation(user, &id)?;
        println!("Deleted conversation {id}.");
        return Ok(());
    }

    if let Some(id) = show {
        let conversation = store.get_conversation(user, &id)?;
        println!(
            "{} ({})",
            conversation.title,
            conversation.timestamp.format("%Y-%m-%d %H:%M UTC")
        );
        for message in &conversation.messages {
            println!("\n[{}]\n{}", message.role.as_str(), message.content);
        }
        return Ok(());
    }

    let saved = store.list_conversations(user)?;
    if saved.is_empty() {
        println!("No saved conversations.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Saved"]);
    for conversation in &saved {
        table.add_row(vec![
            Cell::new(&conversation.id),
            Cell::new(&conversation.title),
            Cell::new(conversation.timestamp.format("%Y-%m-%d %H:%M UTC")),
        ]);
    }
    println!("{table}");
    Ok(())
}

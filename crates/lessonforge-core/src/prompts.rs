//! Prompt templates for the chat playground.
//!
//! Templates use `{{name}}` placeholders that are filled in before the
//! prompt is sent to the text-generation service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::QuizError;

/// A reusable prompt with named placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Prompt text containing `{{placeholder}}` markers.
    pub prompt: String,
    /// Declared placeholders; when empty they are discovered from `prompt`.
    #[serde(default)]
    pub placeholders: Vec<String>,
}

impl PromptTemplate {
    /// Placeholder names, declared or discovered, in first-use order.
    pub fn placeholder_names(&self) -> Vec<String> {
        if !self.placeholders.is_empty() {
            return self.placeholders.clone();
        }
        let mut names: Vec<String> = Vec::new();
        let mut rest = self.prompt.as_str();
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                break;
            };
            let name = after[..end].trim().to_string();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
            rest = &after[end + 2..];
        }
        names
    }

    /// Substitute every placeholder with its value.
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, QuizError> {
        let mut rendered = self.prompt.clone();
        for name in self.placeholder_names() {
            let value = values
                .get(&name)
                .ok_or_else(|| QuizError::MissingPlaceholder(name.clone()))?;
            rendered = rendered.replace(&format!("{{{{{name}}}}}"), value);
        }
        Ok(rendered)
    }
}

/// Templates available without any content files.
pub fn builtin_templates() -> Vec<PromptTemplate> {
    let template = |name: &str, description: &str, prompt: &str| PromptTemplate {
        name: name.into(),
        description: description.into(),
        prompt: prompt.into(),
        placeholders: Vec::new(),
    };

    vec![
        template(
            "report-writing",
            "Draft or improve an incident report.",
            "I need to write a detailed report about the following incident: \
             {{incident_description}}. \
             Provide a well-structured report with all necessary sections, professional language, \
             and a focus on objective facts.",
        ),
        template(
            "concept-explainer",
            "Explain an AI concept in plain language.",
            "Explain {{concept}} in simple terms. Include a basic definition, real-world examples, \
             how it works, common applications, and limitations.",
        ),
        template(
            "learning-plan",
            "Create a learning plan for a topic.",
            "I want to learn {{topic}}. Create a {{months}}-month learning plan that fits around a \
             full-time job, with weekly goals, resources, practice exercises, and ways to \
             measure progress.",
        ),
        template(
            "ethics-analyzer",
            "Analyze the ethical implications of an AI use case.",
            "Analyze the ethical implications of using AI for {{use_case}}. Consider privacy, \
             fairness and bias, transparency, social impact, and recommended safeguards.",
        ),
    ]
}

/// Find a template by name, case-insensitively.
pub fn find_template<'a>(
    templates: &'a [PromptTemplate],
    name: &str,
) -> Option<&'a PromptTemplate> {
    templates.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

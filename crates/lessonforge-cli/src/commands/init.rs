//! The `lessonforge init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("lessonforge.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("content")?;
    write_if_missing(Path::new("content/example.toml"), EXAMPLE_CONTENT)?;

    println!("\nNext steps:");
    println!("  1. Add your OpenAI API key to lessonforge.toml (optional, mock replies otherwise)");
    println!("  2. Run: lessonforge validate");
    println!("  3. Run: lessonforge register --username <name> --email <work email>");
    println!("  4. Run: lessonforge quiz --id 1 --user <name>");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# lessonforge configuration

default_provider = "openai"
default_model = "gpt-3.5-turbo"
default_temperature = 0.7
max_tokens = 250
data_dir = "./lessonforge-data"
content_dir = "./content"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.offline]
type = "mock"
"#;

const EXAMPLE_CONTENT: &str = r#"[[lessons]]
id = 1
title = "What is a Prompt?"
description = "How instructions steer a language model."
estimated_minutes = 5
content = """
# What is a Prompt?

A prompt is the text you give a language model. Clear prompts state the
task, the audience, and the format you want back.
"""

[[quizzes]]
id = 1
lesson_id = 1
title = "Quiz: What is a Prompt?"

[[quizzes.questions]]
question = "Which prompt is most likely to get a useful answer?"
type = "single_choice"
options = [
    "Write something.",
    "Summarize this incident report in three bullet points for a supervisor.",
    "Report.",
]
correct_answer = 1
explanation = "Good prompts name the task, the audience, and the format."

[[quizzes.questions]]
question = "What belongs in a clear prompt?"
type = "multi_choice"
options = ["The task", "The desired format", "Your password", "The audience"]
correct_answers = [0, 1, 3]
explanation = "Never paste credentials into a prompt."

[[quizzes.questions]]
question = "Put the prompt-writing steps in order."
type = "ordering"
options = ["State the task", "Give context", "Ask for a format"]
correct_order = [0, 1, 2]

[[templates]]
name = "explain-simply"
description = "Explain a concept in plain language"
prompt = "Explain {{concept}} to a new officer in plain language."
"#;

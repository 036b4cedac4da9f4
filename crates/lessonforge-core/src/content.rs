//! TOML content loader.
//!
//! Loads lessons, quizzes, and prompt templates from TOML files and
//! directories into a [`ContentLibrary`], and validates them.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AnswerKey, Lesson, Question, QuestionKind, Quiz};
use crate::prompts::PromptTemplate;
use crate::traits::ContentRepository;

/// Intermediate TOML structure for content files.
#[derive(Debug, Deserialize)]
struct TomlContentFile {
    #[serde(default)]
    lessons: Vec<Lesson>,
    #[serde(default)]
    quizzes: Vec<TomlQuiz>,
    #[serde(default)]
    templates: Vec<PromptTemplate>,
}

#[derive(Debug, Deserialize)]
struct TomlQuiz {
    id: u32,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    lesson_id: Option<u32>,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    #[serde(alias = "question")]
    prompt: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answer: Option<usize>,
    #[serde(default)]
    correct_answers: Option<Vec<usize>>,
    #[serde(default)]
    correct_order: Option<Vec<usize>>,
    #[serde(default)]
    explanation: String,
}

impl TomlQuestion {
    fn into_question(self, quiz_id: u32, index: usize) -> Result<Question> {
        let kind: QuestionKind = self
            .kind
            .parse()
            .map_err(|e: String| anyhow::anyhow!("quiz {quiz_id}, question {index}: {e}"))?;

        let missing = |field: &str| {
            anyhow::anyhow!("quiz {quiz_id}, question {index}: {kind} question requires `{field}`")
        };

        let answer = match kind {
            QuestionKind::SingleChoice => AnswerKey::SingleChoice {
                correct_answer: self.correct_answer.ok_or_else(|| missing("correct_answer"))?,
            },
            QuestionKind::MultiChoice => AnswerKey::MultiChoice {
                correct_answers: self.correct_answers.ok_or_else(|| missing("correct_answers"))?,
            },
            QuestionKind::Ordering => AnswerKey::Ordering {
                correct_order: self.correct_order.ok_or_else(|| missing("correct_order"))?,
            },
        };

        Ok(Question {
            prompt: self.prompt,
            options: self.options,
            answer,
            explanation: self.explanation,
        })
    }
}

/// In-memory content repository.
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    quizzes: BTreeMap<u32, Quiz>,
    lessons: BTreeMap<u32, Lesson>,
    templates: Vec<PromptTemplate>,
}

impl ContentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a quiz, returning the one it replaced.
    pub fn insert_quiz(&mut self, quiz: Quiz) -> Option<Quiz> {
        self.quizzes.insert(quiz.id, quiz)
    }

    /// Add a lesson, returning the one it replaced.
    pub fn insert_lesson(&mut self, lesson: Lesson) -> Option<Lesson> {
        self.lessons.insert(lesson.id, lesson)
    }

    pub fn add_template(&mut self, template: PromptTemplate) {
        self.templates.retain(|t| t.name != template.name);
        self.templates.push(template);
    }

    /// Merge `other` into this library; later definitions win.
    pub fn merge(&mut self, other: ContentLibrary) {
        for (id, quiz) in other.quizzes {
            if self.insert_quiz(quiz).is_some() {
                tracing::warn!("quiz {id} defined more than once, keeping the last definition");
            }
        }
        for (id, lesson) in other.lessons {
            if self.insert_lesson(lesson).is_some() {
                tracing::warn!("lesson {id} defined more than once, keeping the last definition");
            }
        }
        for template in other.templates {
            self.add_template(template);
        }
    }

    pub fn quizzes(&self) -> impl Iterator<Item = &Quiz> {
        self.quizzes.values()
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.values()
    }

    pub fn templates(&self) -> &[PromptTemplate] {
        &self.templates
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty() && self.lessons.is_empty() && self.templates.is_empty()
    }
}

impl ContentRepository for ContentLibrary {
    fn get_quiz(&self, quiz_id: u32) -> Option<&Quiz> {
        self.quizzes.get(&quiz_id)
    }

    fn list_quiz_titles(&self) -> Vec<(u32, String)> {
        self.quizzes
            .values()
            .map(|q| (q.id, q.title.clone()))
            .collect()
    }

    fn get_lesson(&self, lesson_id: u32) -> Option<&Lesson> {
        self.lessons.get(&lesson_id)
    }

    fn list_lesson_titles(&self) -> Vec<(u32, String)> {
        self.lessons
            .values()
            .map(|l| (l.id, l.title.clone()))
            .collect()
    }

    fn lesson_count(&self) -> usize {
        self.lessons.len()
    }
}

/// Parse a single TOML file into a `ContentLibrary`.
pub fn parse_content_file(path: &Path) -> Result<ContentLibrary> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content file: {}", path.display()))?;

    parse_content_str(&content, path)
}

/// Parse a TOML string into a `ContentLibrary` (useful for testing).
pub fn parse_content_str(content: &str, source_path: &Path) -> Result<ContentLibrary> {
    let parsed: TomlContentFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut library = ContentLibrary::new();

    for lesson in parsed.lessons {
        let id = lesson.id;
        if library.insert_lesson(lesson).is_some() {
            tracing::warn!("{}: duplicate lesson id {id}", source_path.display());
        }
    }

    for q in parsed.quizzes {
        let questions = q
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, question)| question.into_question(q.id, i))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("invalid quiz in {}", source_path.display()))?;

        let quiz = Quiz {
            id: q.id,
            title: q.title,
            description: q.description,
            lesson_id: q.lesson_id,
            questions,
        };
        if library.insert_quiz(quiz).is_some() {
            tracing::warn!("{}: duplicate quiz id {}", source_path.display(), q.id);
        }
    }

    for template in parsed.templates {
        library.add_template(template);
    }

    Ok(library)
}

/// Recursively load all `.toml` content files from a directory.
pub fn load_content_directory(dir: &Path) -> Result<ContentLibrary> {
    let mut library = ContentLibrary::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            library.merge(load_content_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_content_file(&path) {
                Ok(parsed) => library.merge(parsed),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(library)
}

/// Load content from either a single file or a directory.
pub fn load_content(path: &Path) -> Result<ContentLibrary> {
    if path.is_dir() {
        load_content_directory(path)
    } else {
        parse_content_file(path)
    }
}

/// A warning from content validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The quiz ID (if applicable).
    pub quiz_id: Option<u32>,
    /// The question index within the quiz (if applicable).
    pub question: Option<usize>,
    /// Warning message.
    pub message: String,
}

/// Validate a content library for authoring defects.
///
/// Invalid questions still load; grading reports them per question.
pub fn validate_library(library: &ContentLibrary) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let warn = |quiz: Option<u32>, question: Option<usize>, message: String| ValidationWarning {
        quiz_id: quiz,
        question,
        message,
    };

    for quiz in library.quizzes() {
        if quiz.questions.is_empty() {
            warnings.push(warn(
                Some(quiz.id),
                None,
                "quiz has no questions and will always score 0".into(),
            ));
        }

        if let Some(lesson_id) = quiz.lesson_id {
            if library.get_lesson(lesson_id).is_none() {
                warnings.push(warn(
                    Some(quiz.id),
                    None,
                    format!("quiz refers to missing lesson {lesson_id}"),
                ));
            }
        }

        for (i, question) in quiz.questions.iter().enumerate() {
            if question.prompt.trim().is_empty() {
                warnings.push(warn(Some(quiz.id), Some(i), "prompt is empty".into()));
            }

            if let Err(e) = question.validate(i) {
                warnings.push(warn(Some(quiz.id), Some(i), e.to_string()));
            }

            if question.kind().is_shuffled() && question.options.len() < 2 {
                warnings.push(warn(
                    Some(quiz.id),
                    Some(i),
                    "choice question has fewer than two options".into(),
                ));
            }

            let mut seen = HashSet::new();
            for option in &question.options {
                if !seen.insert(option.trim()) {
                    warnings.push(warn(
                        Some(quiz.id),
                        Some(i),
                        format!("duplicate option: {option}"),
                    ));
                }
            }
        }
    }

    for template in library.templates() {
        if template.placeholder_names().is_empty() {
            warnings.push(warn(
                None,
                None,
                format!("template '{}' has no placeholders", template.name),
            ));
        }
    }

    warnings
}

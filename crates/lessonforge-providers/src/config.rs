//! Application configuration and generator factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lessonforge_core::traits::TextGenerator;

use crate::mock::{MockGenerator, MOCK_MODEL};
use crate::openai::OpenAiGenerator;

/// Configuration for a single text generation backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Mock,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Mock => f.write_str("Mock"),
        }
    }
}

/// Top-level lessonforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonforgeConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used by `chat` when none is named.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// Reply length limit for the playground.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Where the user store keeps its files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory (or single file) of lesson and quiz TOML.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    250
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./lessonforge-data")
}
fn default_content_dir() -> PathBuf {
    PathBuf::from("./content")
}

impl Default for LessonforgeConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            data_dir: default_data_dir(),
            content_dir: default_content_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Mock => ProviderConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `lessonforge.toml` in the current directory
/// 2. `~/.config/lessonforge/config.toml`
///
/// `LESSONFORGE_OPENAI_KEY` overrides the OpenAI API key.
pub fn load_config() -> Result<LessonforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LessonforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("lessonforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => parse_config_file(&path)?,
        None => LessonforgeConfig::default(),
    };

    if let Ok(key) = std::env::var("LESSONFORGE_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<LessonforgeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let mut config = toml::from_str::<LessonforgeConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;

    // Relative directories are relative to the config file.
    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        for dir in [&mut config.data_dir, &mut config.content_dir] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("lessonforge"))
}

/// Create a generator instance from its configuration.
///
/// An OpenAI entry without a key yields the mock generator.
pub fn create_generator(name: &str, config: &ProviderConfig) -> Result<Box<dyn TextGenerator>> {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            if api_key.trim().is_empty() {
                tracing::warn!("provider '{name}' has no API key, using mock responses");
                return Ok(Box::new(MockGenerator::default()));
            }
            Ok(Box::new(OpenAiGenerator::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
            )?))
        }
        ProviderConfig::Mock => Ok(Box::new(MockGenerator::default())),
    }
}

impl LessonforgeConfig {
    /// Build the generator for `provider` (or the default provider) and
    /// `model`.
    ///
    /// The mock model id and unconfigured providers both fall back to the
    /// mock generator.
    pub fn generator(&self, provider: Option<&str>, model: &str) -> Result<Box<dyn TextGenerator>> {
        let name = provider.unwrap_or(&self.default_provider);
        if model == MOCK_MODEL {
            return Ok(Box::new(MockGenerator::default()));
        }
        match self.providers.get(name) {
            Some(config) => create_generator(name, config),
            None if provider.is_some() => {
                anyhow::bail!("provider '{name}' not found in config")
            }
            None => {
                tracing::warn!("no '{name}' provider configured, using mock responses");
                Ok(Box::new(MockGenerator::default()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_LESSONFORGE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_LESSONFORGE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_LESSONFORGE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_LESSONFORGE_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = LessonforgeConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.default_model, "gpt-3.5-turbo");
        assert_eq!(config.default_temperature, 0.7);
        assert_eq!(config.max_tokens, 250);
    }

    #[test]
    fn parse_provider_config() {
        let toml_str = r#"
default_provider = "openai"
max_tokens = 400

[providers.openai]
type = "openai"
api_key = "sk-openai"

[providers.offline]
type = "mock"
"#;
        let config: LessonforgeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.max_tokens, 400);
        assert!(matches!(
            config.providers.get("offline"),
            Some(ProviderConfig::Mock)
        ));
    }

    #[test]
    fn debug_masks_api_key() {
        let config = ProviderConfig::OpenAI {
            api_key: "sk-secret".into(),
            base_url: None,
            org_id: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn relative_dirs_follow_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lessonforge.toml");
        std::fs::write(&path, "content_dir = \"lessons\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.content_dir, dir.path().join("lessons"));
        assert_eq!(config.data_dir, dir.path().join("./lessonforge-data"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(load_config_from(Some(Path::new("/nonexistent/lessonforge.toml"))).is_err());
    }

    #[test]
    fn empty_key_falls_back_to_mock() {
        let config = ProviderConfig::OpenAI {
            api_key: "  ".into(),
            base_url: None,
            org_id: None,
        };
        let generator = create_generator("openai", &config).unwrap();
        assert_eq!(generator.name(), "mock");
    }

    #[test]
    fn generator_selection() {
        let mut config = LessonforgeConfig::default();
        assert_eq!(config.generator(None, "gpt-4").unwrap().name(), "mock");
        assert!(config.generator(Some("nope"), "gpt-4").is_err());

        config.providers.insert(
            "openai".into(),
            ProviderConfig::OpenAI {
                api_key: "sk-test".into(),
                base_url: Some("http://127.0.0.1:9".into()),
                org_id: None,
            },
        );
        assert_eq!(config.generator(None, "gpt-4").unwrap().name(), "openai");
        assert_eq!(config.generator(None, MOCK_MODEL).unwrap().name(), "mock");
    }
}

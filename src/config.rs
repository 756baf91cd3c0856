use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{IllustrateError, Result};

mod env;

pub use env::{Env, parse_dotenv};

pub const API_BASE_KEY: &str = "TIMEWEB_API_BASE";
pub const API_TOKEN_KEY: &str = "TIMEWEB_API_TOKEN";

pub const DEFAULT_MODEL: &str = "gpt-5-nano";
pub const DEFAULT_INPUT_DIR: &str = "input";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

pub const DEFAULT_PROMPT: &str = "Это эскиз страниц детской книжки. Сгенерируй страницу детской книжки на основе этого эскиза, используй в качестве главного персонажа девочку 8ми лет. Стиль изображений рисованный цветными карандашами, просто и приятный. На заднем плане сделай детскую комнату. Надписи должны отстаться на том же языке. Персонаж должен быть одинаковый для всех версий картинок";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_input_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_DIR)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Non-secret batch settings, optionally read from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            prompt: default_prompt(),
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BatchSettings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings = toml::from_str::<Self>(raw)
            .map_err(|err| IllustrateError::Config(format!("settings: {err}")))?;
        if settings.timeout_secs == 0 {
            return Err(IllustrateError::Config(
                "settings: timeout_secs must be > 0".to_string(),
            ));
        }
        if settings.model.trim().is_empty() {
            return Err(IllustrateError::Config(
                "settings: model must not be empty".to_string(),
            ));
        }
        Ok(settings)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
            IllustrateError::Config(format!("read {} failed: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }
}

/// Validated runtime configuration, built once at startup.
#[derive(Clone)]
pub struct Config {
    pub api_base: String,
    pub api_token: String,
    pub model: String,
    pub prompt: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base", &self.api_base)
            .field("api_token", &"<redacted>")
            .field("model", &self.model)
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Resolves credentials from `env`, failing with every missing key at once.
    pub fn from_env(env: &Env, settings: BatchSettings) -> Result<Self> {
        let api_base = env.get(API_BASE_KEY);
        let api_token = env.get(API_TOKEN_KEY);

        let (api_base, api_token) = match (api_base, api_token) {
            (Some(base), Some(token)) => (base, token),
            (base, token) => {
                let mut missing = Vec::new();
                if base.is_none() {
                    missing.push(API_BASE_KEY.to_string());
                }
                if token.is_none() {
                    missing.push(API_TOKEN_KEY.to_string());
                }
                return Err(IllustrateError::MissingConfig(missing));
            }
        };

        Ok(Self {
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            api_token: api_token.trim().to_string(),
            model: settings.model,
            prompt: settings.prompt,
            input_dir: settings.input_dir,
            output_dir: settings.output_dir,
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    pub fn responses_url(&self) -> String {
        format!("{}/responses", self.api_base)
    }
}

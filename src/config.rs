use crate::types::{AppError, AppResult};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub api_key: String,
    pub api_base: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_tool_rounds: usize,
    pub system_prompt: Option<String>,
    /// Longest wait for the next bytes of a response.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory for tool-mode scratch files. `None` means the platform temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl UploadConfig {
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(env::temp_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
                cors_allowed_origins: vec!["*".to_string()],
                max_upload_bytes: 10 * 1024 * 1024,
            },
            llm: LLMConfig {
                provider: "openai".to_string(),
                api_key: String::new(),
                api_base: None,
                model: "gpt-4o-mini".to_string(),
                temperature: None,
                max_tokens: None,
                max_tool_rounds: 4,
                system_prompt: None,
                timeout_secs: 120,
                connect_timeout_secs: 10,
            },
            upload: UploadConfig { scratch_dir: None },
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            server: ServerConfig {
                port: parse_or("PORT", defaults.server.port)?,
                host: env::var("HOST").unwrap_or(defaults.server.host),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.server.cors_allowed_origins),
                max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.server.max_upload_bytes)?,
            },
            llm: LLMConfig {
                provider: env::var("LLM_PROVIDER").unwrap_or(defaults.llm.provider),
                api_key: env::var("LLM_API_KEY").unwrap_or_default(),
                api_base: non_empty("LLM_API_BASE"),
                model: env::var("LLM_MODEL").unwrap_or(defaults.llm.model),
                temperature: parse_opt("LLM_TEMPERATURE")?,
                max_tokens: parse_opt("LLM_MAX_TOKENS")?,
                max_tool_rounds: parse_or("LLM_MAX_TOOL_ROUNDS", defaults.llm.max_tool_rounds)?,
                system_prompt: non_empty("LLM_SYSTEM_PROMPT"),
                timeout_secs: parse_or("LLM_TIMEOUT_SECS", defaults.llm.timeout_secs)?,
                connect_timeout_secs: parse_or(
                    "LLM_CONNECT_TIMEOUT_SECS",
                    defaults.llm.connect_timeout_secs,
                )?,
            },
            upload: UploadConfig {
                scratch_dir: non_empty("SCRATCH_DIR").map(PathBuf::from),
            },
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_opt<T: FromStr>(key: &str) -> AppResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match non_empty(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
        None => Ok(None),
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(key)?.unwrap_or(default))
}

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::config::data::Config;
use crate::core::config::io::project_dirs;
use crate::utils::url::normalize_base_url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a supportive mental coach. Keep responses concise and helpful (2-4 sentences).";

pub const API_URL_ENV: &str = "MENTAL_COACH_API_URL";
pub const LEGACY_API_URL_ENV: &str = "NEXT_PUBLIC_API_URL";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Where history lives when neither `--data-dir` nor `data_dir` is set.
pub fn default_data_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => {
            warn!("Could not determine a home directory; storing history in ./.mental-coach");
            PathBuf::from(".mental-coach")
        }
    }
}

/// What the chat client needs: the relay URL and the history directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_url: String,
    pub data_dir: PathBuf,
}

impl ClientSettings {
    /// Precedence: command-line flag, environment, config file, default.
    pub fn resolve<F>(
        config: &Config,
        env: F,
        api_url_override: Option<&str>,
        data_dir_override: Option<&Path>,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = non_empty(api_url_override.map(str::to_string))
            .or_else(|| non_empty(env(API_URL_ENV)))
            .or_else(|| non_empty(env(LEGACY_API_URL_ENV)))
            .or_else(|| non_empty(config.api_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let data_dir = data_dir_override
            .map(Path::to_path_buf)
            .or_else(|| config.data_dir.clone())
            .unwrap_or_else(default_data_dir);

        Self {
            api_url: normalize_base_url(&api_url),
            data_dir,
        }
    }
}

/// What `serve` needs. `api_key` stays optional: the relay starts without
/// one and answers requests with a configuration error instead.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    pub bind: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
}

impl RelaySettings {
    pub fn resolve<F>(config: &Config, env: F, bind_override: Option<&str>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = &config.server;

        let bind = non_empty(bind_override.map(str::to_string))
            .or_else(|| non_empty(server.bind.clone()))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let base_url = non_empty(env(BASE_URL_ENV))
            .or_else(|| non_empty(server.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string());

        Self {
            bind,
            base_url: normalize_base_url(&base_url),
            api_key: non_empty(env(API_KEY_ENV)),
            model: non_empty(server.model.clone()).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: server.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: server.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            system_prompt: non_empty(server.system_prompt.clone())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

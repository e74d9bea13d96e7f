use std::{env, fs, path::Path};

use crate::{errors::Error, Result};

/// Typed configuration for the bot client.
#[derive(Clone, Debug)]
pub struct Config {
    /// API token used for the handshake and chat-message posting.
    pub api_token: String,
    /// Base URL of the synchronous web API (no trailing slash).
    pub api_base_url: String,
    /// Text posted to every public joined channel after connecting.
    pub greeting_text: String,
    /// Text posted to every public joined channel on disconnect.
    pub farewell_text: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let api_token = env_str("SLACK_API_TOKEN").unwrap_or_default();
        if api_token.trim().is_empty() {
            return Err(Error::Config(
                "SLACK_API_TOKEN environment variable is required".to_string(),
            ));
        }

        let api_base_url = env_str("SLACK_API_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://slack.com/api".to_string());

        let greeting_text = env_str("BOT_GREETING")
            .and_then(non_empty)
            .unwrap_or_else(|| "Hello! I'm online.".to_string());
        let farewell_text = env_str("BOT_FAREWELL")
            .and_then(non_empty)
            .unwrap_or_else(|| "Goodbye!".to_string());

        Ok(Self {
            api_token,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            greeting_text,
            farewell_text,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Minimal `.env` support: `KEY=VALUE` lines with `#` comments and
/// optional surrounding quotes. Variables already set in the real
/// environment always win.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for line in contents.lines() {
        let Some((key, value)) = parse_env_line(line) else {
            continue;
        };
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    Some((key.to_string(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

use crate::error::{Result, TutorError};

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4";
pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_WATCH_HOST: &str = "www.youtube.com";

/// Process-wide settings, resolved once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub youtube_api_key: String,
    pub discord_token: String,
    pub guild_id: Option<u64>,
    pub llm_base_url: String,
    pub llm_model: String,
    /// Stream answers fragment by fragment instead of one batch response.
    pub llm_stream: bool,
    pub youtube_api_base: String,
    pub watch_host: String,
}

impl Config {
    /// Load from the process environment, after merging a local `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Every missing required key is
    /// reported in one error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut missing = Vec::new();
        let mut require = |key: &'static str| {
            get(key).unwrap_or_else(|| {
                missing.push(key);
                String::new()
            })
        };
        let openai_api_key = require("OPENAI_API_KEY");
        let youtube_api_key = require("YOUTUBE_API_KEY");
        let discord_token = require("DISCORD_TOKEN");

        if !missing.is_empty() {
            return Err(TutorError::Config(format!(
                "missing required environment variable(s): {}. Set them in the environment or a .env file.",
                missing.join(", ")
            )));
        }

        let guild_id = match get("DISCORD_GUILD_ID") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                TutorError::Config(format!("DISCORD_GUILD_ID is not a number: {raw}"))
            })?),
            None => None,
        };

        let llm_stream = match get("LLM_STREAM").as_deref().map(str::to_ascii_lowercase) {
            None => true,
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
            Some(v) => {
                return Err(TutorError::Config(format!(
                    "LLM_STREAM must be true or false, got {v}"
                )))
            }
        };

        Ok(Self {
            openai_api_key,
            youtube_api_key,
            discord_token,
            guild_id,
            llm_base_url: get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_stream,
            youtube_api_base: get("YOUTUBE_API_BASE")
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string()),
            watch_host: get("YOUTUBE_WATCH_HOST").unwrap_or_else(|| DEFAULT_WATCH_HOST.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("OPENAI_API_KEY", "sk-test"),
        ("YOUTUBE_API_KEY", "yt-test"),
        ("DISCORD_TOKEN", "discord-test"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.llm_base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm_model, "gpt-4");
        assert!(config.llm_stream);
        assert_eq!(config.watch_host, "www.youtube.com");
        assert_eq!(config.guild_id, None);
    }

    #[test]
    fn test_missing_credentials_are_named() {
        let err = Config::from_lookup(lookup_from(&[("DISCORD_TOKEN", "t")])).unwrap_err();
        assert!(matches!(err, TutorError::Config(_)));
        let msg = err.to_string();
        assert!(msg.contains("OPENAI_API_KEY"));
        assert!(msg.contains("YOUTUBE_API_KEY"));
        assert!(!msg.contains("DISCORD_TOKEN"));
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let err = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("YOUTUBE_API_KEY", "   "),
            ("DISCORD_TOKEN", "t"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("YOUTUBE_API_KEY"));
    }

    #[test]
    fn test_stream_toggle_and_guild() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LLM_STREAM", "off"));
        pairs.push(("DISCORD_GUILD_ID", "1234"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(!config.llm_stream);
        assert_eq!(config.guild_id, Some(1234));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LLM_STREAM", "sometimes"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}

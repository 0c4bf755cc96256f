// config.rs - Bot configuration
// Reads botconfig.txt (KEY=VALUE lines) with multi-path fallback and turns it
// into a typed BotConfig that commands read from the TypeMap.
//
// Used by: main.rs (startup), every command that needs a setting

use log::{info, warn};
use serenity::{model::id::UserId, prelude::TypeMapKey};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

pub const CONFIG_PATHS: [&str; 4] = [
    "botconfig.txt",
    "../botconfig.txt",
    "../../botconfig.txt",
    "src/botconfig.txt",
];

const TOKEN_PLACEHOLDER: &str = "YOUR_BOT_TOKEN_HERE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No botconfig.txt file found in any expected location (., .., ../.., src/)")]
    NotFound,
    #[error("DISCORD_TOKEN not found in botconfig.txt")]
    MissingToken,
    #[error("DISCORD_TOKEN in botconfig.txt is set to a placeholder value")]
    PlaceholderToken,
    #[error("{key} must be a valid number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub prefix: String,
    pub owner_id: Option<UserId>,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub json_backends: Vec<String>,
    pub imgur_client_id: Option<String>,
    pub meme_api_url: String,
    pub wiki_language: String,
    pub payday_credits: i64,
    pub payday_cooldown_secs: i64,
    pub default_timeout_minutes: i64,
}

pub struct ConfigKey;
impl TypeMapKey for ConfigKey {
    type Value = Arc<BotConfig>;
}

/// Parse KEY=VALUE lines, skipping blanks and `#` comments
pub fn parse_config(content: &str) -> HashMap<String, String> {
    // Remove BOM if present
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut config = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            config.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    config
}

fn non_empty(map: &HashMap<String, String>, key: &str) -> Option<String> {
    map.get(key).filter(|v| !v.is_empty()).cloned()
}

fn number(map: &HashMap<String, String>, key: &'static str, default: i64) -> Result<i64, ConfigError> {
    match non_empty(map, key) {
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(default),
    }
}

impl BotConfig {
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token = non_empty(map, "DISCORD_TOKEN").ok_or(ConfigError::MissingToken)?;
        if token == TOKEN_PLACEHOLDER {
            return Err(ConfigError::PlaceholderToken);
        }

        let owner_id = match non_empty(map, "BOT_OWNER_ID") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(id) => Some(UserId(id)),
                Err(_) => {
                    warn!("[CONFIG] BOT_OWNER_ID '{}' is not a user id, owner commands disabled", raw);
                    None
                }
            },
            None => None,
        };

        let json_backends = non_empty(map, "JSON_BACKENDS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                crate::json::DEFAULT_PREFERENCES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        Ok(Self {
            token,
            prefix: non_empty(map, "PREFIX").unwrap_or_else(|| "^".to_string()),
            owner_id,
            data_dir: PathBuf::from(non_empty(map, "DATA_DIR").unwrap_or_else(|| "data".to_string())),
            log_level: non_empty(map, "LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            json_backends,
            imgur_client_id: non_empty(map, "IMGUR_CLIENT_ID"),
            meme_api_url: non_empty(map, "MEME_API_URL")
                .unwrap_or_else(|| "https://meme-api.com/gimme".to_string()),
            wiki_language: non_empty(map, "WIKI_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            payday_credits: number(map, "PAYDAY_CREDITS", 120)?,
            payday_cooldown_secs: number(map, "PAYDAY_COOLDOWN_SECS", 300)?,
            default_timeout_minutes: number(map, "DEFAULT_TIMEOUT_MINUTES", 60)?,
        })
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner_id == Some(user)
    }
}

/// Read botconfig.txt from the first location that has one
pub fn load_bot_config() -> Result<BotConfig, ConfigError> {
    for config_path in &CONFIG_PATHS {
        match fs::read_to_string(config_path) {
            Ok(content) => {
                let map = parse_config(&content);
                let config = BotConfig::from_map(&map)?;
                info!("[CONFIG] Configuration loaded from {}", config_path);
                return Ok(config);
            }
            // Try next path
            Err(_) => continue,
        }
    }

    Err(ConfigError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_skips_comments_and_bom() {
        let map = parse_config("\u{feff}# comment\n\nDISCORD_TOKEN = abc=def \nPREFIX=!\nnot a pair\n");
        assert_eq!(map.get("DISCORD_TOKEN").map(String::as_str), Some("abc=def"));
        assert_eq!(map.get("PREFIX").map(String::as_str), Some("!"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_defaults() {
        let map = parse_config("DISCORD_TOKEN=token");
        let config = BotConfig::from_map(&map).unwrap();
        assert_eq!(config.prefix, "^");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.owner_id, None);
        assert_eq!(config.json_backends, vec!["serde_json_vec", "serde_json"]);
        assert_eq!(config.payday_credits, 120);
        assert_eq!(config.default_timeout_minutes, 60);
        assert!(config.imgur_client_id.is_none());
    }

    #[test]
    fn test_token_is_required_and_not_placeholder() {
        assert!(matches!(
            BotConfig::from_map(&parse_config("PREFIX=!")),
            Err(ConfigError::MissingToken)
        ));
        assert!(matches!(
            BotConfig::from_map(&parse_config("DISCORD_TOKEN=YOUR_BOT_TOKEN_HERE")),
            Err(ConfigError::PlaceholderToken)
        ));
    }

    #[test]
    fn test_owner_and_numbers() {
        let map = parse_config(
            "DISCORD_TOKEN=t\nBOT_OWNER_ID=1385309017881968761\nJSON_BACKENDS=serde_json_pretty, serde_json\nPAYDAY_CREDITS=50",
        );
        let config = BotConfig::from_map(&map).unwrap();
        assert!(config.is_owner(UserId(1385309017881968761)));
        assert!(!config.is_owner(UserId(1)));
        assert_eq!(config.json_backends, vec!["serde_json_pretty", "serde_json"]);
        assert_eq!(config.payday_credits, 50);

        let bad = parse_config("DISCORD_TOKEN=t\nPAYDAY_COOLDOWN_SECS=soon");
        assert!(matches!(
            BotConfig::from_map(&bad),
            Err(ConfigError::InvalidNumber { key: "PAYDAY_COOLDOWN_SECS", .. })
        ));
    }
}

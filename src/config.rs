use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use dotenvy::dotenv;
use encoding_rs::Encoding;
use tracing::Level;
use url::Url;

use crate::error::ConfigError;

const DEFAULT_QUESTIONS_DIR: &str = "quiz_questions";
const DEFAULT_QUESTIONS_EXTENSION: &str = "txt";
const DEFAULT_QUESTIONS_ENCODING: &str = "koi8-r";
const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: Level,
    pub corpus: CorpusConfig,
    pub session_store: SessionStoreConfig,
    pub telegram: Option<TelegramConfig>,
    pub vk: Option<VkConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusConfig {
    pub dir: PathBuf,
    pub extension: String,
    pub encoding: &'static Encoding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreConfig {
    Redis { url: String },
    InMemory,
}

#[derive(Clone, PartialEq)]
pub struct TelegramConfig {
    pub token: String,
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    pub url: Url,
    pub addr: SocketAddr,
}

#[derive(Clone, PartialEq, Eq)]
pub struct VkConfig {
    pub token: String,
    pub group_id: u64,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"***")
            .field("webhook", &self.webhook)
            .finish()
    }
}

impl std::fmt::Debug for VkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VkConfig")
            .field("token", &"***")
            .field("group_id", &self.group_id)
            .finish()
    }
}

impl Config {
    /// Reads the process environment, honouring a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let log_level = parse_or("LOG_LEVEL", get("LOG_LEVEL"), Level::INFO)?;

        let encoding_label =
            get("QUIZ_QUESTIONS_ENCODING").unwrap_or_else(|| DEFAULT_QUESTIONS_ENCODING.into());
        let encoding = Encoding::for_label(encoding_label.trim().as_bytes()).ok_or(
            ConfigError::Invalid {
                var: "QUIZ_QUESTIONS_ENCODING",
                value: encoding_label.clone(),
            },
        )?;
        let corpus = CorpusConfig {
            dir: get("QUIZ_QUESTIONS_DIR")
                .unwrap_or_else(|| DEFAULT_QUESTIONS_DIR.into())
                .into(),
            extension: get("QUIZ_QUESTIONS_EXTENSION")
                .map(|ext| ext.trim_start_matches('.').to_owned())
                .unwrap_or_else(|| DEFAULT_QUESTIONS_EXTENSION.into()),
            encoding,
        };

        let session_store = match (get("REDIS_URL"), get("REDIS_HOST")) {
            (Some(url), _) => SessionStoreConfig::Redis { url },
            (None, Some(host)) => {
                let port = parse_or("REDIS_PORT", get("REDIS_PORT"), DEFAULT_REDIS_PORT)?;
                let url = match get("REDIS_PASSWORD") {
                    Some(password) => format!("redis://:{password}@{host}:{port}/"),
                    None => format!("redis://{host}:{port}/"),
                };
                SessionStoreConfig::Redis { url }
            }
            (None, None) => SessionStoreConfig::InMemory,
        };

        let telegram = match get("TG_BOT_TOKEN").or_else(|| get("TELOXIDE_TOKEN")) {
            Some(token) => Some(TelegramConfig {
                token,
                webhook: webhook(&get)?,
            }),
            None => None,
        };

        let vk = match get("VK_GROUP_TOKEN") {
            Some(token) => {
                let group_id = get("VK_GROUP_ID").ok_or(ConfigError::Missing("VK_GROUP_ID"))?;
                Some(VkConfig {
                    token,
                    group_id: parse("VK_GROUP_ID", group_id)?,
                })
            }
            None => None,
        };

        if telegram.is_none() && vk.is_none() {
            return Err(ConfigError::NoPlatform);
        }

        Ok(Self {
            log_level,
            corpus,
            session_store,
            telegram,
            vk,
        })
    }
}

fn webhook(get: &impl Fn(&str) -> Option<String>) -> Result<Option<WebhookConfig>, ConfigError> {
    match (get("WEBHOOK_URL"), get("WEBHOOK_ADDR")) {
        (Some(url), Some(addr)) => Ok(Some(WebhookConfig {
            url: parse("WEBHOOK_URL", url)?,
            addr: parse("WEBHOOK_ADDR", addr)?,
        })),
        (Some(_), None) => Err(ConfigError::Missing("WEBHOOK_ADDR")),
        (None, Some(_)) => Err(ConfigError::Missing("WEBHOOK_URL")),
        (None, None) => Ok(None),
    }
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

fn parse_or<T: FromStr>(
    var: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    value.map_or(Ok(default), |value| parse(var, value))
}

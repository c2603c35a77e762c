use std::{error::Error, path::PathBuf};

use thiserror::Error;

/// Failures of the quiz core. "No pending answer" is a state, not an error.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("failed to read question file {path}: {source}")]
    CorpusLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("question file {path} is not valid {encoding}")]
    CorpusDecode {
        path: PathBuf,
        encoding: &'static str,
    },
    #[error("failed to list question directory {path}: {source}")]
    CorpusDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("question corpus is empty")]
    EmptyCorpus,
    #[error("session store unavailable: {0}")]
    SessionStoreUnavailable(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl QuizError {
    pub fn session_store(err: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::SessionStoreUnavailable(err.into())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} should be set")]
    Missing(&'static str),
    #[error("{var} can't be parsed: '{value}'")]
    Invalid { var: &'static str, value: String },
    #[error("no chat platform configured: set TG_BOT_TOKEN or VK_GROUP_TOKEN")]
    NoPlatform,
}

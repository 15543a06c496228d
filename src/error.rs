use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Codetriage operations
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid rule '{rule_id}': {reason}")]
    RuleConfig { rule_id: String, reason: String },

    #[error("Path outside the analyzed source root: {}", path.display())]
    PathViolation { path: PathBuf },

    #[error("Analyzer backend failed: {0}")]
    Producer(String),

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Suggestion error: {0}")]
    Suggestion(String),
}

pub type Result<T> = std::result::Result<T, TriageError>;

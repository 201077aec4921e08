use thiserror::Error;

/// Errors surfaced by configuration loading and the headless runner.
///
/// The encounter core itself never returns errors across its boundary:
/// invalid transitions absorb as no-ops and degenerate rosters resolve
/// straight to a terminal phase the caller polls.
#[derive(Error, Debug)]
pub enum SkirmishError {
    #[error("Invalid encounter config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SkirmishError>;

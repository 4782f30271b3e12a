use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse(String),
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "settings {}: {message}", path.display()),
            Self::Parse(msg) => write!(f, "settings parse error: {msg}"),
            Self::Validation(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

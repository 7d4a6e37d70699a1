use std::fmt;

/// Errors raised while reading or substituting configuration values.
///
/// A plain enum with a hand-written `Display`, no `anyhow`/`eyre` wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    UnclosedPlaceholder(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config type mismatch for `{key}`: expected {expected}")
            }
            ConfigError::UnclosedPlaceholder(raw) => {
                write!(f, "unclosed `${{...}}` placeholder in: {raw}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

//! Error types

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Which side of a diff request an input belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Previous,
    Current,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Previous => write!(f, "previous"),
            Side::Current => write!(f, "current"),
        }
    }
}

/// Errors loading or validating a rule document
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The rules file exists but could not be read
    #[error("failed to read rules file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML for a rule set
    #[error("failed to parse rules document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but carries invalid values
    #[error("invalid rules configuration: {0}")]
    Invalid(String),
}

/// Errors compiling textual patterns into matchers
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid {scope} pattern '{pattern}': {source}")]
    InvalidRegex {
        /// Where the pattern was declared, e.g. `category 'os'`
        scope: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown change_type '{change_type}' in severity level '{level}'")]
    UnknownChangeKind { level: String, change_type: String },
}

/// Errors computing a structural diff
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("failed to parse {side} inventory payload: {source}")]
    InvalidPayload {
        side: Side,
        #[source]
        source: serde_json::Error,
    },
}

impl DiffError {
    pub fn side(&self) -> Side {
        match self {
            DiffError::InvalidPayload { side, .. } => *side,
        }
    }
}

/// A field path unfit for storage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldPathError {
    #[error("field path cannot be empty")]
    Empty,

    #[error("field path is {length} characters, maximum is {max}")]
    TooLong { length: usize, max: usize },

    #[error("field path contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Any error surfaced by the engine facade
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("rules watcher error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_error_names_side() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = DiffError::InvalidPayload {
            side: Side::Current,
            source,
        };
        assert_eq!(err.side(), Side::Current);
        assert!(err.to_string().starts_with("failed to parse current inventory payload"));
    }

    #[test]
    fn test_unknown_change_kind_message() {
        let err = PatternError::UnknownChangeKind {
            level: "high".to_string(),
            change_type: "move".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown change_type 'move' in severity level 'high'"
        );
    }
}

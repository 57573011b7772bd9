use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the exploration workspace
#[derive(Error, Debug)]
pub enum PpaError {
    #[error("Parameter space error: {0}")]
    Space(#[from] SpaceError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while declaring or walking a parameter space.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpaceError {
    #[error("Unsupported dimension for grid enumeration: {name} has kind {kind}")]
    UnsupportedDimension { name: String, kind: String },

    #[error("Invalid bounds for dimension {name}: lower {lower} is above upper {upper}")]
    InvalidBounds {
        name: String,
        lower: String,
        upper: String,
    },

    #[error("Duplicate dimension name: {name}")]
    DuplicateName { name: String },

    #[error("Parameter space has no dimensions")]
    EmptySpace,

    #[error("Grid size overflows u64")]
    GridOverflow,

    #[error("Grid index {index} is out of range for a grid of {grid_size} points")]
    IndexOutOfRange { index: u64, grid_size: u64 },

    #[error("Configuration does not fit the parameter space: {message}")]
    InvalidConfiguration { message: String },

    #[error("Invalid dimension declaration: {message}")]
    InvalidDeclaration { message: String },
}

/// Failures of the external scoring oracle.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Failed to launch oracle {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write request artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Oracle exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    #[error("Oracle produced no output")]
    EmptyOutput,

    #[error("Oracle output does not end with an integer cost: {line:?}")]
    MalformedOutput { line: String },

    #[error("Oracle reported a negative cost: {value}")]
    NegativeCost { value: i64 },

    #[error("Oracle returned {got} costs for a batch of {expected}")]
    CostCountMismatch { expected: usize, got: usize },

    #[error("Cost function failed: {message}")]
    Callback { message: String },
}

/// Result type alias for exploration operations
pub type PpaResult<T> = Result<T, PpaError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::PpaError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_their_context() {
        let error = SpaceError::UnsupportedDimension {
            name: "clock_ghz".to_string(),
            kind: "num".to_string(),
        };

        assert!(error.to_string().contains("clock_ghz"));
        assert!(error.to_string().contains("num"));
    }

    #[test]
    fn sub_errors_convert_into_ppa_error() {
        let oracle_error = OracleError::MalformedOutput {
            line: "done".to_string(),
        };
        let ppa_error: PpaError = oracle_error.into();

        match ppa_error {
            PpaError::Oracle(OracleError::MalformedOutput { line }) => assert_eq!(line, "done"),
            other => panic!("Expected Oracle error, got {other:?}"),
        }
    }

    #[test]
    fn config_error_macro_formats_message() {
        let err = config_error!("Missing required field: {}", "oracle");
        assert_eq!(err.to_string(), "Configuration error: Missing required field: oracle");
    }
}

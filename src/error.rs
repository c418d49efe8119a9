//! Unified error type for the simulation core.
//!
//! Every fallible operation in this crate returns [`Result<T>`], whose error
//! variant carries enough context (line numbers, offending frequency,
//! underlying I/O error) to reproduce the failure without re-running the
//! analysis.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CircuitError>;

/// All errors the simulation core can produce.
#[derive(Debug, Error)]
pub enum CircuitError {
    // -- DSL parsing -----------------------------------------------------
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    // -- Circuit model -----------------------------------------------------
    #[error("duplicate component name: {name}")]
    DuplicateName { name: String },

    #[error("not found: {what} '{name}'")]
    NotFound { what: &'static str, name: String },

    #[error("topology error: {message}")]
    Topology { message: String },

    // -- Numerics ----------------------------------------------------------
    #[error("singular matrix at frequency {frequency} Hz")]
    SingularMatrix { frequency: f64 },

    #[error("non-finite value encountered at frequency {frequency} Hz: {detail}")]
    Numeric { frequency: f64, detail: String },

    // -- Configuration -------------------------------------------------------
    #[error("configuration error: {message}")]
    Config { message: String },

    // -- External runner -----------------------------------------------------
    #[error("reference runner failed (exit status {status:?}): {stderr}")]
    Runner {
        status: Option<i32>,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CircuitError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        CircuitError::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        CircuitError::DuplicateName { name: name.into() }
    }

    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        CircuitError::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn topology(message: impl Into<String>) -> Self {
        CircuitError::Topology {
            message: message.into(),
        }
    }

    pub fn numeric(frequency: f64, detail: impl Into<String>) -> Self {
        CircuitError::Numeric {
            frequency,
            detail: detail.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        CircuitError::Config {
            message: message.into(),
        }
    }
}

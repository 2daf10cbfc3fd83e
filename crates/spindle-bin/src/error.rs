// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the spindle binary.

use spindle_modbus::{ConfigError, ConnectError, TransportError};
use thiserror::Error;

/// Result type alias for spindle-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the spindle binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Link parameters rejected.
    #[error("Invalid link settings: {0}")]
    Link(#[from] ConfigError),

    /// The serial port could not be opened.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The drive did not acknowledge a command.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Link(_) => 2,
            Self::Connect(_) => 3,
            Self::Transport(_) => 4,
            Self::Io(_) => 5,
            Self::Runtime(_) => 6,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }

    /// Returns hints that may help the user fix the problem.
    pub fn hints(&self) -> Vec<&'static str> {
        match self {
            Self::Link(e) => e.recovery_hints(),
            Self::Connect(e) => e.recovery_hints(),
            Self::Transport(e) => e.recovery_hints(),
            Self::WithContext { source, .. } => source.hints(),
            _ => Vec::new(),
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        // `{:#}` keeps the whole context chain on one line.
        Self::Runtime(format!("{:#}", err))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with appropriate formatting.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }

    for hint in error.hints() {
        eprintln!("  Hint: {}", hint);
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

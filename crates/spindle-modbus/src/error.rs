// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the spindle Modbus RTU master.
//!
//! Every failure is a typed value the caller can inspect; nothing in this
//! crate prints to the console or panics on bad input.
//!
//! # Error Categories
//!
//! ```text
//! ConfigError     - link parameters rejected before a port is touched
//! ConnectError    - the serial port could not be opened
//! ModbusError     - a response frame rejected by the codec
//! TransportError  - a single request/response exchange failed
//!   └── (absorbs ModbusError via From)
//! ```
//!
//! Only [`TransportError::Io`] is a link fault. Every other transport error
//! leaves the session connected and the next command may be sent as usual.
//!
//! # Examples
//!
//! ```
//! use spindle_modbus::error::{ErrorSeverity, TransportError};
//! use std::time::Duration;
//!
//! let error = TransportError::NoResponse { timeout: Duration::from_millis(500) };
//! assert!(!error.is_link_fault());
//! assert_eq!(error.severity(), ErrorSeverity::Warning);
//!
//! for hint in error.recovery_hints() {
//!     println!("Hint: {}", hint);
//! }
//! ```

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

use crate::codec::format_hex;

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result of decoding a frame.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Result of a request/response exchange.
pub type TransportResult<T> = Result<T, TransportError>;

// =============================================================================
// ConfigError
// =============================================================================

/// Link parameters that cannot describe a usable serial link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Slave address outside 1..=247.
    #[error("Invalid slave id {slave_id}: must be between 1 and 247")]
    InvalidSlaveId {
        /// The rejected address.
        slave_id: u8,
    },

    /// Baud rate of zero.
    #[error("Invalid baud rate {baud_rate}: must be greater than zero")]
    InvalidBaudRate {
        /// The rejected rate.
        baud_rate: u32,
    },

    /// Response timeout of zero.
    #[error("Invalid read timeout {timeout:?}: must be greater than zero")]
    InvalidTimeout {
        /// The rejected timeout.
        timeout: Duration,
    },

    /// A required field was left empty.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// A textual value that does not name any known option.
    #[error("Invalid value '{value}' for {field}: expected {expected}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// The rejected input.
        value: String,
        /// Accepted spellings.
        expected: &'static str,
    },
}

impl ConfigError {
    /// Creates an invalid value error.
    #[inline]
    pub fn invalid_value(
        field: &'static str,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
            expected,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidSlaveId { .. } => ErrorCode::new(1, 1),
            Self::InvalidBaudRate { .. } => ErrorCode::new(1, 2),
            Self::InvalidTimeout { .. } => ErrorCode::new(1, 3),
            Self::MissingField { .. } => ErrorCode::new(1, 4),
            Self::InvalidValue { .. } => ErrorCode::new(1, 5),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidSlaveId { .. } => vec![
                "Use the station address configured on the drive (1-247)",
                "Address 0 is broadcast and never answers",
            ],
            Self::InvalidBaudRate { .. } => {
                vec!["Common rates are 9600, 19200 and 38400 baud"]
            }
            Self::InvalidTimeout { .. } => vec!["Use a timeout such as 500ms or 1s"],
            Self::MissingField { .. } => vec!["Set the field on the command line or in the profile"],
            Self::InvalidValue { .. } => vec!["Check the spelling of the value"],
        }
    }
}

// =============================================================================
// ConnectError
// =============================================================================

/// The serial port could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The port does not exist, is busy, or access was denied.
    #[error("Serial port unavailable: {port}: {message}")]
    PortUnavailable {
        /// Port identifier.
        port: String,
        /// Reason reported by the operating system.
        message: String,
    },

    /// The port rejected the requested line settings.
    #[error("Serial parameters rejected for {port}: {message}")]
    InvalidParameters {
        /// Port identifier.
        port: String,
        /// Which parameter was rejected.
        message: String,
    },
}

impl ConnectError {
    /// Creates a port unavailable error.
    #[inline]
    pub fn unavailable(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PortUnavailable {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid parameters error.
    #[inline]
    pub fn invalid_parameters(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Returns the port this error refers to.
    pub fn port(&self) -> &str {
        match self {
            Self::PortUnavailable { port, .. } | Self::InvalidParameters { port, .. } => port,
        }
    }

    /// Returns the severity of this error.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::PortUnavailable { .. } => ErrorCode::new(2, 1),
            Self::InvalidParameters { .. } => ErrorCode::new(2, 2),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::PortUnavailable { .. } => vec![
                "Check that the USB-RS485 adapter is plugged in",
                "Run `spindle ports` to list available ports",
                "Check that no other program holds the port open",
                "On Linux, check membership of the dialout group",
            ],
            Self::InvalidParameters { .. } => vec![
                "Use parity none, even or odd",
                "Use one or two stop bits",
                "Check that the adapter supports the requested baud rate",
            ],
        }
    }

    /// Returns a user-friendly message.
    pub fn user_message(&self) -> String {
        match self {
            Self::PortUnavailable { port, .. } => {
                format!("Could not open serial port {}.", port)
            }
            Self::InvalidParameters { port, message } => {
                format!("Serial port {} does not accept these settings: {}.", port, message)
            }
        }
    }

    /// Logs this error with its code.
    pub fn log(&self, context: &str) {
        tracing::error!(
            error_code = %self.error_code(),
            port = self.port(),
            context = context,
            "{self}"
        );
    }
}

// =============================================================================
// ModbusError
// =============================================================================

/// A response frame rejected by [`decode_response`](crate::codec::decode_response).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModbusError {
    /// The trailing CRC does not match the frame contents.
    #[error("CRC mismatch: computed {expected:#06x}, frame carries {actual:#06x}")]
    ChecksumMismatch {
        /// CRC computed over the received bytes.
        expected: u16,
        /// CRC carried by the frame.
        actual: u16,
    },

    /// The response came from a different station.
    #[error("Response from slave {actual}, expected slave {expected}")]
    UnexpectedSlave {
        /// Address the request was sent to.
        expected: u8,
        /// Address found in the response.
        actual: u8,
    },

    /// The frame is too short, too long, or carries an unknown function code.
    #[error("Malformed response frame: {reason}")]
    MalformedFrame {
        /// What was wrong with it.
        reason: String,
    },

    /// The slave answered with an exception response.
    #[error("Slave exception {code:#04x} on function {function_code:#04x}")]
    SlaveException {
        /// Function code of the request.
        function_code: u8,
        /// Exception code reported by the slave.
        code: u8,
    },
}

impl ModbusError {
    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }
}

/// Returns the standard name of a Modbus exception code.
///
/// Drives may report vendor codes; those are labelled "Unknown Exception".
pub fn exception_name(code: u8) -> &'static str {
    match code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Slave Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Slave Device Busy",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}

// =============================================================================
// TransportError
// =============================================================================

/// A single request/response exchange failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No link is open, or the session is in the failed state.
    #[error("Not connected to a serial port")]
    NotConnected,

    /// Not a single byte arrived before the read timeout.
    #[error("No response from slave within {timeout:?}")]
    NoResponse {
        /// The configured read timeout.
        timeout: Duration,
    },

    /// Some bytes arrived, then the line went quiet.
    #[error("Incomplete response: got {} of {expected} bytes [{}]", .received.len(), format_hex(.received))]
    IncompleteResponse {
        /// Length of a complete response.
        expected: usize,
        /// Bytes received before the timeout.
        received: Vec<u8>,
    },

    /// The response CRC does not match its contents.
    #[error("CRC mismatch: computed {expected:#06x}, frame carries {actual:#06x}")]
    ChecksumMismatch {
        /// CRC computed over the received bytes.
        expected: u16,
        /// CRC carried by the frame.
        actual: u16,
    },

    /// The response came from a different station.
    #[error("Response from slave {actual}, expected slave {expected}")]
    UnexpectedSlave {
        /// Address the request was sent to.
        expected: u8,
        /// Address found in the response.
        actual: u8,
    },

    /// The response could not be interpreted.
    #[error("Malformed response frame: {reason}")]
    MalformedFrame {
        /// What was wrong with it.
        reason: String,
    },

    /// The slave rejected the request.
    #[error("Slave exception {code:#04x} on function {function_code:#04x}")]
    SlaveException {
        /// Function code of the request.
        function_code: u8,
        /// Exception code reported by the slave.
        code: u8,
    },

    /// The operating system reported a failure on the serial link.
    #[error("Serial I/O error during {operation}: {source}")]
    Io {
        /// Which step of the exchange failed.
        operation: &'static str,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Creates an I/O error for the given exchange step.
    #[inline]
    pub fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }

    /// Returns true if the link itself is unusable.
    ///
    /// A link fault moves the session to the failed state and releases the
    /// port. Everything else is a per-exchange failure.
    pub fn is_link_fault(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if the slave stayed silent or went quiet mid-frame.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::NoResponse { .. } | Self::IncompleteResponse { .. }
        )
    }

    /// Returns the exception code if the slave rejected the request.
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            Self::SlaveException { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the severity of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotConnected => ErrorSeverity::Warning,
            Self::NoResponse { .. } | Self::IncompleteResponse { .. } => ErrorSeverity::Warning,
            Self::ChecksumMismatch { .. } | Self::UnexpectedSlave { .. } => {
                ErrorSeverity::Warning
            }
            Self::MalformedFrame { .. } | Self::SlaveException { .. } => ErrorSeverity::Error,
            Self::Io { .. } => ErrorSeverity::Critical,
        }
    }

    /// Returns the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotConnected | Self::Io { .. } => "link",
            Self::NoResponse { .. } | Self::IncompleteResponse { .. } => "timeout",
            _ => "protocol",
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotConnected => ErrorCode::new(3, 1),
            Self::Io { .. } => ErrorCode::new(3, 2),
            Self::NoResponse { .. } => ErrorCode::new(3, 3),
            Self::IncompleteResponse { .. } => ErrorCode::new(3, 4),
            Self::ChecksumMismatch { .. } => ErrorCode::new(4, 1),
            Self::UnexpectedSlave { .. } => ErrorCode::new(4, 2),
            Self::MalformedFrame { .. } => ErrorCode::new(4, 3),
            Self::SlaveException { code, .. } => ErrorCode::new(5, *code),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::NotConnected => vec!["Connect to the serial port before sending commands"],
            Self::NoResponse { .. } => vec![
                "Check that the drive is powered",
                "Check the RS485 A/B wiring",
                "Check that the slave id matches the drive setting",
                "Check baud rate and parity against the drive setting",
            ],
            Self::IncompleteResponse { .. } => vec![
                "Check the cable for noise or loose connections",
                "Try a longer read timeout",
            ],
            Self::ChecksumMismatch { .. } => vec![
                "Check the cable for electrical noise",
                "Check that the line is terminated",
                "Check baud rate and parity against the drive setting",
            ],
            Self::UnexpectedSlave { .. } => vec![
                "Another station answered; check slave ids on the bus",
            ],
            Self::MalformedFrame { .. } => vec![
                "Check that the device speaks Modbus RTU",
                "Check that only one master drives the bus",
            ],
            Self::SlaveException { code, .. } => match code {
                0x01 => vec!["The drive does not support this function"],
                0x02 => vec!["Check the register map of the drive"],
                0x03 => vec!["Check the allowed value range of the register"],
                0x06 => vec!["The drive is busy; send the command again later"],
                _ => vec!["Consult the drive manual for this exception code"],
            },
            Self::Io { .. } => vec![
                "Check that the adapter is still plugged in",
                "Reconnect to the serial port",
            ],
        }
    }

    /// Returns a user-friendly message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConnected => "Not connected. Connect to a serial port first.".to_string(),
            Self::NoResponse { timeout } => {
                format!("The drive did not answer within {:?}.", timeout)
            }
            Self::IncompleteResponse { .. } => {
                "The drive answer was cut off before it was complete.".to_string()
            }
            Self::ChecksumMismatch { .. } => {
                "The drive answer was corrupted in transit.".to_string()
            }
            Self::UnexpectedSlave { actual, .. } => {
                format!("A different station ({}) answered.", actual)
            }
            Self::MalformedFrame { reason } => format!("Unexpected answer from the drive: {}.", reason),
            Self::SlaveException { code, .. } => format!(
                "The drive rejected the command: {} ({:#04x}).",
                exception_name(*code),
                code
            ),
            Self::Io { .. } => "Lost contact with the serial port.".to_string(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                link_fault = self.is_link_fault(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                link_fault = self.is_link_fault(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
        }
    }
}

impl From<ModbusError> for TransportError {
    fn from(error: ModbusError) -> Self {
        match error {
            ModbusError::ChecksumMismatch { expected, actual } => {
                Self::ChecksumMismatch { expected, actual }
            }
            ModbusError::UnexpectedSlave { expected, actual } => {
                Self::UnexpectedSlave { expected, actual }
            }
            ModbusError::MalformedFrame { reason } => Self::MalformedFrame { reason },
            ModbusError::SlaveException {
                function_code,
                code,
            } => Self::SlaveException {
                function_code,
                code,
            },
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// How urgently an error needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Warning - the next command may well succeed.
    Warning,
    /// Error - the command was refused or garbled.
    Error,
    /// Critical - the link is gone.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code, displayed as `SP-CCNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1=config, 2=connect, 3=link, 4=frame, 5=slave exception).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SP-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_io_is_link_fault() {
        let io = TransportError::io("read", io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(io.is_link_fault());
        assert_eq!(io.severity(), ErrorSeverity::Critical);

        let others = [
            TransportError::NotConnected,
            TransportError::NoResponse {
                timeout: Duration::from_millis(500),
            },
            TransportError::ChecksumMismatch {
                expected: 0x0A56,
                actual: 0x0000,
            },
            TransportError::SlaveException {
                function_code: 0x06,
                code: 0x02,
            },
        ];
        for error in &others {
            assert!(!error.is_link_fault(), "{error} must not be a link fault");
        }
    }

    #[test]
    fn test_modbus_error_conversion() {
        let error: TransportError = ModbusError::SlaveException {
            function_code: 0x06,
            code: 0x03,
        }
        .into();
        assert_eq!(error.exception_code(), Some(0x03));

        let error: TransportError = ModbusError::malformed("too short").into();
        assert!(matches!(error, TransportError::MalformedFrame { ref reason } if reason == "too short"));
    }

    #[test]
    fn test_incomplete_response_display() {
        let error = TransportError::IncompleteResponse {
            expected: 8,
            received: vec![0x01, 0x06, 0x60],
        };
        let text = error.to_string();
        assert!(text.contains("3 of 8"));
        assert!(text.contains("01 06 60"));
        assert!(error.is_timeout());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(TransportError::NotConnected.error_code().to_string(), "SP-0301");
        let exception = TransportError::SlaveException {
            function_code: 0x06,
            code: 0x02,
        };
        assert_eq!(exception.error_code().to_string(), "SP-0502");
        assert_eq!(exception.error_code().as_u16(), 0x0502);
        assert_eq!(
            ConnectError::unavailable("/dev/ttyUSB0", "no such file").error_code().to_string(),
            "SP-0201"
        );
    }

    #[test]
    fn test_exception_names() {
        assert_eq!(exception_name(0x01), "Illegal Function");
        assert_eq!(exception_name(0x02), "Illegal Data Address");
        assert_eq!(exception_name(0x0B), "Gateway Target Device Failed to Respond");
        assert_eq!(exception_name(0x42), "Unknown Exception");
    }

    #[test]
    fn test_user_messages() {
        let exception = TransportError::SlaveException {
            function_code: 0x06,
            code: 0x02,
        };
        assert!(exception.user_message().contains("Illegal Data Address"));

        let connect = ConnectError::invalid_parameters("COM3", "mark parity");
        assert_eq!(connect.port(), "COM3");
        assert!(connect.user_message().contains("mark parity"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Warning);
        assert_eq!(ErrorSeverity::Warning.to_tracing_level(), Level::WARN);
        assert_eq!(ErrorSeverity::Critical.to_string(), "critical");
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Spindle drive commands.
//!
//! The drive exposes two holding registers:
//!
//! | Register | Purpose   | Values                          |
//! |----------|-----------|---------------------------------|
//! | `0x6000` | Control   | `1` = run forward, `2` = reverse |
//! | `0x5000` | Frequency | raw setpoint, `0` = stop         |
//!
//! Stop is a zero frequency setpoint, not a control word. The frequency
//! value is passed through unscaled; its unit depends on the drive.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use crate::client::{Connector, SerialConnector, SessionStats, TransportSession};
use crate::codec::{encode_write_single_register, Ack, CommandFrame, FC_WRITE_SINGLE_REGISTER};
use crate::error::{ConfigError, ConnectError, TransportError, TransportResult};
use crate::types::{ConnectionState, LinkConfig, SlaveId};

/// Control word register.
pub const CONTROL_REGISTER: u16 = 0x6000;

/// Frequency setpoint register.
pub const FREQUENCY_REGISTER: u16 = 0x5000;

/// Control word: run clockwise.
pub const CONTROL_RUN_CW: u16 = 0x0001;

/// Control word: run counter-clockwise.
pub const CONTROL_RUN_CCW: u16 = 0x0002;

// =============================================================================
// SpindleCommand
// =============================================================================

/// A command the spindle drive understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command", content = "value")]
pub enum SpindleCommand {
    /// Run clockwise.
    RotateCw,
    /// Run counter-clockwise.
    RotateCcw,
    /// Set the frequency setpoint.
    SetFrequency(u16),
    /// Stop the spindle (zero frequency).
    Stop,
}

impl SpindleCommand {
    /// Returns the register this command writes.
    pub const fn register(&self) -> u16 {
        match self {
            Self::RotateCw | Self::RotateCcw => CONTROL_REGISTER,
            Self::SetFrequency(_) | Self::Stop => FREQUENCY_REGISTER,
        }
    }

    /// Returns the value this command writes.
    pub const fn value(&self) -> u16 {
        match self {
            Self::RotateCw => CONTROL_RUN_CW,
            Self::RotateCcw => CONTROL_RUN_CCW,
            Self::SetFrequency(value) => *value,
            Self::Stop => 0,
        }
    }

    /// Returns a short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RotateCw => "rotate_cw",
            Self::RotateCcw => "rotate_ccw",
            Self::SetFrequency(_) => "set_frequency",
            Self::Stop => "stop",
        }
    }

    /// Encodes this command as a request frame for `slave_id`.
    pub fn encode(&self, slave_id: SlaveId) -> CommandFrame {
        encode_write_single_register(slave_id, self.register(), self.value())
    }
}

impl fmt::Display for SpindleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RotateCw => f.write_str("rotate clockwise"),
            Self::RotateCcw => f.write_str("rotate counter-clockwise"),
            Self::SetFrequency(value) => write!(f, "set frequency {}", value),
            Self::Stop => f.write_str("stop"),
        }
    }
}

impl FromStr for SpindleCommand {
    type Err = ConfigError;

    /// Parses `cw`, `ccw`, `stop` or `freq <value>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const EXPECTED: &str = "cw, ccw, stop or freq <0-65535>";

        let mut words = s.split(|c: char| c.is_whitespace() || c == '=').filter(|w| !w.is_empty());
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let argument = words.next();
        if words.next().is_some() {
            return Err(ConfigError::invalid_value("command", s, EXPECTED));
        }

        match (command.as_str(), argument) {
            ("cw", None) => Ok(Self::RotateCw),
            ("ccw", None) => Ok(Self::RotateCcw),
            ("stop", None) => Ok(Self::Stop),
            ("freq" | "frequency", Some(value)) => value
                .parse::<u16>()
                .map(Self::SetFrequency)
                .map_err(|_| ConfigError::invalid_value("frequency", value, "0-65535")),
            _ => Err(ConfigError::invalid_value("command", s, EXPECTED)),
        }
    }
}

// =============================================================================
// SpindleControl
// =============================================================================

/// High-level control of a spindle drive.
#[async_trait]
pub trait SpindleControl: Send + Sync {
    /// Opens the link to the drive.
    async fn connect(&self, config: LinkConfig) -> Result<(), ConnectError>;

    /// Sends one command and waits for the drive to acknowledge it.
    async fn execute(&self, command: SpindleCommand) -> TransportResult<Ack>;

    /// Releases the link.
    async fn disconnect(&self);

    /// Returns the link state.
    async fn state(&self) -> ConnectionState;

    /// Starts clockwise rotation.
    async fn rotate_cw(&self) -> TransportResult<Ack> {
        self.execute(SpindleCommand::RotateCw).await
    }

    /// Starts counter-clockwise rotation.
    async fn rotate_ccw(&self) -> TransportResult<Ack> {
        self.execute(SpindleCommand::RotateCcw).await
    }

    /// Sets the frequency setpoint.
    async fn set_frequency(&self, value: u16) -> TransportResult<Ack> {
        self.execute(SpindleCommand::SetFrequency(value)).await
    }

    /// Stops the spindle.
    async fn stop(&self) -> TransportResult<Ack> {
        self.execute(SpindleCommand::Stop).await
    }
}

// =============================================================================
// SpindleController
// =============================================================================

/// Drives a spindle through a [`TransportSession`].
///
/// Callers may share the controller across tasks; the session lock keeps
/// exchanges on the bus strictly one at a time. [`state`](SpindleControl::state)
/// and [`stats`](Self::stats) never wait on that lock.
pub struct SpindleController<C = SerialConnector> {
    session: Mutex<TransportSession<C>>,
    state: watch::Receiver<ConnectionState>,
    stats: Arc<SessionStats>,
}

impl SpindleController<SerialConnector> {
    /// Creates a controller that opens real serial ports.
    pub fn new() -> Self {
        Self::with_connector(SerialConnector::new())
    }
}

impl Default for SpindleController<SerialConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> SpindleController<C> {
    /// Creates a controller that opens links through `connector`.
    pub fn with_connector(connector: C) -> Self {
        let session = TransportSession::with_connector(connector);
        let state = session.subscribe_state();
        let stats = session.stats();
        Self {
            session: Mutex::new(session),
            state,
            stats,
        }
    }

    /// Returns the exchange counters without waiting for the bus.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Returns the configuration of the open link.
    pub async fn config(&self) -> Option<LinkConfig> {
        self.session.lock().await.config().cloned()
    }
}

#[async_trait]
impl<C: Connector> SpindleControl for SpindleController<C> {
    async fn connect(&self, config: LinkConfig) -> Result<(), ConnectError> {
        self.session.lock().await.connect(config).await
    }

    async fn execute(&self, command: SpindleCommand) -> TransportResult<Ack> {
        let mut session = self.session.lock().await;
        let slave_id = session
            .config()
            .map(|config| config.slave_id)
            .ok_or(TransportError::NotConnected)?;

        let frame = command.encode(slave_id);
        tracing::debug!(command = command.name(), frame = %frame, "Sending spindle command");

        let ack = session.send_command(&frame, FC_WRITE_SINGLE_REGISTER).await?;
        tracing::info!(command = %command, slave_id = slave_id.get(), "Spindle command acknowledged");
        Ok(ack)
    }

    async fn disconnect(&self) {
        self.session.lock().await.disconnect().await;
    }

    async fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }
}

impl<C> fmt::Debug for SpindleController<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpindleController")
            .field("state", &*self.state.borrow())
            .field("requests", &self.stats.total_requests())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_registers() {
        assert_eq!(SpindleCommand::RotateCw.register(), 0x6000);
        assert_eq!(SpindleCommand::RotateCw.value(), 1);
        assert_eq!(SpindleCommand::RotateCcw.register(), 0x6000);
        assert_eq!(SpindleCommand::RotateCcw.value(), 2);
        assert_eq!(SpindleCommand::SetFrequency(5000).register(), 0x5000);
        assert_eq!(SpindleCommand::SetFrequency(5000).value(), 5000);
        assert_eq!(SpindleCommand::Stop.register(), 0x5000);
        assert_eq!(SpindleCommand::Stop.value(), 0);
    }

    #[test]
    fn test_stop_is_zero_frequency() {
        let slave = SlaveId::new(3).unwrap();
        assert_eq!(
            SpindleCommand::Stop.encode(slave),
            SpindleCommand::SetFrequency(0).encode(slave)
        );
    }

    #[test]
    fn test_encode_matches_codec() {
        let slave = SlaveId::default();
        assert_eq!(
            SpindleCommand::RotateCw.encode(slave).as_bytes(),
            &[0x01, 0x06, 0x60, 0x00, 0x00, 0x01, 0x56, 0x0A]
        );
        for value in [0u16, 1, 0x1388, 0x7FFF, u16::MAX] {
            assert_eq!(
                SpindleCommand::SetFrequency(value).encode(slave),
                encode_write_single_register(slave, 0x5000, value)
            );
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("cw".parse(), Ok(SpindleCommand::RotateCw));
        assert_eq!("CCW".parse(), Ok(SpindleCommand::RotateCcw));
        assert_eq!("stop".parse(), Ok(SpindleCommand::Stop));
        assert_eq!("freq 5000".parse(), Ok(SpindleCommand::SetFrequency(5000)));
        assert_eq!("frequency=12".parse(), Ok(SpindleCommand::SetFrequency(12)));
        assert!("freq".parse::<SpindleCommand>().is_err());
        assert!("freq 70000".parse::<SpindleCommand>().is_err());
        assert!("cw now".parse::<SpindleCommand>().is_err());
        assert!("".parse::<SpindleCommand>().is_err());
    }

    #[test]
    fn test_command_serde() {
        let json = serde_json::to_string(&SpindleCommand::SetFrequency(10)).unwrap();
        assert_eq!(json, r#"{"command":"set_frequency","value":10}"#);
        let parsed: SpindleCommand = serde_json::from_str(r#"{"command":"stop"}"#).unwrap();
        assert_eq!(parsed, SpindleCommand::Stop);
    }

    #[tokio::test]
    async fn test_execute_requires_connection() {
        let controller = SpindleController::new();
        assert_eq!(controller.state().await, ConnectionState::Disconnected);
        let result = controller.rotate_cw().await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
        assert_eq!(controller.stats().total_requests(), 0);
    }
}

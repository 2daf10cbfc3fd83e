// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Link configuration and session state types.
//!
//! - [`LinkConfig`]: serial parameters and slave address for one session
//! - [`SlaveId`]: a Modbus station address known to be in range
//! - [`Parity`], [`StopBits`]: line settings
//! - [`ConnectionState`]: where a session is in its lifecycle
//!
//! Data bits are fixed at 8 for Modbus RTU and are not configurable.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Data bits per character. Modbus RTU always uses 8.
pub const DATA_BITS: u8 = 8;

/// Baud rate used when none is given.
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

/// Read timeout used when none is given.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Minimum silent interval between frames.
pub const MIN_INTER_FRAME_DELAY: Duration = Duration::from_millis(1);

/// Fixed inter-frame delay above 19200 baud.
const HIGH_SPEED_INTER_FRAME_DELAY: Duration = Duration::from_micros(1_750);

// =============================================================================
// SlaveId
// =============================================================================

/// A Modbus slave address in the unicast range 1..=247.
///
/// Address 0 is broadcast and never answers, so a request/response master
/// cannot use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlaveId(u8);

impl SlaveId {
    /// Lowest unicast address.
    pub const MIN: u8 = 1;
    /// Highest unicast address.
    pub const MAX: u8 = 247;

    /// Validates and wraps a slave address.
    pub fn new(id: u8) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(ConfigError::InvalidSlaveId { slave_id: id })
        }
    }

    /// Returns the raw address byte.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for SlaveId {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for SlaveId {
    type Error = ConfigError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<SlaveId> for u8 {
    fn from(id: SlaveId) -> Self {
        id.0
    }
}

impl fmt::Display for SlaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Parity
// =============================================================================

/// Parity configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// No parity.
    None,
    /// Even parity (default, the Modbus RTU standard).
    #[default]
    Even,
    /// Odd parity.
    Odd,
    /// Parity bit always 1.
    Mark,
    /// Parity bit always 0.
    Space,
}

impl Parity {
    /// Returns the number of parity bits.
    pub const fn bits(&self) -> u8 {
        match self {
            Self::None => 0,
            _ => 1,
        }
    }

    /// Returns the short character representation.
    pub const fn char(&self) -> char {
        match self {
            Self::None => 'N',
            Self::Even => 'E',
            Self::Odd => 'O',
            Self::Mark => 'M',
            Self::Space => 'S',
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

impl FromStr for Parity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "even" | "e" => Ok(Self::Even),
            "odd" | "o" => Ok(Self::Odd),
            "mark" | "m" => Ok(Self::Mark),
            "space" | "s" => Ok(Self::Space),
            _ => Err(ConfigError::invalid_value(
                "parity",
                s,
                "none, even, odd, mark or space",
            )),
        }
    }
}

// =============================================================================
// StopBits
// =============================================================================

/// Stop bits configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    /// 1 stop bit (default).
    #[default]
    One,
    /// 1.5 stop bits.
    OnePointFive,
    /// 2 stop bits.
    Two,
}

impl StopBits {
    /// Returns the stop bit length in bit times.
    pub fn bit_times(&self) -> f64 {
        match self {
            Self::One => 1.0,
            Self::OnePointFive => 1.5,
            Self::Two => 2.0,
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => f.write_str("1"),
            Self::OnePointFive => f.write_str("1.5"),
            Self::Two => f.write_str("2"),
        }
    }
}

impl FromStr for StopBits {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "one" => Ok(Self::One),
            "1.5" | "one_point_five" => Ok(Self::OnePointFive),
            "2" | "two" => Ok(Self::Two),
            _ => Err(ConfigError::invalid_value("stop bits", s, "1, 1.5 or 2")),
        }
    }
}

// =============================================================================
// LinkConfig
// =============================================================================

/// Serial link parameters for one session.
///
/// A config is only ever handed to a session after [`LinkConfig::validate`]
/// (or the builder) accepted it, and the session never changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial port path (e.g. "/dev/ttyUSB0" or "COM3").
    pub port: String,

    /// Baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Parity.
    #[serde(default)]
    pub parity: Parity,

    /// Stop bits.
    #[serde(default)]
    pub stop_bits: StopBits,

    /// Slave address of the drive.
    #[serde(default)]
    pub slave_id: SlaveId,

    /// How long the line may stay quiet while waiting for response bytes.
    #[serde(default = "default_read_timeout")]
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Silent interval kept between consecutive frames.
    /// If not set, calculated from baud rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    #[serde(with = "option_duration")]
    pub inter_frame_delay: Option<Duration>,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

mod option_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => humantime::format_duration(*d).to_string().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        opt.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

impl LinkConfig {
    /// Creates a new builder for LinkConfig.
    pub fn builder() -> LinkConfigBuilder {
        LinkConfigBuilder::default()
    }

    /// Creates a configuration with default line settings (38400 8E1).
    pub fn new(port: impl Into<String>, slave_id: SlaveId) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            slave_id,
            read_timeout: DEFAULT_READ_TIMEOUT,
            inter_frame_delay: None,
        }
    }

    /// Returns the number of bit times per transmitted character.
    pub fn bits_per_char(&self) -> f64 {
        1.0 + f64::from(DATA_BITS) + f64::from(self.parity.bits()) + self.stop_bits.bit_times()
    }

    /// Returns the silent interval to keep between frames.
    ///
    /// This is 3.5 character times, fixed at 1.75 ms above 19200 baud,
    /// and never less than 1 ms.
    pub fn calculated_inter_frame_delay(&self) -> Duration {
        if let Some(delay) = self.inter_frame_delay {
            return delay;
        }
        if self.baud_rate > 19_200 {
            return HIGH_SPEED_INTER_FRAME_DELAY;
        }
        let char_time_us = self.bits_per_char() * 1_000_000.0 / f64::from(self.baud_rate.max(1));
        Duration::from_micros((char_time_us * 3.5).ceil() as u64).max(MIN_INTER_FRAME_DELAY)
    }

    /// Returns the line settings in the usual short form, e.g. "38400 8E1".
    pub fn line_settings(&self) -> String {
        format!(
            "{} {}{}{}",
            self.baud_rate,
            DATA_BITS,
            self.parity.char(),
            self.stop_bits
        )
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "port" });
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::InvalidBaudRate {
                baud_rate: self.baud_rate,
            });
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                timeout: self.read_timeout,
            });
        }
        Ok(())
    }
}

/// Builder for [`LinkConfig`].
#[derive(Debug, Default)]
pub struct LinkConfigBuilder {
    port: Option<String>,
    baud_rate: Option<u32>,
    parity: Option<Parity>,
    stop_bits: Option<StopBits>,
    slave_id: Option<u8>,
    read_timeout: Option<Duration>,
    inter_frame_delay: Option<Duration>,
}

impl LinkConfigBuilder {
    /// Sets the serial port.
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Sets the baud rate.
    pub fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = Some(rate);
        self
    }

    /// Sets the parity.
    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = Some(parity);
        self
    }

    /// Sets the stop bits.
    pub fn stop_bits(mut self, bits: StopBits) -> Self {
        self.stop_bits = Some(bits);
        self
    }

    /// Sets the slave address. Checked in [`build`](Self::build).
    pub fn slave_id(mut self, id: u8) -> Self {
        self.slave_id = Some(id);
        self
    }

    /// Sets the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets the inter-frame delay.
    pub fn inter_frame_delay(mut self, delay: Duration) -> Self {
        self.inter_frame_delay = Some(delay);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<LinkConfig, ConfigError> {
        let slave_id = match self.slave_id {
            Some(id) => SlaveId::new(id)?,
            None => SlaveId::default(),
        };
        let config = LinkConfig {
            port: self.port.unwrap_or_default(),
            baud_rate: self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
            parity: self.parity.unwrap_or_default(),
            stop_bits: self.stop_bits.unwrap_or_default(),
            slave_id,
            read_timeout: self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
            inter_frame_delay: self.inter_frame_delay,
        };
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// ConnectionState
// =============================================================================

/// Lifecycle state of a transport session.
///
/// ```text
/// Disconnected ──connect──> Connecting ──ok──> Connected
///      ^                        │                 │
///      │                       err           I/O fault
///      │                        v                 v
///      └───────disconnect────── Failed(reason) <──┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No link is open.
    #[default]
    Disconnected,
    /// A link is being opened.
    Connecting,
    /// A link is open and commands may be sent.
    Connected,
    /// Opening the link failed, or the link broke. The port is released.
    Failed(String),
}

impl ConnectionState {
    /// Returns true if commands may be sent.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if the session failed.
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if a connection attempt is in progress.
    #[inline]
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    /// Returns the failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Returns true if a session may move from this state to `next`.
    ///
    /// `Failed` is only entered from `Connecting` or `Connected`.
    pub fn can_transition_to(&self, next: &ConnectionState) -> bool {
        match (self, next) {
            (_, Self::Disconnected) => true,
            (Self::Connecting, Self::Connecting) => false,
            (_, Self::Connecting) => true,
            (Self::Connecting, Self::Connected | Self::Failed(_)) => true,
            (Self::Connected, Self::Failed(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

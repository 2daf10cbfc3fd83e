// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # spindle-modbus
//!
//! Modbus RTU master for driving a spindle frequency inverter over RS485.
//!
//! This crate provides:
//!
//! - **Frame codec**: CRC-16/Modbus, write-single-register encoding and
//!   response classification, as pure functions
//! - **Transport session**: one serial link with a connection state machine,
//!   bounded response timeouts and the RTU inter-frame gap
//! - **Spindle commands**: rotate clockwise, rotate counter-clockwise,
//!   set frequency and stop, mapped onto the drive's registers
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐  SpindleCommand  ┌──────────────────┐
//! │ SpindleControl │ ───────────────> │ codec::encode_*  │
//! └───────┬────────┘                  └──────────────────┘
//!         │ CommandFrame
//!         ▼
//! ┌──────────────────┐   bytes    ┌────────────────┐
//! │ TransportSession │ ─────────> │   SerialLink   │ ──> RS485 bus
//! │  (state machine) │ <───────── │ (tokio-serial) │
//! └──────────────────┘            └────────────────┘
//!        │ response bytes
//!        ▼
//!   codec::decode_response ──> Ack | TransportError
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spindle_modbus::{LinkConfig, SpindleControl, SpindleController};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LinkConfig::builder()
//!     .port("/dev/ttyUSB0")
//!     .baud_rate(38_400)
//!     .slave_id(1)
//!     .build()?;
//!
//! let spindle = SpindleController::new();
//! spindle.connect(config).await?;
//! spindle.set_frequency(5000).await?;
//! spindle.rotate_cw().await?;
//! spindle.stop().await?;
//! spindle.disconnect().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod client;
pub mod codec;
pub mod error;
pub mod spindle;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{
    available_ports, Connector, PortInfo, SerialConnector, SerialLink, SessionStats,
    TransportSession,
};
pub use codec::{
    crc16_modbus, decode_response, encode_write_single_register, format_hex, Ack, CommandFrame,
    EXCEPTION_FLAG, FC_WRITE_SINGLE_REGISTER,
};
pub use error::{
    ConfigError, ConnectError, ErrorCode, ErrorSeverity, ModbusError, ModbusResult,
    TransportError, TransportResult,
};
pub use spindle::{
    SpindleCommand, SpindleControl, SpindleController, CONTROL_REGISTER, FREQUENCY_REGISTER,
};
pub use types::{ConnectionState, LinkConfig, LinkConfigBuilder, Parity, SlaveId, StopBits};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

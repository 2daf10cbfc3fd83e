// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # spindle-bin
//!
//! Command-line controller for a spindle drive on a Modbus RTU bus.
//!
//! This crate provides:
//!
//! - CLI argument parsing with clap
//! - Link profile loading (YAML, TOML or JSON) with environment overrides
//! - Logging initialization
//! - One-shot commands and an interactive shell
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         main.rs                             │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │    cli.rs   │
//!                    └──────┬──────┘
//!                           │
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │ commands │ │  config  │ │ logging  │
//!        └────┬─────┘ └──────────┘ └──────────┘
//!             │
//!      ┌──────▼────────┐
//!      │ spindle-modbus │
//!      └───────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start clockwise on /dev/ttyUSB0, slave 1, 38400 8E1
//! spindle -p /dev/ttyUSB0 cw
//!
//! # Set the frequency setpoint
//! spindle -p /dev/ttyUSB0 freq 5000
//!
//! # Use a saved link profile
//! spindle -c spindle.yaml stop
//!
//! # Interactive control
//! spindle -p COM3 shell
//!
//! # Show the bytes a command puts on the wire
//! spindle frame freq 5000
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands, LogFormat, OutputFormat};
pub use config::{LinkProfile, ProfileFormat, ProfileLoader};
pub use error::{BinError, BinResult};

/// Binary version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

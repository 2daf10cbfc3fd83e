// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `cw`, `ccw`, `freq`, `stop`: send one command and exit
//! - `shell`: interactive control (default)
//! - `ports`: list serial ports
//! - `frame`: print the request frame for a command without sending it
//! - `version`: show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use spindle_modbus::{Parity, StopBits};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// spindle - control a spindle drive over Modbus RTU
///
/// Sends run, reverse, frequency and stop commands to a frequency
/// inverter on an RS485 bus.
#[derive(Parser, Debug)]
#[command(
    name = "spindle",
    author = "Sylvex <contact@sylvex.io>",
    version = spindle_modbus::VERSION,
    about = "Control a spindle drive over Modbus RTU",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Link profile file (YAML, TOML or JSON)
    #[arg(short, long, env = "SPINDLE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Serial link settings
    #[command(flatten)]
    pub link: LinkArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "warn",
        env = "SPINDLE_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "SPINDLE_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Serial link settings. Anything given here overrides the profile.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct LinkArgs {
    /// Serial port (e.g. /dev/ttyUSB0 or COM3)
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Baud rate [default: 38400]
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// Parity: none, even, odd, mark or space [default: even]
    #[arg(long, global = true)]
    pub parity: Option<Parity>,

    /// Stop bits: 1, 1.5 or 2 [default: 1]
    #[arg(long, global = true)]
    pub stop_bits: Option<StopBits>,

    /// Slave address of the drive, 1-247 [default: 1]
    #[arg(short, long, global = true)]
    pub slave: Option<u8>,

    /// Response timeout, e.g. 500ms or 1s [default: 500ms]
    #[arg(short, long, global = true)]
    pub timeout: Option<humantime::Duration>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start the spindle clockwise
    Cw,

    /// Start the spindle counter-clockwise
    Ccw,

    /// Set the frequency setpoint
    ///
    /// The value is written to the drive unscaled; its unit depends on the
    /// drive (often 0.01 Hz).
    Freq(FreqArgs),

    /// Stop the spindle
    Stop,

    /// Interactive control
    ///
    /// This is the default command when no subcommand is specified.
    Shell,

    /// List serial ports on this machine
    Ports(PortsArgs),

    /// Print the request frame for a command without sending it
    Frame(FrameArgs),

    /// Show version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `freq` command.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct FreqArgs {
    /// Frequency setpoint (0-65535)
    pub value: u16,
}

/// Arguments for the `ports` command.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct PortsArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `frame` command.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct FrameArgs {
    /// Command: cw, ccw, stop or freq <value>
    #[arg(required = true, num_args = 1..=2)]
    pub command: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Shell` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Shell)
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["spindle"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.effective_command(), Commands::Shell);
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(Cli::parse_from(["spindle", "cw"]).command, Some(Commands::Cw));
        assert_eq!(Cli::parse_from(["spindle", "ccw"]).command, Some(Commands::Ccw));
        assert_eq!(Cli::parse_from(["spindle", "stop"]).command, Some(Commands::Stop));
    }

    #[test]
    fn test_freq_command() {
        let cli = Cli::parse_from(["spindle", "freq", "5000"]);
        assert_eq!(cli.command, Some(Commands::Freq(FreqArgs { value: 5000 })));
        assert!(Cli::try_parse_from(["spindle", "freq", "70000"]).is_err());
    }

    #[test]
    fn test_link_args() {
        let cli = Cli::parse_from([
            "spindle", "-p", "/dev/ttyUSB0", "-b", "9600", "--parity", "none", "--stop-bits",
            "2", "-s", "7", "-t", "1s", "cw",
        ]);
        assert_eq!(cli.link.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(cli.link.baud, Some(9600));
        assert_eq!(cli.link.parity, Some(Parity::None));
        assert_eq!(cli.link.stop_bits, Some(StopBits::Two));
        assert_eq!(cli.link.slave, Some(7));
        assert_eq!(cli.link.timeout.map(Duration::from), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_global_link_args_after_subcommand() {
        let cli = Cli::parse_from(["spindle", "stop", "--port", "COM3"]);
        assert_eq!(cli.link.port.as_deref(), Some("COM3"));
    }

    #[test]
    fn test_invalid_parity_rejected() {
        assert!(Cli::try_parse_from(["spindle", "--parity", "sometimes", "cw"]).is_err());
    }

    #[test]
    fn test_frame_command() {
        let cli = Cli::parse_from(["spindle", "frame", "freq", "5000", "-f", "json"]);
        if let Some(Commands::Frame(args)) = cli.command {
            assert_eq!(args.command, vec!["freq", "5000"]);
            assert_eq!(args.format, OutputFormat::Json);
        } else {
            panic!("Expected Frame command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["spindle", "-c", "/etc/spindle.yaml", "stop"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/spindle.yaml")));
    }

    #[test]
    fn test_quiet_mode() {
        let cli = Cli::parse_from(["spindle", "-q"]);
        assert_eq!(cli.effective_log_level(), "error");
    }

    #[test]
    fn test_verbose_mode() {
        let cli = Cli::parse_from(["spindle", "-v"]);
        assert_eq!(cli.effective_log_level(), "debug");
    }
}

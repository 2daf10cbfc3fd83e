// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `frame` command.

use serde::Serialize;
use spindle_modbus::{SlaveId, SpindleCommand};

use crate::cli::{Cli, FrameArgs, OutputFormat};
use crate::config::resolve_slave_id;
use crate::error::BinResult;

/// A request frame, broken down for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    /// Command name.
    pub command: &'static str,
    /// Addressed slave.
    pub slave_id: u8,
    /// Function code.
    pub function_code: u8,
    /// Target register, as hex.
    pub register: String,
    /// Value written.
    pub value: u16,
    /// CRC carried by the frame, as hex.
    pub crc: String,
    /// The whole frame, as space separated hex.
    pub bytes: String,
}

impl FrameReport {
    /// Encodes `command` for `slave_id` and describes the result.
    pub fn new(command: SpindleCommand, slave_id: SlaveId) -> Self {
        let frame = command.encode(slave_id);
        Self {
            command: command.name(),
            slave_id: frame.slave_id(),
            function_code: frame.function_code(),
            register: format!("0x{:04X}", frame.register_address()),
            value: frame.value(),
            crc: format!("0x{:04X}", frame.crc()),
            bytes: frame.to_string(),
        }
    }
}

/// Executes the `frame` command: prints the request without sending it.
pub fn frame(cli: &Cli, args: FrameArgs) -> BinResult<()> {
    let command: SpindleCommand = args.command.join(" ").parse()?;
    let slave_id = resolve_slave_id(cli.config.as_deref(), &cli.link)?;
    let report = FrameReport::new(command, slave_id);

    match args.format {
        OutputFormat::Text => {
            println!("{}", report.bytes);
            if !cli.quiet {
                println!();
                println!("  Command:  {}", command);
                println!("  Slave:    {}", report.slave_id);
                println!("  Function: 0x{:02X}", report.function_code);
                println!("  Register: {}", report.register);
                println!("  Value:    {}", report.value);
                println!("  CRC:      {}", report.crc);
            }
        }
        OutputFormat::Json => {
            println!("{}", super::to_json(&report, "frame report")?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_report() {
        let report = FrameReport::new(SpindleCommand::SetFrequency(5000), SlaveId::default());
        assert_eq!(report.command, "set_frequency");
        assert_eq!(report.register, "0x5000");
        assert_eq!(report.value, 5000);
        assert_eq!(report.crc, "0x9C95");
        assert_eq!(report.bytes, "01 06 50 00 13 88 95 9C");
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `ports` command.

use spindle_modbus::available_ports;

use crate::cli::{Cli, OutputFormat, PortsArgs};
use crate::error::{BinError, BinResult};

/// Lists the serial ports present on this machine.
pub fn ports(cli: &Cli, args: PortsArgs) -> BinResult<()> {
    let ports = available_ports()
        .map_err(|e| BinError::io(format!("cannot enumerate serial ports: {}", e)))?;

    match args.format {
        OutputFormat::Text => {
            if ports.is_empty() {
                if !cli.quiet {
                    println!("No serial ports found.");
                }
                return Ok(());
            }
            for port in &ports {
                match &port.description {
                    Some(description) => {
                        println!("{:<20} {:<10} {}", port.name, port.kind, description)
                    }
                    None => println!("{:<20} {}", port.name, port.kind),
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", super::to_json(&ports, "port list")?);
        }
    }

    Ok(())
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the one-shot `cw`, `ccw`, `freq` and `stop` commands.

use spindle_modbus::{Ack, LinkConfig, SpindleCommand, SpindleControl, SpindleController};

use crate::cli::Cli;
use crate::config::resolve_link_config;
use crate::error::BinResult;

/// Connects, sends `command`, and disconnects.
pub async fn send(cli: &Cli, command: SpindleCommand) -> BinResult<()> {
    let config = resolve_link_config(cli.config.as_deref(), &cli.link)?;
    let port = config.port.clone();
    let spindle = SpindleController::new();

    let ack = execute_once(&spindle, config, command).await?;

    if !cli.quiet {
        println!("OK: {} on {} ({})", command, port, ack);
    }
    Ok(())
}

/// Runs a single command on a fresh link.
///
/// The link is released whether or not the drive acknowledged.
pub async fn execute_once<S>(spindle: &S, config: LinkConfig, command: SpindleCommand) -> BinResult<Ack>
where
    S: SpindleControl + ?Sized,
{
    spindle.connect(config).await?;
    let result = spindle.execute(command).await;
    spindle.disconnect().await;
    Ok(result?)
}

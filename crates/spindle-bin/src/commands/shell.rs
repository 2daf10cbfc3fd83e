// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Interactive spindle shell.
//!
//! Reads one command per line and reports the outcome of each exchange.
//! The link stays open between commands; a link fault drops it and the
//! operator can `connect` again.

use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use spindle_modbus::{LinkConfig, SpindleCommand, SpindleControl, SpindleController};

use crate::cli::Cli;
use crate::config::resolve_link_config;
use crate::error::{BinError, BinResult};

const PROMPT: &str = "spindle> ";

const HELP: &str = "\
Commands:
  cw               rotate clockwise
  ccw              rotate counter-clockwise
  freq <value>     write the frequency setpoint
  stop             write a zero frequency setpoint
  status           show the link state
  connect          (re)open the link
  disconnect       close the link
  help             show this text
  quit | exit      leave the shell
";

/// A parsed shell line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    /// Send a command to the drive.
    Spindle(SpindleCommand),
    /// Open (or reopen) the link.
    Connect,
    /// Close the link.
    Disconnect,
    /// Print the link state.
    Status,
    /// Print usage.
    Help,
    /// Leave the shell.
    Quit,
    /// Blank line.
    Empty,
}

/// Parses one line of shell input.
pub fn parse_shell_line(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(ShellCommand::Empty);
    }

    match line.to_ascii_lowercase().as_str() {
        "connect" | "open" => Ok(ShellCommand::Connect),
        "disconnect" | "close" => Ok(ShellCommand::Disconnect),
        "status" | "state" => Ok(ShellCommand::Status),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
        _ => SpindleCommand::from_str(line)
            .map(ShellCommand::Spindle)
            .map_err(|e| e.to_string()),
    }
}

/// Executes the `shell` command on stdin/stdout.
pub async fn shell(cli: &Cli) -> BinResult<()> {
    let config = resolve_link_config(cli.config.as_deref(), &cli.link)?;
    let spindle = SpindleController::new();
    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();

    run_shell(&spindle, config, input, &mut output).await
}

/// Runs the shell loop until `quit` or end of input.
///
/// A failed initial connect is reported but does not end the session.
pub async fn run_shell<S, R, W>(
    spindle: &S,
    config: LinkConfig,
    input: R,
    output: &mut W,
) -> BinResult<()>
where
    S: SpindleControl + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    connect(spindle, &config, output).await?;

    loop {
        write_out(output, PROMPT).await?;
        let Some(line) = lines.next_line().await? else {
            write_out(output, "\n").await?;
            break;
        };
        debug!(line = %line, "Shell input");

        let command = match parse_shell_line(&line) {
            Ok(command) => command,
            Err(message) => {
                write_out(output, &format!("error: {}\n", message)).await?;
                continue;
            }
        };

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Help => write_out(output, HELP).await?,
            ShellCommand::Quit => break,
            ShellCommand::Status => {
                let state = spindle.state().await;
                write_out(output, &format!("state: {}\n", state)).await?;
            }
            ShellCommand::Connect => connect(spindle, &config, output).await?,
            ShellCommand::Disconnect => {
                spindle.disconnect().await;
                write_out(output, "disconnected\n").await?;
            }
            ShellCommand::Spindle(command) => match spindle.execute(command).await {
                Ok(ack) => write_out(output, &format!("ok: {} ({})\n", command, ack)).await?,
                Err(e) => {
                    let text = format!("error [{}]: {}\n", e.error_code(), e.user_message());
                    write_out(output, &text).await?;
                    if e.is_link_fault() {
                        write_out(output, "link dropped; use `connect` to reopen\n").await?;
                    }
                }
            },
        }
    }

    spindle.disconnect().await;
    Ok(())
}

async fn connect<S, W>(spindle: &S, config: &LinkConfig, output: &mut W) -> BinResult<()>
where
    S: SpindleControl + ?Sized,
    W: AsyncWrite + Unpin,
{
    let text = match spindle.connect(config.clone()).await {
        Ok(()) => format!(
            "connected to {} ({}), slave {}\n",
            config.port,
            config.line_settings(),
            config.slave_id
        ),
        Err(e) => format!("error [{}]: {}\n", e.error_code(), e.user_message()),
    };
    write_out(output, &text).await
}

async fn write_out<W>(output: &mut W, text: &str) -> BinResult<()>
where
    W: AsyncWrite + Unpin,
{
    output
        .write_all(text.as_bytes())
        .await
        .map_err(|e| BinError::io(format!("cannot write to output: {}", e)))?;
    output
        .flush()
        .await
        .map_err(|e| BinError::io(format!("cannot write to output: {}", e)))
}

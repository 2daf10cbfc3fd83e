// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `cw`, `ccw`, `freq`, `stop`: send one command and exit
//! - `shell`: interactive control
//! - `ports`: list serial ports
//! - `frame`: print a request frame
//! - `version`: show version information

mod control;
mod frame;
mod ports;
mod shell;
mod version;

pub use control::{execute_once, send};
pub use frame::{frame, FrameReport};
pub use ports::ports;
pub use shell::{parse_shell_line, run_shell, shell, ShellCommand};
pub use version::version;

use anyhow::Context;
use serde::Serialize;
use spindle_modbus::SpindleCommand;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Cw => control::send(&cli, SpindleCommand::RotateCw).await,
        Commands::Ccw => control::send(&cli, SpindleCommand::RotateCcw).await,
        Commands::Freq(args) => control::send(&cli, SpindleCommand::SetFrequency(args.value)).await,
        Commands::Stop => control::send(&cli, SpindleCommand::Stop).await,
        Commands::Shell => shell::shell(&cli).await,
        Commands::Ports(args) => ports::ports(&cli, args),
        Commands::Frame(args) => frame::frame(&cli, args),
        Commands::Version => version::version(&cli),
    }
}

/// Renders `value` as pretty JSON for `--format json` output.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("cannot encode {} as JSON", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BinError;
    use spindle_modbus::SlaveId;
    use std::collections::BTreeMap;

    #[test]
    fn test_to_json() {
        let report = FrameReport::new(SpindleCommand::Stop, SlaveId::default());
        let json = to_json(&report, "frame report").unwrap();
        assert!(json.contains("\"crc\": \"0xCA98\""), "{}", json);
    }

    #[test]
    fn test_to_json_failure_is_runtime_error() {
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], 1u8);

        let err = BinError::from(to_json(&bad, "port list").unwrap_err());
        assert_eq!(err.exit_code(), 6);
        assert!(
            err.to_string()
                .starts_with("Runtime error: cannot encode port list as JSON: "),
            "{}",
            err
        );
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! spindle - Modbus RTU spindle drive controller
//!
//! Main binary entry point.

use spindle_bin::cli::Cli;
use spindle_bin::commands;
use spindle_bin::error::report_error_and_exit;
use spindle_bin::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.effective_log_level(), cli.log_format);

    if let Err(error) = commands::execute(cli).await {
        report_error_and_exit(error);
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! Logs go to stderr so command output on stdout stays clean for scripts.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormat;

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the logging subsystem.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// # Example
///
/// ```ignore
/// use spindle_bin::logging::init_logging;
/// use spindle_bin::cli::LogFormat;
///
/// init_logging("info", LogFormat::Text);
/// ```
pub fn init_logging(level: &str, format: LogFormat) {
    let env_filter = build_filter(level);

    match format {
        LogFormat::Text => init_text_logging(env_filter),
        LogFormat::Json => init_json_logging(env_filter),
        LogFormat::Compact => init_compact_logging(env_filter),
    }
}

/// Builds the filter from `RUST_LOG` or the given level.
fn build_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).as_str().to_lowercase()));

    for directive in ["mio=warn", "mio_serial=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Initializes text-based logging (default).
fn init_text_logging(filter: EnvFilter) {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stderr());

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(is_terminal),
    );

    subscriber.init();
}

/// Initializes JSON logging (for log aggregation).
fn init_json_logging(filter: EnvFilter) {
    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true)
            .with_span_list(true),
    );

    subscriber.init();
}

/// Initializes compact logging (minimal output).
fn init_compact_logging(filter: EnvFilter) {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stderr());

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(is_terminal),
    );

    subscriber.init();
}

// =============================================================================
// Log Level Parsing
// =============================================================================

/// Parses a log level string into a `Level`.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

// =============================================================================
// Tests
// =============================================================================

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! - `test_profile_*`: profile files in each format
//! - `test_resolve_*`: precedence of profile, environment and flags

use std::fs;
use std::time::Duration;

use spindle_bin::cli::LinkArgs;
use spindle_bin::commands::FrameReport;
use spindle_bin::config::{resolve_link_config, resolve_slave_id};
use spindle_bin::{BinError, ProfileFormat, ProfileLoader};
use spindle_modbus::{Parity, SpindleCommand, StopBits};

use spindle_tests::common::temp_test_dir;

fn loader() -> ProfileLoader {
    ProfileLoader::new().with_env_vars(false)
}

// =============================================================================
// Profile Tests
// =============================================================================

#[test]
fn test_profile_formats_agree() {
    let yaml = r#"
port: /dev/ttyUSB0
baud_rate: 19200
parity: odd
stop_bits: 2
slave_id: 3
read_timeout: 250ms
"#;
    let toml = r#"
port = "/dev/ttyUSB0"
baud_rate = 19200
parity = "odd"
stop_bits = "2"
slave_id = 3
read_timeout = "250ms"
"#;
    let json = r#"{
  "port": "/dev/ttyUSB0",
  "baud_rate": 19200,
  "parity": "odd",
  "stop_bits": "2",
  "slave_id": 3,
  "read_timeout": "250ms"
}"#;

    let configs: Vec<_> = [
        (yaml, ProfileFormat::Yaml),
        (toml, ProfileFormat::Toml),
        (json, ProfileFormat::Json),
    ]
    .into_iter()
    .map(|(content, format)| {
        loader()
            .parse_str(content, format)
            .unwrap()
            .to_link_config()
            .unwrap()
    })
    .collect();

    for config in &configs {
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 19_200);
        assert_eq!(config.parity, Parity::Odd);
        assert_eq!(config.stop_bits, StopBits::Two);
        assert_eq!(config.slave_id.get(), 3);
        assert_eq!(config.read_timeout, Duration::from_millis(250));
    }
}

#[test]
fn test_profile_defaults_to_38400_8e1() {
    let config = loader()
        .parse_str("port: COM3\n", ProfileFormat::Yaml)
        .unwrap()
        .to_link_config()
        .unwrap();

    assert_eq!(config.line_settings(), "38400 8E1");
    assert_eq!(config.slave_id.get(), 1);
}

#[test]
fn test_profile_rejects_bad_slave() {
    let error = loader()
        .parse_str("port: COM3\nslave_id: 0\n", ProfileFormat::Yaml)
        .unwrap()
        .to_link_config()
        .unwrap_err();

    assert_eq!(error.exit_code(), 2);
}

#[test]
fn test_profile_file_by_extension() {
    let dir = temp_test_dir("spindle-profile");
    let path = dir.path().join("bench.toml");
    fs::write(&path, "port = \"sim0\"\nbaud_rate = 9600\nparity = \"none\"\n").unwrap();

    let config = loader().load(Some(&path)).unwrap().to_link_config().unwrap();

    assert_eq!(config.port, "sim0");
    assert_eq!(config.line_settings(), "9600 8N1");
}

#[test]
fn test_profile_unknown_extension() {
    let dir = temp_test_dir("spindle-profile");
    let path = dir.path().join("bench.ini");
    fs::write(&path, "port=sim0").unwrap();

    assert!(matches!(
        loader().load(Some(&path)),
        Err(BinError::Configuration(_))
    ));
}

// =============================================================================
// Resolve Tests
// =============================================================================

#[test]
fn test_resolve_flags_override_profile() {
    let dir = temp_test_dir("spindle-resolve");
    let path = dir.path().join("spindle.yaml");
    fs::write(&path, "port: sim0\nbaud_rate: 9600\nslave_id: 2\n").unwrap();

    let args = LinkArgs {
        port: Some("sim1".to_string()),
        slave: Some(7),
        stop_bits: Some(StopBits::Two),
        ..Default::default()
    };
    let config = resolve_link_config(Some(&path), &args).unwrap();

    assert_eq!(config.port, "sim1");
    assert_eq!(config.baud_rate, 9_600);
    assert_eq!(config.stop_bits, StopBits::Two);
    assert_eq!(config.slave_id.get(), 7);
}

#[test]
fn test_resolve_flags_only() {
    let args = LinkArgs {
        port: Some("sim0".to_string()),
        timeout: Some(Duration::from_millis(100).into()),
        ..Default::default()
    };
    let config = resolve_link_config(None, &args).unwrap();

    assert_eq!(config.port, "sim0");
    assert_eq!(config.read_timeout, Duration::from_millis(100));
}

#[test]
fn test_resolve_slave_without_port() {
    let dir = temp_test_dir("spindle-resolve");
    let path = dir.path().join("drive.yaml");
    fs::write(&path, "slave_id: 5\n").unwrap();

    let slave = resolve_slave_id(Some(&path), &LinkArgs::default()).unwrap();
    assert_eq!(slave.get(), 5);
    let report = FrameReport::new(SpindleCommand::RotateCw, slave);
    assert_eq!(report.bytes, "05 06 60 00 00 01 57 8E");

    let args = LinkArgs {
        slave: Some(7),
        ..Default::default()
    };
    assert_eq!(resolve_slave_id(Some(&path), &args).unwrap().get(), 7);
    assert_eq!(resolve_slave_id(None, &LinkArgs::default()).unwrap().get(), 1);

    let args = LinkArgs {
        slave: Some(0),
        ..Default::default()
    };
    assert_eq!(resolve_slave_id(None, &args).unwrap_err().exit_code(), 2);
}

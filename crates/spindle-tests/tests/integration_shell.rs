// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # CLI Integration Tests
//!
//! Drives the interactive shell and the one-shot command path against the
//! simulated drive.

use spindle_bin::commands::{execute_once, run_shell};
use spindle_bin::BinError;
use spindle_modbus::{SpindleCommand, SpindleControl, SpindleController};

use spindle_tests::prelude::*;

async fn run_script(
    connector: &MockConnector,
    script: &str,
) -> (String, SpindleController<MockConnector>) {
    init_test_logging();
    let spindle = SpindleController::with_connector(connector.clone());
    let mut output = Vec::new();

    run_shell(&spindle, LinkFixtures::sim0(), script.as_bytes(), &mut output)
        .await
        .unwrap();

    (String::from_utf8(output).unwrap(), spindle)
}

#[tokio::test]
async fn test_shell_session() {
    let connector = MockConnector::new();
    let (output, spindle) =
        run_script(&connector, "cw\nfreq 5000\n\nstatus\nstop\nquit\ncw\n").await;

    assert!(output.contains("connected to sim0 (9600 8N1), slave 1"), "{}", output);
    assert!(output.contains("ok: rotate clockwise"), "{}", output);
    assert!(output.contains("ok: set frequency 5000"), "{}", output);
    assert!(output.contains("state: connected"), "{}", output);
    assert!(output.contains("ok: stop"), "{}", output);

    // Nothing after `quit` is executed.
    assert_frames_eq(
        &connector.requests(),
        &[
            &FrameFixtures::ROTATE_CW,
            &FrameFixtures::FREQUENCY_5000,
            &FrameFixtures::STOP,
        ],
    );
    assert!(!spindle.state().await.is_connected());
}

#[tokio::test]
async fn test_shell_reports_errors_and_continues() {
    let connector = MockConnector::new();
    connector.push_reply(DeviceReply::Exception(0x02));

    let (output, _spindle) = run_script(&connector, "spin\nfreq 5000\nccw\n").await;

    assert!(output.contains("error: "), "{}", output);
    assert!(output.contains("error [SP-0502]"), "{}", output);
    assert!(output.contains("ok: rotate counter-clockwise"), "{}", output);
    assert_eq!(connector.request_count(), 2);
}

#[tokio::test]
async fn test_shell_reconnects_after_link_fault() {
    let connector = MockConnector::new();
    connector.push_reply(DeviceReply::Disconnect);

    let (output, _spindle) = run_script(&connector, "cw\ncw\nconnect\ncw\n").await;

    assert!(output.contains("link dropped"), "{}", output);
    assert_eq!(output.matches("connected to sim0").count(), 2, "{}", output);
    assert!(output.contains("ok: rotate clockwise"), "{}", output);
    assert_eq!(connector.open_count(), 2);
}

#[tokio::test]
async fn test_shell_survives_failed_connect() {
    let connector = MockConnector::unavailable();

    let (output, _spindle) = run_script(&connector, "status\nstop\n").await;

    assert!(output.contains("state: failed"), "{}", output);
    assert!(output.contains("error [SP-0301]"), "{}", output);
    assert_eq!(connector.request_count(), 0);
}

#[tokio::test]
async fn test_execute_once_releases_link() {
    init_test_logging();
    let connector = MockConnector::new();
    let spindle = SpindleController::with_connector(connector.clone());

    let ack = execute_once(&spindle, LinkFixtures::sim0(), SpindleCommand::SetFrequency(5000))
        .await
        .unwrap();

    assert_eq!(ack.value, 5000);
    assert!(connector.wait_released(0, std::time::Duration::from_secs(1)).await);
    assert!(!spindle.state().await.is_connected());
}

#[tokio::test]
async fn test_execute_once_maps_errors() {
    init_test_logging();
    let connector = MockConnector::new();
    connector.push_reply(DeviceReply::Exception(0x04));
    let spindle = SpindleController::with_connector(connector.clone());

    let error = execute_once(&spindle, LinkFixtures::sim0(), SpindleCommand::RotateCw)
        .await
        .unwrap_err();
    assert!(matches!(error, BinError::Transport(_)));
    assert_eq!(error.exit_code(), 4);
    assert!(connector.wait_released(0, std::time::Duration::from_secs(1)).await);

    let unavailable = SpindleController::with_connector(MockConnector::unavailable());
    let error = execute_once(&unavailable, LinkFixtures::sim0(), SpindleCommand::Stop)
        .await
        .unwrap_err();
    assert_eq!(error.exit_code(), 3);
}

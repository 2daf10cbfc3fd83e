// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Spindle Controller Integration Tests
//!
//! End-to-end tests from [`SpindleControl`] down to the bytes on the wire.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use spindle_modbus::{
    ConnectionState, SpindleCommand, SpindleControl, SpindleController, TransportError,
};

use spindle_tests::prelude::*;

fn controller() -> (SpindleController<MockConnector>, MockConnector) {
    init_test_logging();
    let connector = MockConnector::new();
    (SpindleController::with_connector(connector.clone()), connector)
}

#[tokio::test]
async fn test_rotate_cw_on_sim0() {
    let (spindle, connector) = controller();
    spindle.connect(LinkFixtures::sim0()).await.unwrap();

    let ack = spindle.rotate_cw().await.unwrap();

    assert_eq!(ack.slave_id, 1);
    assert_eq!(ack.register_address, 0x6000);
    assert_eq!(ack.value, 1);
    assert_frames_eq(&connector.requests(), &[&FrameFixtures::ROTATE_CW]);
}

#[tokio::test]
async fn test_machining_sequence() {
    let (spindle, connector) = controller();
    spindle.connect(LinkFixtures::sim0()).await.unwrap();

    spindle.set_frequency(5000).await.unwrap();
    spindle.rotate_cw().await.unwrap();
    spindle.stop().await.unwrap();
    spindle.rotate_ccw().await.unwrap();
    spindle.disconnect().await;

    assert_frames_eq(
        &connector.requests(),
        &[
            &FrameFixtures::FREQUENCY_5000,
            &FrameFixtures::ROTATE_CW,
            &FrameFixtures::STOP,
            &FrameFixtures::ROTATE_CCW,
        ],
    );
    spindle.stats().assert_requests(4, 4, 0);
    assert_eq!(spindle.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_commands_use_configured_slave() {
    let (spindle, connector) = controller();
    spindle.connect(LinkFixtures::sim0_slave(5)).await.unwrap();

    spindle.rotate_cw().await.unwrap();

    assert_frames_eq(&connector.requests(), &[&FrameFixtures::ROTATE_CW_SLAVE_5]);
}

#[tokio::test]
async fn test_execute_before_connect() {
    let (spindle, connector) = controller();

    let result = spindle.execute(SpindleCommand::Stop).await;

    assert!(matches!(result, Err(TransportError::NotConnected)));
    assert_eq!(connector.request_count(), 0);
}

#[tokio::test]
async fn test_exception_is_reported_and_link_kept() {
    let (spindle, connector) = controller();
    spindle.connect(LinkFixtures::sim0()).await.unwrap();
    connector.push_reply(DeviceReply::Exception(0x03));

    let error = spindle.set_frequency(65_535).await.unwrap_err();

    assert_eq!(error.exception_code(), Some(0x03));
    assert!(spindle.state().await.is_connected());
    spindle.stats().assert_requests(1, 0, 1);
}

#[tokio::test]
async fn test_link_fault_requires_reconnect() {
    let (spindle, connector) = controller();
    spindle.connect(LinkFixtures::sim0()).await.unwrap();
    connector.push_reply(DeviceReply::Disconnect);

    assert!(spindle.rotate_cw().await.unwrap_err().is_link_fault());
    assert_failed(&spindle.state().await);
    assert!(spindle.config().await.is_none());
    assert!(matches!(
        spindle.stop().await,
        Err(TransportError::NotConnected)
    ));

    spindle.connect(LinkFixtures::sim0()).await.unwrap();
    spindle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_state_readable_while_command_pending() {
    let (spindle, connector) = controller();
    let spindle = Arc::new(spindle);
    spindle.connect(LinkFixtures::sim0()).await.unwrap();
    connector.push_reply(DeviceReply::Silent);

    let pending = tokio::spawn({
        let spindle = Arc::clone(&spindle);
        async move { spindle.rotate_cw().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.request_count(), 1);

    let started = Instant::now();
    assert_eq!(spindle.state().await, ConnectionState::Connected);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(!pending.is_finished());

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(TransportError::NoResponse { .. })));
    assert!(spindle.state().await.is_connected());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commands_do_not_interleave() {
    let (spindle, connector) = controller();
    let spindle = Arc::new(spindle);
    spindle.connect(LinkFixtures::sim0()).await.unwrap();

    let tasks: Vec<_> = (0..16u16)
        .map(|i| {
            let spindle = Arc::clone(&spindle);
            tokio::spawn(async move { spindle.set_frequency(i * 100).await })
        })
        .collect();

    for task in tasks {
        let ack = task.await.unwrap().unwrap();
        assert_eq!(ack.register_address, 0x5000);
    }

    let requests = connector.requests();
    assert_eq!(requests.len(), 16);
    let mut values: Vec<u16> = requests
        .iter()
        .map(|frame| {
            assert_eq!(frame.len(), 8);
            assert_eq!(spindle_modbus::crc16_modbus(frame), 0);
            u16::from_be_bytes([frame[4], frame[5]])
        })
        .collect();
    values.sort_unstable();
    assert_eq!(values, (0..16u16).map(|i| i * 100).collect::<Vec<_>>());
    spindle.stats().assert_requests(16, 16, 0);
}

#[tokio::test]
async fn test_trait_object_dispatch() {
    let (spindle, connector) = controller();
    let spindle: Box<dyn SpindleControl> = Box::new(spindle);

    spindle.connect(LinkFixtures::sim0()).await.unwrap();
    spindle.rotate_ccw().await.unwrap();
    spindle.disconnect().await;

    assert_frames_eq(&connector.requests(), &[&FrameFixtures::ROTATE_CCW]);
    assert!(connector.wait_released(0, std::time::Duration::from_secs(1)).await);
}

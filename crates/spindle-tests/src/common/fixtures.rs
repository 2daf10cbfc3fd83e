// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Link configurations and reference frames. Every frame here was checked
//! against an independent CRC-16/Modbus calculator.

use std::time::Duration;

use spindle_modbus::{crc16_modbus, LinkConfig, Parity, StopBits, EXCEPTION_FLAG};

// =============================================================================
// Link Fixtures
// =============================================================================

/// Fixture providing link configurations.
pub struct LinkFixtures;

impl LinkFixtures {
    /// Read timeout used by simulated links.
    pub const READ_TIMEOUT: Duration = Duration::from_millis(200);

    /// The simulated port at 9600 8N1, slave 1.
    pub fn sim0() -> LinkConfig {
        LinkConfig::builder()
            .port("sim0")
            .baud_rate(9_600)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .slave_id(1)
            .read_timeout(Self::READ_TIMEOUT)
            .build()
            .expect("sim0 fixture is valid")
    }

    /// Same as [`sim0`](Self::sim0) but addressing `slave_id`.
    pub fn sim0_slave(slave_id: u8) -> LinkConfig {
        let mut config = Self::sim0();
        config.slave_id = slave_id.try_into().expect("valid slave id");
        config
    }

    /// A second simulated port, 19200 8E2.
    pub fn sim1() -> LinkConfig {
        LinkConfig::builder()
            .port("sim1")
            .baud_rate(19_200)
            .parity(Parity::Even)
            .stop_bits(StopBits::Two)
            .slave_id(1)
            .read_timeout(Self::READ_TIMEOUT)
            .build()
            .expect("sim1 fixture is valid")
    }
}

// =============================================================================
// Frame Fixtures
// =============================================================================

/// Reference frames for slave 1.
pub struct FrameFixtures;

impl FrameFixtures {
    /// Control register = 1 (run clockwise).
    pub const ROTATE_CW: [u8; 8] = [0x01, 0x06, 0x60, 0x00, 0x00, 0x01, 0x56, 0x0A];

    /// Control register = 2 (run counter-clockwise).
    pub const ROTATE_CCW: [u8; 8] = [0x01, 0x06, 0x60, 0x00, 0x00, 0x02, 0x16, 0x0B];

    /// Frequency register = 0.
    pub const STOP: [u8; 8] = [0x01, 0x06, 0x50, 0x00, 0x00, 0x00, 0x98, 0xCA];

    /// Frequency register = 5000.
    pub const FREQUENCY_5000: [u8; 8] = [0x01, 0x06, 0x50, 0x00, 0x13, 0x88, 0x95, 0x9C];

    /// Control register = 1 for slave 5.
    pub const ROTATE_CW_SLAVE_5: [u8; 8] = [0x05, 0x06, 0x60, 0x00, 0x00, 0x01, 0x57, 0x8E];

    /// Illegal data address exception for function 0x06.
    pub const EXCEPTION_ILLEGAL_ADDRESS: [u8; 5] = [0x01, 0x86, 0x02, 0xC3, 0xA1];
}

/// Appends the CRC to `body`, low byte first.
pub fn with_crc(body: &[u8]) -> Vec<u8> {
    let crc = crc16_modbus(body);
    let mut frame = body.to_vec();
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Builds an exception response.
pub fn exception_response(slave_id: u8, function_code: u8, code: u8) -> Vec<u8> {
    with_crc(&[slave_id, function_code | EXCEPTION_FLAG, code])
}

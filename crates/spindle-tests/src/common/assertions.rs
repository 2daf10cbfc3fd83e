// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Failure messages print frames as hex and mark the first differing byte.

use spindle_modbus::{format_hex, ConnectionState, SessionStats};

// =============================================================================
// Frame Assertions
// =============================================================================

/// Assert that two frames are byte-for-byte identical.
#[track_caller]
pub fn assert_frame_eq(actual: &[u8], expected: &[u8]) {
    if actual == expected {
        return;
    }

    let first_diff = actual
        .iter()
        .zip(expected)
        .position(|(a, e)| a != e)
        .unwrap_or_else(|| actual.len().min(expected.len()));

    panic!(
        "frame mismatch at byte {}\n  actual:   [{}] ({} bytes)\n  expected: [{}] ({} bytes)",
        first_diff,
        format_hex(actual),
        actual.len(),
        format_hex(expected),
        expected.len()
    );
}

/// Assert that `frames` are exactly `expected`, in order.
#[track_caller]
pub fn assert_frames_eq(frames: &[Vec<u8>], expected: &[&[u8]]) {
    assert_eq!(
        frames.len(),
        expected.len(),
        "expected {} frames, got {}: {:?}",
        expected.len(),
        frames.len(),
        frames.iter().map(|f| format_hex(f)).collect::<Vec<_>>()
    );
    for (actual, expected) in frames.iter().zip(expected) {
        assert_frame_eq(actual, expected);
    }
}

// =============================================================================
// State Assertions
// =============================================================================

/// Assert that the link is in the failed state.
#[track_caller]
pub fn assert_failed(state: &ConnectionState) {
    assert!(state.is_failed(), "expected failed state, got {}", state);
}

// =============================================================================
// Stats Assertions
// =============================================================================

/// Assertion extensions for SessionStats.
pub trait StatsAssertions {
    /// Assert the request counters.
    fn assert_requests(&self, total: u64, successful: u64, failed: u64);
}

impl StatsAssertions for SessionStats {
    #[track_caller]
    fn assert_requests(&self, total: u64, successful: u64, failed: u64) {
        let actual = (
            self.total_requests(),
            self.successful_requests(),
            self.failed_requests(),
        );
        assert_eq!(
            actual,
            (total, successful, failed),
            "expected (total, successful, failed) = ({}, {}, {}), got {:?}",
            total,
            successful,
            failed,
            actual
        );
    }
}

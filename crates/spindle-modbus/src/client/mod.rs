// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus RTU master client.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     SpindleController                           │
//! │            (spindle commands, one exchange at a time)           │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    TransportSession                             │
//! │     (state machine, framing, timeouts, inter-frame gap)         │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │ Connector::open
//!                              ▼
//! ┌─────────────────────┐             ┌─────────────────────┐
//! │    SerialStream     │             │    DuplexStream     │
//! │   (tokio-serial)    │             │ (tests, simulators) │
//! └─────────────────────┘             └─────────────────────┘
//! ```

mod link;
mod session;

pub use link::{available_ports, Connector, PortInfo, SerialConnector, SerialLink};
pub use session::TransportSession;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// =============================================================================
// SessionStats
// =============================================================================

/// Exchange counters for a session.
///
/// Shared behind an `Arc` so status readers never wait on the bus lock.
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Total number of exchanges attempted.
    total_requests: AtomicU64,
    /// Exchanges that ended in an acknowledgement.
    successful_requests: AtomicU64,
    /// Exchanges that ended in an error.
    failed_requests: AtomicU64,
    /// Exchanges where the slave stayed silent or went quiet mid-frame.
    timeouts: AtomicU64,
    /// Total round-trip time of successful exchanges in microseconds.
    total_response_time_us: AtomicU64,
    /// Number of links opened.
    connections: AtomicU64,
}

impl SessionStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an acknowledged exchange.
    pub fn record_success(&self, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Records a failed exchange.
    pub fn record_error(&self, timed_out: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records an opened link.
    pub fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Resets all statistics.
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.total_response_time_us.store(0, Ordering::Relaxed);
        self.connections.store(0, Ordering::Relaxed);
    }

    /// Returns the total number of exchanges.
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Returns the number of acknowledged exchanges.
    pub fn successful_requests(&self) -> u64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    /// Returns the number of failed exchanges.
    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    /// Returns the number of timed out exchanges.
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Returns the number of links opened.
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    /// Returns the success rate (0.0 - 1.0).
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 1.0;
        }
        self.successful_requests() as f64 / total as f64
    }

    /// Returns the mean round-trip time of acknowledged exchanges.
    pub fn average_response_time(&self) -> Option<Duration> {
        let successes = self.successful_requests();
        if successes == 0 {
            return None;
        }
        let total = self.total_response_time_us.load(Ordering::Relaxed);
        Some(Duration::from_micros(total / successes))
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Spindle Integration Tests
//!
//! Integration tests for the spindle controller, run against a scripted
//! drive simulator instead of real hardware.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: link configurations and reference frames
//!   - `mocks`: the simulated drive and its connector
//!   - `assertions`: frame and statistics assertions
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p spindle-tests
//!
//! # Run specific test suite
//! cargo test -p spindle-tests --test integration_codec
//! cargo test -p spindle-tests --test integration_session
//! cargo test -p spindle-tests --test integration_spindle
//! cargo test -p spindle-tests --test integration_config
//! cargo test -p spindle-tests --test integration_shell
//!
//! # Run with log output
//! RUST_LOG=spindle_modbus=debug cargo test -p spindle-tests -- --nocapture
//! ```
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use spindle_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let connector = MockConnector::new();
//!     connector.push_reply(DeviceReply::Exception(0x02));
//!     let spindle = SpindleController::with_connector(connector);
//!     spindle.connect(LinkFixtures::sim0()).await.unwrap();
//!     // ... test logic
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};
}

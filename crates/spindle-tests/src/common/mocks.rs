// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! A simulated drive reachable through [`MockConnector`]. Each opened link
//! is an in-memory duplex pipe with a device task on the far end that
//! answers requests according to a script of [`DeviceReply`] values and
//! records every request it receives.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use spindle_modbus::{ConnectError, Connector, LinkConfig, SerialLink};

use super::fixtures::exception_response;

/// Size of a write-single-register request.
const REQUEST_LEN: usize = 8;

// =============================================================================
// DeviceReply
// =============================================================================

/// How the simulated drive answers one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceReply {
    /// Echo the request back (normal acknowledgement).
    Echo,
    /// Send these exact bytes.
    Respond(Vec<u8>),
    /// Answer with an exception carrying this code.
    Exception(u8),
    /// Say nothing.
    Silent,
    /// Echo only the first `n` bytes, then go quiet.
    Partial(usize),
    /// Echo with the CRC high byte flipped.
    Corrupt,
    /// Close the link without answering.
    Disconnect,
}

// =============================================================================
// MockConnector
// =============================================================================

#[derive(Debug, Default)]
struct DeviceScript {
    replies: VecDeque<DeviceReply>,
    requests: Vec<Vec<u8>>,
    devices: Vec<Option<JoinHandle<()>>>,
    opened: Vec<LinkConfig>,
}

#[derive(Debug, Default)]
struct MockInner {
    script: Mutex<DeviceScript>,
    fail_open: AtomicBool,
    invalid_parameters: AtomicBool,
    open_count: AtomicU64,
}

/// Connector to a scripted drive simulator.
///
/// Clones share state, so a test can keep one handle while a controller
/// owns another. Unscripted requests are echoed.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    inner: Arc<MockInner>,
}

impl MockConnector {
    /// Create a connector whose drive echoes every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector that refuses to open any port.
    pub fn unavailable() -> Self {
        let connector = Self::new();
        connector.set_fail_open(true);
        connector
    }

    /// Make subsequent opens fail (or succeed again).
    pub fn set_fail_open(&self, fail: bool) {
        self.inner.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent opens report rejected line parameters.
    pub fn set_invalid_parameters(&self, invalid: bool) {
        self.inner.invalid_parameters.store(invalid, Ordering::SeqCst);
    }

    /// Queue the answer to the next unanswered request.
    pub fn push_reply(&self, reply: DeviceReply) {
        self.script().replies.push_back(reply);
    }

    /// Queue several answers in order.
    pub fn push_replies(&self, replies: impl IntoIterator<Item = DeviceReply>) {
        self.script().replies.extend(replies);
    }

    /// Requests received so far, across all links.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.script().requests.clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.script().requests.len()
    }

    /// Number of open attempts, successful or not.
    pub fn open_count(&self) -> u64 {
        self.inner.open_count.load(Ordering::SeqCst)
    }

    /// Configurations of the links opened successfully.
    pub fn opened(&self) -> Vec<LinkConfig> {
        self.script().opened.clone()
    }

    /// Waits until the host side of link `index` has been dropped.
    ///
    /// Returns `false` if the link is still held after `within`.
    pub async fn wait_released(&self, index: usize, within: Duration) -> bool {
        let handle = self
            .script()
            .devices
            .get_mut(index)
            .and_then(Option::take);
        match handle {
            Some(handle) => tokio::time::timeout(within, handle).await.is_ok(),
            None => false,
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, DeviceScript> {
        self.inner.script.lock().expect("mock script poisoned")
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, config: &LinkConfig) -> Result<Box<dyn SerialLink>, ConnectError> {
        self.inner.open_count.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_open.load(Ordering::SeqCst) {
            return Err(ConnectError::unavailable(&config.port, "no such device"));
        }
        if self.inner.invalid_parameters.load(Ordering::SeqCst) {
            return Err(ConnectError::invalid_parameters(
                &config.port,
                "line settings rejected",
            ));
        }

        let (host, device) = tokio::io::duplex(64);
        let task = tokio::spawn(run_device(device, Arc::clone(&self.inner)));

        let mut script = self.script();
        script.devices.push(Some(task));
        script.opened.push(config.clone());

        Ok(Box::new(host))
    }
}

/// Device side of one link. Ends when the host closes the link.
async fn run_device(mut device: DuplexStream, inner: Arc<MockInner>) {
    let mut request = [0u8; REQUEST_LEN];

    loop {
        if device.read_exact(&mut request).await.is_err() {
            break;
        }

        let reply = {
            let mut script = inner.script.lock().expect("mock script poisoned");
            script.requests.push(request.to_vec());
            script.replies.pop_front().unwrap_or(DeviceReply::Echo)
        };

        let bytes = match reply {
            DeviceReply::Echo => request.to_vec(),
            DeviceReply::Respond(bytes) => bytes,
            DeviceReply::Exception(code) => exception_response(request[0], request[1], code),
            DeviceReply::Silent => continue,
            DeviceReply::Partial(n) => request[..n.min(REQUEST_LEN)].to_vec(),
            DeviceReply::Corrupt => {
                let mut bytes = request.to_vec();
                bytes[REQUEST_LEN - 1] ^= 0xFF;
                bytes
            }
            DeviceReply::Disconnect => break,
        };

        if device.write_all(&bytes).await.is_err() {
            break;
        }
    }
}

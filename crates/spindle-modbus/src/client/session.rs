// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport session: one serial link, one request at a time.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;
use tokio::time::Instant;

use super::link::{Connector, SerialConnector, SerialLink};
use super::SessionStats;
use crate::codec::{self, format_hex, Ack, CommandFrame, WRITE_SINGLE_REGISTER_LEN};
use crate::error::{ConnectError, TransportError, TransportResult};
use crate::types::{ConnectionState, LinkConfig};

/// A Modbus RTU master session over a single serial link.
///
/// The session exclusively owns the open link. Requests are strictly
/// sequential: `send_command` takes `&mut self`, so a second request cannot
/// start before the first has been answered or has timed out.
///
/// Only an I/O failure on the link moves the session to
/// [`ConnectionState::Failed`]. Timeouts, CRC errors and slave exceptions
/// are reported for the exchange and the session stays connected.
///
/// State changes are published on a watch channel, so observers holding a
/// [`subscribe_state`](Self::subscribe_state) receiver can read the state
/// while an exchange is in flight.
pub struct TransportSession<C = SerialConnector> {
    connector: C,
    config: Option<LinkConfig>,
    link: Option<Box<dyn SerialLink>>,
    state: watch::Sender<ConnectionState>,
    last_frame_at: Option<Instant>,
    stats: Arc<SessionStats>,
}

impl TransportSession<SerialConnector> {
    /// Creates a disconnected session that opens real serial ports.
    pub fn new() -> Self {
        Self::with_connector(SerialConnector::new())
    }
}

impl Default for TransportSession<SerialConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> TransportSession<C> {
    /// Creates a disconnected session that opens links through `connector`.
    pub fn with_connector(connector: C) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            config: None,
            link: None,
            state,
            last_frame_at: None,
            stats: Arc::new(SessionStats::new()),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Returns a receiver that always holds the latest state.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Returns true if commands may be sent.
    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// Returns the configuration of the open link.
    pub fn config(&self) -> Option<&LinkConfig> {
        self.config.as_ref()
    }

    /// Returns the exchange counters.
    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    /// Returns the connector links are opened with.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Opens the serial link described by `config`.
    ///
    /// Any link already open is released first. On failure the session is
    /// left in the failed state with no link held.
    pub async fn connect(&mut self, config: LinkConfig) -> Result<(), ConnectError> {
        if self.link.is_some() {
            tracing::debug!(
                port = self.config.as_ref().map(|c| c.port.as_str()).unwrap_or_default(),
                "Releasing current link before reconnecting"
            );
            self.close_link().await;
        }
        self.config = None;
        self.last_frame_at = None;
        self.set_state(ConnectionState::Connecting);

        if let Err(error) = config.validate() {
            let error = ConnectError::invalid_parameters(&config.port, error.to_string());
            error.log("connect");
            self.set_state(ConnectionState::Failed(error.to_string()));
            return Err(error);
        }

        match self.connector.open(&config).await {
            Ok(link) => {
                tracing::info!(
                    port = %config.port,
                    settings = %config.line_settings(),
                    slave_id = config.slave_id.get(),
                    "Connected to serial link"
                );
                self.link = Some(link);
                self.config = Some(config);
                self.set_state(ConnectionState::Connected);
                self.stats.record_connection();
                Ok(())
            }
            Err(error) => {
                error.log("connect");
                self.set_state(ConnectionState::Failed(error.to_string()));
                Err(error)
            }
        }
    }

    /// Sends one request and waits for its response.
    ///
    /// Pending input is discarded before the frame goes out, so a late
    /// answer to an earlier request cannot be taken for this one. The
    /// read timeout bounds each wait for bytes; a slave that starts
    /// answering and then falls silent yields
    /// [`TransportError::IncompleteResponse`].
    pub async fn send_command(
        &mut self,
        frame: &CommandFrame,
        expected_function_code: u8,
    ) -> TransportResult<Ack> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let started = Instant::now();
        let result = self.exchange(frame, expected_function_code).await;
        self.last_frame_at = Some(Instant::now());

        match &result {
            Ok(ack) => {
                self.stats.record_success(started.elapsed());
                tracing::debug!(
                    slave_id = ack.slave_id,
                    register = ack.register_address,
                    value = ack.value,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Command acknowledged"
                );
            }
            Err(error) => {
                self.stats.record_error(error.is_timeout());
                error.log("send_command");
                if error.is_link_fault() {
                    self.fail(error);
                }
            }
        }

        result
    }

    /// Releases the link. Safe to call in any state.
    pub async fn disconnect(&mut self) {
        let port = self.config.take().map(|c| c.port);
        let had_link = self.link.is_some();
        self.close_link().await;
        self.set_state(ConnectionState::Disconnected);
        self.last_frame_at = None;

        if had_link {
            tracing::info!(port = port.as_deref().unwrap_or_default(), "Disconnected");
        }
    }

    async fn exchange(
        &mut self,
        frame: &CommandFrame,
        expected_function_code: u8,
    ) -> TransportResult<Ack> {
        let (slave_id, read_timeout, frame_gap) = match &self.config {
            Some(config) => (
                config.slave_id,
                config.read_timeout,
                config.calculated_inter_frame_delay(),
            ),
            None => return Err(TransportError::NotConnected),
        };

        if let Some(last) = self.last_frame_at {
            let quiet = last.elapsed();
            if quiet < frame_gap {
                tokio::time::sleep(frame_gap - quiet).await;
            }
        }

        let link = self.link.as_mut().ok_or(TransportError::NotConnected)?;

        link.clear_buffers()
            .map_err(|e| TransportError::io("clear", e))?;

        tracing::trace!(request = %frame, "TX");
        link.write_all(frame.as_bytes())
            .await
            .map_err(|e| TransportError::io("write", e))?;
        link.flush()
            .await
            .map_err(|e| TransportError::io("flush", e))?;

        let response = read_response(&mut **link, expected_function_code, read_timeout).await?;
        tracing::trace!(response = %format_hex(&response), "RX");

        let ack = codec::decode_response(&response, slave_id, expected_function_code)?;
        if response.as_slice() != frame.as_bytes() {
            return Err(TransportError::malformed(format!(
                "echo [{}] differs from request [{}]",
                format_hex(&response),
                frame
            )));
        }

        Ok(ack)
    }

    fn fail(&mut self, error: &TransportError) {
        // Dropping the handle closes the port.
        self.link = None;
        self.config = None;
        self.set_state(ConnectionState::Failed(error.to_string()));
    }

    fn set_state(&self, next: ConnectionState) {
        let current = self.state.borrow().clone();
        debug_assert!(
            current.can_transition_to(&next),
            "illegal state transition {} -> {}",
            current,
            next
        );
        tracing::trace!(from = %current, to = %next, "State transition");
        self.state.send_replace(next);
    }

    async fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.shutdown().await {
                tracing::warn!(error = %e, "Error closing serial link");
            }
        }
    }
}

/// Reads one response frame.
///
/// The frame length is known once the function code byte is in: 5 bytes
/// for an exception, 8 for an echo. Each wait for bytes is bounded by
/// `read_timeout`.
async fn read_response(
    link: &mut dyn SerialLink,
    expected_function_code: u8,
    read_timeout: Duration,
) -> TransportResult<Vec<u8>> {
    let mut response = Vec::with_capacity(WRITE_SINGLE_REGISTER_LEN);
    let mut chunk = [0u8; WRITE_SINGLE_REGISTER_LEN];

    loop {
        let target = codec::expected_response_len(&response, expected_function_code)
            .unwrap_or(WRITE_SINGLE_REGISTER_LEN);
        if response.len() >= target {
            response.truncate(target);
            return Ok(response);
        }

        let wanted = target - response.len();
        match tokio::time::timeout(read_timeout, link.read(&mut chunk[..wanted])).await {
            Ok(Ok(0)) => {
                return Err(TransportError::io(
                    "read",
                    io::Error::new(io::ErrorKind::UnexpectedEof, "serial link closed"),
                ));
            }
            Ok(Ok(n)) => response.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => return Err(TransportError::io("read", e)),
            Err(_) if response.is_empty() => {
                return Err(TransportError::NoResponse {
                    timeout: read_timeout,
                });
            }
            Err(_) => {
                return Err(TransportError::IncompleteResponse {
                    expected: target,
                    received: response,
                });
            }
        }
    }
}

impl<C> fmt::Debug for TransportSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSession")
            .field("state", &*self.state.borrow())
            .field("port", &self.config.as_ref().map(|c| c.port.as_str()))
            .field("link_open", &self.link.is_some())
            .finish()
    }
}

impl<C> Drop for TransportSession<C> {
    fn drop(&mut self) {
        if self.link.take().is_some() {
            tracing::debug!("Serial link released on drop");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

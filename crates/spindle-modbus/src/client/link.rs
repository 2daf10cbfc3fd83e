// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Serial link abstraction.
//!
//! A [`TransportSession`](super::TransportSession) never opens a port
//! itself. It asks a [`Connector`] for a [`SerialLink`], which lets tests
//! and simulators stand in for real hardware.

use std::io;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{
    ClearBuffer, DataBits as SerialDataBits, FlowControl, Parity as SerialParity,
    SerialPortBuilderExt, SerialPortType, SerialStream, StopBits as SerialStopBits,
};

use crate::error::ConnectError;
use crate::types::{LinkConfig, Parity, StopBits};

// =============================================================================
// SerialLink / Connector
// =============================================================================

/// An open, exclusively owned byte stream to the bus.
pub trait SerialLink: AsyncRead + AsyncWrite + Send + Unpin {
    /// Discards bytes pending in either direction.
    ///
    /// Called before every request so that a late answer to an earlier
    /// request is never taken for the current one.
    fn clear_buffers(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialLink for SerialStream {
    fn clear_buffers(&mut self) -> io::Result<()> {
        tokio_serial::SerialPort::clear(self, ClearBuffer::All).map_err(io::Error::from)
    }
}

impl SerialLink for tokio::io::DuplexStream {}

/// Opens serial links.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a link with the given parameters.
    async fn open(&self, config: &LinkConfig) -> Result<Box<dyn SerialLink>, ConnectError>;
}

// =============================================================================
// SerialConnector
// =============================================================================

/// Opens real serial ports through tokio-serial.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialConnector;

impl SerialConnector {
    /// Creates a new connector.
    pub fn new() -> Self {
        Self
    }

    /// Converts Parity to tokio-serial Parity.
    ///
    /// Mark and space parity have no portable driver support.
    fn convert_parity(port: &str, parity: Parity) -> Result<SerialParity, ConnectError> {
        match parity {
            Parity::None => Ok(SerialParity::None),
            Parity::Even => Ok(SerialParity::Even),
            Parity::Odd => Ok(SerialParity::Odd),
            Parity::Mark | Parity::Space => Err(ConnectError::invalid_parameters(
                port,
                format!("{:?} parity is not supported by the serial driver", parity).to_lowercase(),
            )),
        }
    }

    /// Converts StopBits to tokio-serial StopBits.
    fn convert_stop_bits(port: &str, bits: StopBits) -> Result<SerialStopBits, ConnectError> {
        match bits {
            StopBits::One => Ok(SerialStopBits::One),
            StopBits::Two => Ok(SerialStopBits::Two),
            StopBits::OnePointFive => Err(ConnectError::invalid_parameters(
                port,
                "1.5 stop bits are not supported by the serial driver",
            )),
        }
    }

    /// Maps a tokio-serial open failure to ConnectError.
    fn map_open_error(port: &str, error: tokio_serial::Error) -> ConnectError {
        match error.kind {
            tokio_serial::ErrorKind::InvalidInput
            | tokio_serial::ErrorKind::Io(io::ErrorKind::InvalidInput) => {
                ConnectError::invalid_parameters(port, error.description)
            }
            _ => ConnectError::unavailable(port, error.description),
        }
    }
}

#[async_trait]
impl Connector for SerialConnector {
    async fn open(&self, config: &LinkConfig) -> Result<Box<dyn SerialLink>, ConnectError> {
        let parity = Self::convert_parity(&config.port, config.parity)?;
        let stop_bits = Self::convert_stop_bits(&config.port, config.stop_bits)?;

        let stream = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(SerialDataBits::Eight)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open_native_async()
            .map_err(|e| Self::map_open_error(&config.port, e))?;

        tracing::debug!(
            port = %config.port,
            settings = %config.line_settings(),
            "Serial port opened"
        );

        Ok(Box::new(stream))
    }
}

// =============================================================================
// Port enumeration
// =============================================================================

/// A serial port found on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    /// Name to pass as the port of a [`LinkConfig`].
    pub name: String,
    /// Bus the port sits on: "usb", "pci", "bluetooth" or "unknown".
    pub kind: &'static str,
    /// Manufacturer and product, when the system reports them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Lists the serial ports present on this machine.
pub fn available_ports() -> io::Result<Vec<PortInfo>> {
    let ports = tokio_serial::available_ports().map_err(io::Error::from)?;
    Ok(ports
        .into_iter()
        .map(|port| {
            let (kind, description) = match port.port_type {
                SerialPortType::UsbPort(usb) => {
                    let parts: Vec<String> =
                        [usb.manufacturer, usb.product].into_iter().flatten().collect();
                    let description = if parts.is_empty() {
                        format!("{:04x}:{:04x}", usb.vid, usb.pid)
                    } else {
                        parts.join(" ")
                    };
                    ("usb", Some(description))
                }
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortInfo {
                name: port.port_name,
                kind,
                description,
            }
        })
        .collect())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SlaveId;

    #[test]
    fn test_parity_conversion() {
        assert!(matches!(
            SerialConnector::convert_parity("COM3", Parity::Even),
            Ok(SerialParity::Even)
        ));
        assert!(matches!(
            SerialConnector::convert_parity("COM3", Parity::None),
            Ok(SerialParity::None)
        ));
        assert!(matches!(
            SerialConnector::convert_parity("COM3", Parity::Mark),
            Err(ConnectError::InvalidParameters { .. })
        ));
        assert!(matches!(
            SerialConnector::convert_parity("COM3", Parity::Space),
            Err(ConnectError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_stop_bits_conversion() {
        assert!(matches!(
            SerialConnector::convert_stop_bits("COM3", StopBits::Two),
            Ok(SerialStopBits::Two)
        ));
        assert!(matches!(
            SerialConnector::convert_stop_bits("COM3", StopBits::OnePointFive),
            Err(ConnectError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_open_error_mapping() {
        let error = SerialConnector::map_open_error(
            "/dev/ttyUSB9",
            tokio_serial::Error::new(tokio_serial::ErrorKind::NoDevice, "no such device"),
        );
        assert_eq!(
            error,
            ConnectError::unavailable("/dev/ttyUSB9", "no such device")
        );

        let error = SerialConnector::map_open_error(
            "/dev/ttyUSB0",
            tokio_serial::Error::new(tokio_serial::ErrorKind::InvalidInput, "bad baud rate"),
        );
        assert!(matches!(error, ConnectError::InvalidParameters { .. }));
    }

    #[tokio::test]
    async fn test_open_missing_port() {
        let config = LinkConfig::new("/dev/spindle-does-not-exist", SlaveId::default());
        let result = SerialConnector::new().open(&config).await;
        assert!(matches!(result, Err(ConnectError::PortUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_parity_rejected_before_open() {
        let mut config = LinkConfig::new("/dev/spindle-does-not-exist", SlaveId::default());
        config.parity = Parity::Mark;
        let result = SerialConnector::new().open(&config).await;
        assert!(matches!(result, Err(ConnectError::InvalidParameters { .. })));
    }
}

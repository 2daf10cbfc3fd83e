// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus RTU frame codec.
//!
//! Pure functions over byte slices: CRC-16/Modbus, encoding of
//! write-single-register requests, and classification of responses.
//!
//! # Frame Layout
//!
//! ```text
//! Write single register (request and normal response, 8 bytes):
//! ┌───────┬──────┬────────┬────────┬────────┬────────┬────────┬────────┐
//! │ slave │ 0x06 │ reg hi │ reg lo │ val hi │ val lo │ crc lo │ crc hi │
//! └───────┴──────┴────────┴────────┴────────┴────────┴────────┴────────┘
//!
//! Exception response (5 bytes):
//! ┌───────┬───────────┬──────┬────────┬────────┐
//! │ slave │ fc | 0x80 │ code │ crc lo │ crc hi │
//! └───────┴───────────┴──────┴────────┴────────┘
//! ```
//!
//! Register address and value are big-endian. The CRC is the only
//! little-endian field.
//!
//! # Examples
//!
//! ```
//! use spindle_modbus::codec::{decode_response, encode_write_single_register, FC_WRITE_SINGLE_REGISTER};
//! use spindle_modbus::SlaveId;
//!
//! let slave = SlaveId::new(1).unwrap();
//! let frame = encode_write_single_register(slave, 0x6000, 0x0001);
//! assert_eq!(frame.as_bytes(), &[0x01, 0x06, 0x60, 0x00, 0x00, 0x01, 0x56, 0x0A]);
//!
//! // A write-single-register slave echoes the request on success.
//! let ack = decode_response(frame.as_bytes(), slave, FC_WRITE_SINGLE_REGISTER).unwrap();
//! assert_eq!(ack.register_address, 0x6000);
//! ```

use std::fmt;

use crate::error::{ModbusError, ModbusResult};
use crate::types::SlaveId;

/// Function code: write single holding register.
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Bit set in the function code of an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Length of a write-single-register request or normal response.
pub const WRITE_SINGLE_REGISTER_LEN: usize = 8;

/// Length of an exception response.
pub const EXCEPTION_RESPONSE_LEN: usize = 5;

/// Shortest frame [`decode_response`] will look at.
pub const MIN_RESPONSE_LEN: usize = EXCEPTION_RESPONSE_LEN;

const CRC_INIT: u16 = 0xFFFF;
const CRC_POLYNOMIAL: u16 = 0xA001;

// =============================================================================
// CRC
// =============================================================================

/// Computes the CRC-16/Modbus checksum of `bytes`.
///
/// Reflected polynomial 0xA001, initial value 0xFFFF, no final XOR.
/// The empty input yields 0xFFFF.
pub fn crc16_modbus(bytes: &[u8]) -> u16 {
    let mut crc = CRC_INIT;
    for &byte in bytes {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Returns the CRC carried in the last two bytes of a frame.
fn trailing_crc(frame: &[u8]) -> u16 {
    let n = frame.len();
    u16::from_le_bytes([frame[n - 2], frame[n - 1]])
}

// =============================================================================
// CommandFrame
// =============================================================================

/// An encoded write-single-register request, CRC included.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandFrame {
    bytes: [u8; WRITE_SINGLE_REGISTER_LEN],
}

impl CommandFrame {
    /// Returns the raw bytes to put on the wire.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the frame length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a frame carries at least address, function and CRC.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the addressed slave.
    pub fn slave_id(&self) -> u8 {
        self.bytes[0]
    }

    /// Returns the function code.
    pub fn function_code(&self) -> u8 {
        self.bytes[1]
    }

    /// Returns the target register.
    pub fn register_address(&self) -> u16 {
        u16::from_be_bytes([self.bytes[2], self.bytes[3]])
    }

    /// Returns the value written.
    pub fn value(&self) -> u16 {
        u16::from_be_bytes([self.bytes[4], self.bytes[5]])
    }

    /// Returns the CRC carried by the frame.
    pub fn crc(&self) -> u16 {
        trailing_crc(&self.bytes)
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hex(&self.bytes))
    }
}

impl fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFrame")
            .field("slave_id", &self.slave_id())
            .field("register", &format_args!("{:#06x}", self.register_address()))
            .field("value", &self.value())
            .field("bytes", &format_args!("[{}]", self))
            .finish()
    }
}

/// Encodes a write-single-register (0x06) request.
///
/// The result is always 8 bytes and its CRC covers the first 6.
pub fn encode_write_single_register(
    slave_id: SlaveId,
    register_address: u16,
    value: u16,
) -> CommandFrame {
    let [reg_hi, reg_lo] = register_address.to_be_bytes();
    let [val_hi, val_lo] = value.to_be_bytes();
    let mut bytes = [
        slave_id.get(),
        FC_WRITE_SINGLE_REGISTER,
        reg_hi,
        reg_lo,
        val_hi,
        val_lo,
        0,
        0,
    ];
    let [crc_lo, crc_hi] = crc16_modbus(&bytes[..6]).to_le_bytes();
    bytes[6] = crc_lo;
    bytes[7] = crc_hi;
    CommandFrame { bytes }
}

// =============================================================================
// Response decoding
// =============================================================================

/// A positive acknowledgement of a write-single-register request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ack {
    /// Slave that answered.
    pub slave_id: u8,
    /// Function code of the response.
    pub function_code: u8,
    /// Register the slave reports having written.
    pub register_address: u16,
    /// Value the slave reports having written.
    pub value: u16,
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slave {} wrote {:#06x} = {}",
            self.slave_id, self.register_address, self.value
        )
    }
}

/// Classifies a complete response frame.
///
/// Checks run in this order: length, CRC, slave address, function code.
/// A frame whose function code equals `expected_function_code` is an
/// acknowledgement; one with the exception bit set carries the slave's
/// exception code in its third byte. Anything else is malformed.
pub fn decode_response(
    frame: &[u8],
    expected_slave_id: SlaveId,
    expected_function_code: u8,
) -> ModbusResult<Ack> {
    if frame.len() < MIN_RESPONSE_LEN {
        return Err(ModbusError::malformed(format!(
            "frame too short: {} bytes, need at least {}",
            frame.len(),
            MIN_RESPONSE_LEN
        )));
    }

    let n = frame.len();
    let computed = crc16_modbus(&frame[..n - 2]);
    let carried = trailing_crc(frame);
    if computed != carried {
        return Err(ModbusError::ChecksumMismatch {
            expected: computed,
            actual: carried,
        });
    }

    let slave = frame[0];
    if slave != expected_slave_id.get() {
        return Err(ModbusError::UnexpectedSlave {
            expected: expected_slave_id.get(),
            actual: slave,
        });
    }

    let function_code = frame[1];
    if function_code == expected_function_code {
        if n != WRITE_SINGLE_REGISTER_LEN {
            return Err(ModbusError::malformed(format!(
                "acknowledgement is {} bytes, expected {}",
                n, WRITE_SINGLE_REGISTER_LEN
            )));
        }
        return Ok(Ack {
            slave_id: slave,
            function_code,
            register_address: u16::from_be_bytes([frame[2], frame[3]]),
            value: u16::from_be_bytes([frame[4], frame[5]]),
        });
    }

    if function_code == expected_function_code | EXCEPTION_FLAG {
        return Err(ModbusError::SlaveException {
            function_code: expected_function_code,
            code: frame[2],
        });
    }

    Err(ModbusError::malformed(format!(
        "unexpected function code {:#04x}",
        function_code
    )))
}

/// Returns how long the response being received will be.
///
/// `None` until the function code byte has arrived. A set exception bit
/// means a 5 byte frame, anything else is read as a full 8 byte echo.
pub fn expected_response_len(partial: &[u8], expected_function_code: u8) -> Option<usize> {
    let function_code = *partial.get(1)?;
    if function_code == expected_function_code | EXCEPTION_FLAG {
        Some(EXCEPTION_RESPONSE_LEN)
    } else {
        Some(WRITE_SINGLE_REGISTER_LEN)
    }
}

/// Formats bytes as space separated upper-case hex, e.g. "01 06 60 00".
pub fn format_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:02X}", byte));
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn slave(id: u8) -> SlaveId {
        SlaveId::new(id).unwrap()
    }

    /// Appends a CRC to a frame body.
    fn with_crc(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc16_modbus(body).to_le_bytes());
        frame
    }

    #[test]
    fn test_crc_known_vectors() {
        assert_eq!(crc16_modbus(&[]), 0xFFFF);
        assert_eq!(crc16_modbus(b"123456789"), 0x4B37);
        assert_eq!(crc16_modbus(&[0x01, 0x06, 0x60, 0x00, 0x00, 0x01]), 0x0A56);
        assert_eq!(crc16_modbus(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A]), 0xCDC5);
        assert_eq!(crc16_modbus(&[0x01, 0x86, 0x02]), 0xA1C3);
    }

    #[test]
    fn test_crc_of_frame_with_crc_is_zero() {
        let frame = encode_write_single_register(slave(7), 0x5000, 1234);
        assert_eq!(crc16_modbus(frame.as_bytes()), 0x0000);
    }

    #[test]
    fn test_encode_golden_frames() {
        let cases: [(u16, u16, [u8; 8]); 4] = [
            (0x6000, 1, [0x01, 0x06, 0x60, 0x00, 0x00, 0x01, 0x56, 0x0A]),
            (0x6000, 2, [0x01, 0x06, 0x60, 0x00, 0x00, 0x02, 0x16, 0x0B]),
            (0x5000, 0, [0x01, 0x06, 0x50, 0x00, 0x00, 0x00, 0x98, 0xCA]),
            (0x5000, 5000, [0x01, 0x06, 0x50, 0x00, 0x13, 0x88, 0x95, 0x9C]),
        ];
        for (register, value, expected) in cases {
            let frame = encode_write_single_register(slave(1), register, value);
            assert_eq!(frame.as_bytes(), &expected, "register {register:#06x} value {value}");
        }
    }

    #[test]
    fn test_frame_accessors() {
        let frame = encode_write_single_register(slave(5), 0x6000, 1);
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.slave_id(), 5);
        assert_eq!(frame.function_code(), FC_WRITE_SINGLE_REGISTER);
        assert_eq!(frame.register_address(), 0x6000);
        assert_eq!(frame.value(), 1);
        assert_eq!(frame.crc(), 0x8E57);
        assert_eq!(frame.to_string(), "05 06 60 00 00 01 57 8E");
    }

    #[test]
    fn test_decode_echo_is_ack() {
        let frame = encode_write_single_register(slave(1), 0x5000, 5000);
        let ack = decode_response(frame.as_bytes(), slave(1), FC_WRITE_SINGLE_REGISTER).unwrap();
        assert_eq!(
            ack,
            Ack {
                slave_id: 1,
                function_code: 0x06,
                register_address: 0x5000,
                value: 5000,
            }
        );
    }

    #[test]
    fn test_decode_exception() {
        let response = [0x01, 0x86, 0x02, 0xC3, 0xA1];
        let err = decode_response(&response, slave(1), FC_WRITE_SINGLE_REGISTER).unwrap_err();
        assert_eq!(
            err,
            ModbusError::SlaveException {
                function_code: 0x06,
                code: 0x02
            }
        );
    }

    #[test]
    fn test_decode_unknown_exception_code_is_preserved() {
        let response = with_crc(&[0x01, 0x86, 0x7F]);
        let err = decode_response(&response, slave(1), FC_WRITE_SINGLE_REGISTER).unwrap_err();
        assert!(matches!(err, ModbusError::SlaveException { code: 0x7F, .. }));
    }

    #[test]
    fn test_decode_too_short() {
        for len in 0..MIN_RESPONSE_LEN {
            let bytes = vec![0x01; len];
            let err = decode_response(&bytes, slave(1), FC_WRITE_SINGLE_REGISTER).unwrap_err();
            assert!(matches!(err, ModbusError::MalformedFrame { .. }), "len {len}");
        }
    }

    #[test]
    fn test_decode_checks_crc_before_slave() {
        // Wrong slave and broken CRC: the CRC failure wins.
        let mut response = encode_write_single_register(slave(2), 0x6000, 1).as_bytes().to_vec();
        response[7] ^= 0xFF;
        let err = decode_response(&response, slave(1), FC_WRITE_SINGLE_REGISTER).unwrap_err();
        assert!(matches!(err, ModbusError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_decode_unexpected_slave() {
        let response = encode_write_single_register(slave(2), 0x6000, 1);
        let err = decode_response(response.as_bytes(), slave(1), FC_WRITE_SINGLE_REGISTER)
            .unwrap_err();
        assert_eq!(
            err,
            ModbusError::UnexpectedSlave {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_decode_unexpected_function_code() {
        let response = with_crc(&[0x01, 0x03, 0x02, 0x00, 0x01]);
        let err = decode_response(&response, slave(1), FC_WRITE_SINGLE_REGISTER).unwrap_err();
        assert!(matches!(err, ModbusError::MalformedFrame { .. }));
    }

    #[test]
    fn test_decode_short_ack_is_malformed() {
        let response = with_crc(&[0x01, 0x06, 0x60]);
        let err = decode_response(&response, slave(1), FC_WRITE_SINGLE_REGISTER).unwrap_err();
        assert!(matches!(err, ModbusError::MalformedFrame { .. }));
    }

    #[test]
    fn test_single_bit_flip_never_acks() {
        let frame = encode_write_single_register(slave(1), 0x6000, 1);
        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.as_bytes().to_vec();
                corrupted[byte] ^= 1 << bit;
                let result = decode_response(&corrupted, slave(1), FC_WRITE_SINGLE_REGISTER);
                assert!(
                    matches!(result, Err(ModbusError::ChecksumMismatch { .. })),
                    "flip of byte {byte} bit {bit} gave {result:?}"
                );
            }
        }
    }

    #[test]
    fn test_expected_response_len() {
        assert_eq!(expected_response_len(&[], FC_WRITE_SINGLE_REGISTER), None);
        assert_eq!(expected_response_len(&[0x01], FC_WRITE_SINGLE_REGISTER), None);
        assert_eq!(expected_response_len(&[0x01, 0x06], FC_WRITE_SINGLE_REGISTER), Some(8));
        assert_eq!(expected_response_len(&[0x01, 0x86, 0x02], FC_WRITE_SINGLE_REGISTER), Some(5));
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[]), "");
        assert_eq!(format_hex(&[0x0A]), "0A");
        assert_eq!(format_hex(&[0x01, 0xFF, 0x10]), "01 FF 10");
    }
}

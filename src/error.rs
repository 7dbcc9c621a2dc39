//! Error types.
//!
//! The decoder never fails: garbage is skipped and bad checksums are NAKed.
//! These types cover building and parsing individual request/response frames
//! and driving a serial port.

use thiserror::Error;

/// Misuse when building an outbound frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("register address {0} does not fit in 16 bits")]
    AddressOutOfRange(u32),

    #[error("payload of {0} bytes exceeds the 255 byte frame limit")]
    PayloadTooLarge(usize),

    #[error("encode buffer too small: expected {expected} bytes, found {found}")]
    EncodeBufferTooSmall { expected: usize, found: usize },
}

/// A frame could not be parsed as the request or response that was asked for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("frame truncated: expected at least {expected_at_least} bytes, found {found}")]
    Truncated {
        expected_at_least: usize,
        found: usize,
    },

    #[error("frame does not begin with a start marker (found 0x{found:02X})")]
    MissingStart { found: u8 },

    /// Framing is fine but the command belongs to another message type.
    #[error("wrong message kind: expected command 0x{expected:02X}, found 0x{found:02X}")]
    WrongMessageKind { expected: u8, found: u8 },

    #[error("length field mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: u8, found: u8 },

    #[error("checksum mismatch: calculated 0x{calculated:02X}, found 0x{found:02X}")]
    ChecksumMismatch { calculated: u8, found: u8 },
}

/// Errors from [`SerialLink`](crate::SerialLink).
#[derive(Error, Debug)]
pub enum LinkError<WriteError, ReadError> {
    #[error("serial read failed: {0:?}")]
    Read(ReadError),

    #[error("serial write failed: {0:?}")]
    Write(WriteError),

    #[error("request queue is full")]
    QueueFull,

    #[error("transmit queue is full")]
    TransmitQueueFull,

    #[error(transparent)]
    Request(#[from] RequestError),
}

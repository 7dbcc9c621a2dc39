//! Link layer for the serial bus of a heat pump controller.
//!
//! The heat pump talks first: it streams `5C 00 ADDR CMD LEN PAYLOAD CSUM`
//! frames and expects every one of them to be acknowledged. Two of those
//! frames are polls, offering the controller a slot to send a queued read or
//! write request framed as `C0 CMD LEN PAYLOAD CSUM`.
//!
//! [`Decoder`] turns raw bytes into validated frames and reports them through
//! a [`LinkContext`]. [`SerialLink`] wires a decoder to an `embedded-hal-nb`
//! serial port and answers polls from its request queues.
#![no_std]

extern crate alloc;

pub mod buffer;
pub mod checksum;
pub mod config;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod request;
pub mod serial;

pub trait Encode {
    type Error;

    /// Write the frame into `buffer`, returning the number of bytes used.
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a>
where
    Self: Sized,
{
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub use buffer::StreamBuffer;
pub use config::{DecoderConfig, LinkConfig};
pub use decoder::{Decoder, DecoderState, LinkContext, LinkStats, Progress};
pub use error::{LinkError, RequestError, ResponseError};
pub use frame::{FrameHeader, InboundFrame, OutboundFrame};
pub use protocol::{DeviceAddress, Direction, FrameKind};
pub use request::{ReadRequest, ReadResponse, WriteRequest, WriteResponse};
pub use serial::{BufferedTx, FrameSink, SerialLink, TxError};

//! Read/write requests sent to the heat pump and the responses it answers
//! with.
//!
//! Requests use the controller framing, `C0 CMD LEN PAYLOAD.. CSUM`, with the
//! start byte folded into the checksum. Responses are device frames and come
//! back through the decoder as `5C 00 ADDR CMD LEN PAYLOAD.. CSUM`.
//!
//! Register addresses are little-endian everywhere. Values are little-endian
//! in write requests and big-endian in read responses, as the firmware does.

use crate::{
    Decode, Encode,
    checksum,
    error::{RequestError, ResponseError},
    frame::{FrameHeader, OutboundFrame},
    protocol::{
        ADDR_MODBUS40, CMD_MODBUS_READ_REQ, CMD_MODBUS_READ_RESP, CMD_MODBUS_WRITE_REQ,
        CMD_MODBUS_WRITE_RESP, Direction, FILL, OUTBOUND_HEADER_SIZE, OUTBOUND_START, START,
    },
};

const READ_REQUEST_LEN: u8 = 2;
const WRITE_REQUEST_LEN: u8 = 6;
const READ_RESPONSE_LEN: u8 = 6;
const WRITE_RESPONSE_LEN: u8 = 1;

/// Register addresses are carried in a 16 bit field.
fn register_address(address: u32) -> Result<u16, RequestError> {
    u16::try_from(address).map_err(|_| RequestError::AddressOutOfRange(address))
}

fn copy_out(frame: &[u8], buffer: &mut [u8]) -> Result<usize, RequestError> {
    if buffer.len() < frame.len() {
        return Err(RequestError::EncodeBufferTooSmall {
            expected: frame.len(),
            found: buffer.len(),
        });
    }
    buffer[..frame.len()].copy_from_slice(frame);
    Ok(frame.len())
}

/// Checks framing, command, length and checksum of a controller frame and
/// returns its payload.
fn outbound_payload(data: &[u8], command: u8, length: u8) -> Result<&[u8], ResponseError> {
    let (start, cmd, len) = match data {
        [start, cmd, len, ..] => (*start, *cmd, *len),
        _ => {
            return Err(ResponseError::Truncated {
                expected_at_least: OUTBOUND_HEADER_SIZE + 1,
                found: data.len(),
            });
        }
    };
    if start != OUTBOUND_START {
        return Err(ResponseError::MissingStart { found: start });
    }
    if cmd != command {
        return Err(ResponseError::WrongMessageKind {
            expected: command,
            found: cmd,
        });
    }
    if len != length {
        return Err(ResponseError::LengthMismatch {
            expected: length,
            found: len,
        });
    }
    let size = OUTBOUND_HEADER_SIZE + len as usize + 1;
    let frame = data.get(..size).ok_or(ResponseError::Truncated {
        expected_at_least: size,
        found: data.len(),
    })?;
    verify(Direction::Outbound, frame)?;
    Ok(&frame[OUTBOUND_HEADER_SIZE..size - 1])
}

/// Same as [`outbound_payload`] for a device frame.
fn inbound_payload(data: &[u8], command: u8, length: u8) -> Result<&[u8], ResponseError> {
    let header = match (data, FrameHeader::parse(data)) {
        ([START, FILL, ..], Some(header)) => header,
        ([START, FILL, ..], None) | ([], _) | ([START], _) => {
            return Err(ResponseError::Truncated {
                expected_at_least: FrameHeader::size() + 1,
                found: data.len(),
            });
        }
        ([START, found, ..], _) | ([found, ..], _) => {
            return Err(ResponseError::MissingStart { found: *found });
        }
    };
    if header.command != command {
        return Err(ResponseError::WrongMessageKind {
            expected: command,
            found: header.command,
        });
    }
    if header.length != length {
        return Err(ResponseError::LengthMismatch {
            expected: length,
            found: header.length,
        });
    }
    let size = header.frame_size();
    let frame = data.get(..size).ok_or(ResponseError::Truncated {
        expected_at_least: size,
        found: data.len(),
    })?;
    verify(Direction::Inbound, frame)?;
    Ok(&frame[FrameHeader::size()..size - 1])
}

fn verify(direction: Direction, frame: &[u8]) -> Result<(), ResponseError> {
    let (found, body) = frame.split_last().ok_or(ResponseError::Truncated {
        expected_at_least: frame.len() + 1,
        found: frame.len(),
    })?;
    let calculated = checksum::compute(direction, body);
    if calculated != *found {
        return Err(ResponseError::ChecksumMismatch {
            calculated,
            found: *found,
        });
    }
    Ok(())
}

/// Build a device frame `5C 00 MODBUS40 CMD LEN PAYLOAD.. CSUM` into `buffer`.
fn device_frame(command: u8, payload: &[u8], buffer: &mut [u8]) -> Result<usize, RequestError> {
    let size = FrameHeader::size() + payload.len() + 1;
    if buffer.len() < size {
        return Err(RequestError::EncodeBufferTooSmall {
            expected: size,
            found: buffer.len(),
        });
    }
    buffer[..FrameHeader::size()].copy_from_slice(&[
        START,
        FILL,
        ADDR_MODBUS40,
        command,
        payload.len() as u8,
    ]);
    buffer[FrameHeader::size()..size - 1].copy_from_slice(payload);
    buffer[size - 1] = checksum::compute(Direction::Inbound, &buffer[..size - 1]);
    Ok(size)
}

/// Ask for the current value of one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    address: u16,
}

impl ReadRequest {
    pub fn new(address: u32) -> Result<ReadRequest, RequestError> {
        Ok(ReadRequest {
            address: register_address(address)?,
        })
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn frame(&self) -> Result<OutboundFrame, RequestError> {
        OutboundFrame::new(CMD_MODBUS_READ_REQ, &self.address.to_le_bytes())
    }
}

impl Encode for ReadRequest {
    type Error = RequestError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        copy_out(self.frame()?.as_slice(), buffer)
    }
}

impl<'a> Decode<'a> for ReadRequest {
    type Error = ResponseError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let p = outbound_payload(data, CMD_MODBUS_READ_REQ, READ_REQUEST_LEN)?;
        Ok(ReadRequest {
            address: u16::from_le_bytes([p[0], p[1]]),
        })
    }
}

/// Store a value in one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRequest {
    address: u16,
    value: i32,
}

impl WriteRequest {
    pub fn new(address: u32, value: i32) -> Result<WriteRequest, RequestError> {
        Ok(WriteRequest {
            address: register_address(address)?,
            value,
        })
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn frame(&self) -> Result<OutboundFrame, RequestError> {
        let mut payload = [0; WRITE_REQUEST_LEN as usize];
        payload[..2].copy_from_slice(&self.address.to_le_bytes());
        payload[2..].copy_from_slice(&self.value.to_le_bytes());
        OutboundFrame::new(CMD_MODBUS_WRITE_REQ, &payload)
    }
}

impl Encode for WriteRequest {
    type Error = RequestError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        copy_out(self.frame()?.as_slice(), buffer)
    }
}

impl<'a> Decode<'a> for WriteRequest {
    type Error = ResponseError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let p = outbound_payload(data, CMD_MODBUS_WRITE_REQ, WRITE_REQUEST_LEN)?;
        Ok(WriteRequest {
            address: u16::from_le_bytes([p[0], p[1]]),
            value: i32::from_le_bytes([p[2], p[3], p[4], p[5]]),
        })
    }
}

/// The heat pump's answer to a [`ReadRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResponse {
    pub address: u16,
    pub value: i32,
}

impl ReadResponse {
    pub fn new(address: u32, value: i32) -> Result<ReadResponse, RequestError> {
        Ok(ReadResponse {
            address: register_address(address)?,
            value,
        })
    }

    /// True if this response answers `request`.
    pub fn answers(&self, request: &ReadRequest) -> bool {
        self.address == request.address
    }
}

impl Encode for ReadResponse {
    type Error = RequestError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let mut payload = [0; READ_RESPONSE_LEN as usize];
        payload[..2].copy_from_slice(&self.address.to_le_bytes());
        payload[2..].copy_from_slice(&self.value.to_be_bytes());
        device_frame(CMD_MODBUS_READ_RESP, &payload, buffer)
    }
}

impl<'a> Decode<'a> for ReadResponse {
    type Error = ResponseError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let p = inbound_payload(data, CMD_MODBUS_READ_RESP, READ_RESPONSE_LEN)?;
        Ok(ReadResponse {
            address: u16::from_le_bytes([p[0], p[1]]),
            value: i32::from_be_bytes([p[2], p[3], p[4], p[5]]),
        })
    }
}

/// The heat pump's answer to a [`WriteRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResponse {
    pub success: bool,
}

impl Encode for WriteResponse {
    type Error = RequestError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        device_frame(CMD_MODBUS_WRITE_RESP, &[self.success as u8], buffer)
    }
}

impl<'a> Decode<'a> for WriteResponse {
    type Error = ResponseError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let p = inbound_payload(data, CMD_MODBUS_WRITE_RESP, WRITE_RESPONSE_LEN)?;
        Ok(WriteResponse { success: p[0] == 1 })
    }
}

use core::ops::Range;

use crate::{
    Encode,
    checksum,
    error::RequestError,
    protocol::{
        Direction, DeviceAddress, FrameKind, INBOUND_HEADER_SIZE, MAX_OUTBOUND_FRAME_SIZE,
        MAX_PAYLOAD_SIZE, OUTBOUND_HEADER_SIZE, OUTBOUND_START,
    },
};

/// ADDR, CMD and LEN of an inbound frame, captured once the marker and the
/// three bytes after it are buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub address: u8,
    pub command: u8,
    pub length: u8,
}

impl FrameHeader {
    pub const fn size() -> usize {
        INBOUND_HEADER_SIZE
    }

    /// Parse from a slice starting at the START byte. Marker bytes are not
    /// checked here.
    pub fn parse(data: &[u8]) -> Option<FrameHeader> {
        match data {
            [_, _, address, command, length, ..] => Some(FrameHeader {
                address: *address,
                command: *command,
                length: *length,
            }),
            _ => None,
        }
    }

    /// Size of the whole frame this header announces, marker and checksum
    /// included.
    pub fn frame_size(&self) -> usize {
        FrameHeader::size() + self.length as usize + 1
    }
}

/// A validated device frame, borrowed from the decoder's stream buffer for
/// the duration of a callback.
#[derive(Debug, Clone, Copy)]
pub struct InboundFrame<'a> {
    header: FrameHeader,
    kind: FrameKind,
    raw: &'a [u8],
}

impl<'a> InboundFrame<'a> {
    pub(crate) fn new(header: FrameHeader, kind: FrameKind, raw: &'a [u8]) -> InboundFrame<'a> {
        InboundFrame { header, kind, raw }
    }

    /// Every byte of the frame exactly as received.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn header(&self) -> FrameHeader {
        self.header
    }

    pub fn address(&self) -> u8 {
        self.header.address
    }

    pub fn device(&self) -> DeviceAddress {
        DeviceAddress::from(self.header.address)
    }

    pub fn command(&self) -> u8 {
        self.header.command
    }

    pub fn length(&self) -> u8 {
        self.header.length
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    fn payload_indices(&self) -> Range<usize> {
        FrameHeader::size()..FrameHeader::size() + self.header.length as usize
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.raw[self.payload_indices()]
    }

    pub fn checksum(&self) -> u8 {
        self.raw[self.raw.len() - 1]
    }
}

pub type FrameBytes = heapless::Vec<u8, MAX_OUTBOUND_FRAME_SIZE>;

/// A controller frame, `C0 CMD LEN PAYLOAD.. CSUM`, ready to transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    bytes: FrameBytes,
}

impl OutboundFrame {
    pub fn new(command: u8, payload: &[u8]) -> Result<OutboundFrame, RequestError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RequestError::PayloadTooLarge(payload.len()));
        }
        let too_large = |_| RequestError::PayloadTooLarge(payload.len());
        let mut bytes = FrameBytes::new();
        // START': 1, CMD: 1, LEN: 1, PAYLOAD: len, CSUM: 1
        // |-----------------DIGEST-------------|
        bytes
            .extend_from_slice(&[OUTBOUND_START, command, payload.len() as u8])
            .map_err(too_large)?;
        bytes.extend_from_slice(payload).map_err(too_large)?;
        let csum = checksum::compute(Direction::Outbound, &bytes);
        bytes.push(csum).map_err(|_| RequestError::PayloadTooLarge(payload.len()))?;
        Ok(OutboundFrame { bytes })
    }

    pub fn command(&self) -> u8 {
        self.bytes[1]
    }

    pub fn length(&self) -> u8 {
        self.bytes[2]
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[OUTBOUND_HEADER_SIZE..self.bytes.len() - 1]
    }

    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for OutboundFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl Encode for OutboundFrame {
    type Error = RequestError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        if buffer.len() < self.size() {
            return Err(RequestError::EncodeBufferTooSmall {
                expected: self.size(),
                found: buffer.len(),
            });
        }
        buffer[..self.size()].copy_from_slice(&self.bytes);
        Ok(self.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_announces_frame_size() {
        let h = FrameHeader::parse(&[0x5C, 0x00, 0x19, 0x62, 0x18]).unwrap();
        assert_eq!(h.address, 0x19);
        assert_eq!(h.command, 0x62);
        assert_eq!(h.frame_size(), 30);
        assert!(FrameHeader::parse(&[0x5C, 0x00, 0x19, 0x62]).is_none());
    }

    #[test]
    fn outbound_frame_layout() {
        let f = OutboundFrame::new(0x69, &[0x39, 0x9C]).unwrap();
        assert_eq!(f.as_slice(), &[0xC0, 0x69, 0x02, 0x39, 0x9C, 0x0E]);
        assert_eq!(f.command(), 0x69);
        assert_eq!(f.length(), 2);
        assert_eq!(f.payload(), &[0x39, 0x9C]);
        assert_eq!(f.checksum(), 0x0E);
    }

    #[test]
    fn oversized_payload_is_refused() {
        let payload = [0u8; 256];
        assert_eq!(
            OutboundFrame::new(0x69, &payload),
            Err(RequestError::PayloadTooLarge(256))
        );
        assert!(OutboundFrame::new(0x69, &payload[..255]).is_ok());
    }

    #[test]
    fn encode_checks_buffer_size() {
        let f = OutboundFrame::new(0x69, &[0x39, 0x9C]).unwrap();
        let mut small = [0u8; 4];
        assert_eq!(
            f.encode(&mut small),
            Err(RequestError::EncodeBufferTooSmall { expected: 6, found: 4 })
        );
        let mut buf = [0u8; 8];
        assert_eq!(f.encode(&mut buf), Ok(6));
        assert_eq!(&buf[..6], f.as_slice());
    }

    #[test]
    fn inbound_view_splits_fields() {
        let raw = [0x5C, 0x00, 0x20, 0x99, 0x02, 0x01, 0x02, 0xB8];
        let header = FrameHeader::parse(&raw).unwrap();
        let f = InboundFrame::new(header, FrameKind::Unrecognized, &raw);
        assert_eq!(f.payload(), &[0x01, 0x02]);
        assert_eq!(f.checksum(), 0xB8);
        assert_eq!(f.device(), DeviceAddress::Modbus40);
        assert_eq!(f.raw(), &raw);
    }
}

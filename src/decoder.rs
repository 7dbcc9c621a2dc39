//! Byte stream to frame decoder for one serial link.
//!
//! The decoder is a small state machine driven by whoever owns the transport:
//!
//! ```text
//! Scanning -> HeaderCaptured -> CandidateReady -> (dispatch | NAK) -> Scanning
//! ```
//!
//! Bytes that cannot start a frame are dropped silently. Once a header has
//! been captured the declared length is trusted, both to wait for the rest of
//! the frame and to skip it when its checksum fails. Payload bytes are never
//! rescanned for a start marker.

use log::{debug, trace, warn};

use crate::{
    buffer::StreamBuffer,
    checksum,
    config::DecoderConfig,
    frame::{FrameHeader, InboundFrame},
    protocol::{Direction, FILL, FrameKind, MAX_INBOUND_FRAME_SIZE, START},
};

/// Side effects of decoding, supplied by the surrounding integration.
pub trait LinkContext {
    /// A validated, non-poll frame. Called after [`send_ack`](Self::send_ack).
    fn frame_received(&mut self, frame: InboundFrame<'_>);

    /// The device is ready to take a write request. No ACK has been sent.
    fn write_poll_received(&mut self);

    /// The device is ready to take a read request. No ACK has been sent.
    fn read_poll_received(&mut self);

    fn send_ack(&mut self);

    fn send_nak(&mut self);
}

impl<C: LinkContext + ?Sized> LinkContext for &mut C {
    fn frame_received(&mut self, frame: InboundFrame<'_>) {
        (**self).frame_received(frame)
    }

    fn write_poll_received(&mut self) {
        (**self).write_poll_received()
    }

    fn read_poll_received(&mut self) {
        (**self).read_poll_received()
    }

    fn send_ack(&mut self) {
        (**self).send_ack()
    }

    fn send_nak(&mut self) {
        (**self).send_nak()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No start marker found yet.
    Scanning,
    /// ADDR, CMD and LEN known, waiting for payload and checksum.
    HeaderCaptured(FrameHeader),
    /// The full candidate is buffered and will be validated next step.
    CandidateReady(FrameHeader),
}

/// Outcome of a single [`Decoder::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Dropped this many bytes that could not start a frame.
    Skipped(usize),
    HeaderCaptured,
    CandidateReady,
    Dispatched(FrameKind),
    /// Checksum failed, the declared span was discarded and NAKed.
    Rejected,
    /// Nothing more can happen until more bytes are fed.
    NeedMoreData,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub frames_delivered: u64,
    pub acks: u64,
    pub naks: u64,
    pub write_polls: u64,
    pub read_polls: u64,
    pub garbage_bytes: u64,
}

#[derive(Debug)]
pub struct Decoder {
    buffer: StreamBuffer,
    state: DecoderState,
    config: DecoderConfig,
    stats: LinkStats,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new(DecoderConfig::default())
    }
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Decoder {
        Decoder {
            buffer: StreamBuffer::with_capacity(MAX_INBOUND_FRAME_SIZE),
            state: DecoderState::Scanning,
            config,
            stats: LinkStats::default(),
        }
    }

    /// Append bytes read from the transport.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.append(data);
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = LinkStats::default();
    }

    /// Number of buffered bytes not yet dispatched or skipped.
    pub fn buffered(&self) -> usize {
        self.buffer.remaining()
    }

    /// Drop everything buffered and go back to scanning.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Scanning;
    }

    /// Step until no further progress is possible with the buffered bytes.
    /// Returns the number of frames that passed validation.
    pub fn process<C: LinkContext + ?Sized>(&mut self, ctx: &mut C) -> usize {
        let mut dispatched = 0;
        loop {
            match self.step(ctx) {
                Progress::NeedMoreData => return dispatched,
                Progress::Dispatched(_) => dispatched += 1,
                _ => {}
            }
        }
    }

    /// Advance the state machine by one transition.
    pub fn step<C: LinkContext + ?Sized>(&mut self, ctx: &mut C) -> Progress {
        match self.state {
            DecoderState::Scanning => self.scan(),
            DecoderState::HeaderCaptured(header) => self.assemble(header),
            DecoderState::CandidateReady(header) => self.dispatch(header, ctx),
        }
    }

    fn scan(&mut self) -> Progress {
        match (self.buffer.peek_at(0), self.buffer.peek_at(1)) {
            (None, _) | (Some(START), None) => Progress::NeedMoreData,
            (Some(START), Some(FILL)) => {
                // A partial header stays at the cursor until the rest arrives
                match self.buffer.peek(FrameHeader::size()).and_then(FrameHeader::parse) {
                    Some(header) => {
                        trace!(
                            "header addr=0x{:02X} cmd=0x{:02X} len={}",
                            header.address, header.command, header.length
                        );
                        self.state = DecoderState::HeaderCaptured(header);
                        Progress::HeaderCaptured
                    }
                    None => Progress::NeedMoreData,
                }
            }
            (Some(START), Some(_)) => self.skip(1),
            (Some(_), _) => {
                // Drop the whole run up to the next candidate start byte
                let run = self
                    .buffer
                    .slice()
                    .iter()
                    .position(|b| *b == START)
                    .unwrap_or(self.buffer.remaining());
                self.skip(run)
            }
        }
    }

    fn skip(&mut self, amount: usize) -> Progress {
        trace!("skipping {} garbage byte(s)", amount);
        self.stats.garbage_bytes += amount as u64;
        self.buffer.consume(amount);
        self.maybe_compact();
        Progress::Skipped(amount)
    }

    fn assemble(&mut self, header: FrameHeader) -> Progress {
        if self.buffer.remaining() < header.frame_size() {
            return Progress::NeedMoreData;
        }
        self.state = DecoderState::CandidateReady(header);
        Progress::CandidateReady
    }

    fn dispatch<C: LinkContext + ?Sized>(&mut self, header: FrameHeader, ctx: &mut C) -> Progress {
        let size = header.frame_size();
        let Some(candidate) = self.buffer.peek(size) else {
            self.state = DecoderState::HeaderCaptured(header);
            return Progress::NeedMoreData;
        };

        let progress = if checksum::is_valid(Direction::Inbound, candidate) {
            let kind = FrameKind::classify(header.address, header.command, self.config.poll_address);
            match kind {
                FrameKind::WritePoll => {
                    debug!("write poll from 0x{:02X}", header.address);
                    self.stats.write_polls += 1;
                    ctx.write_poll_received();
                }
                FrameKind::ReadPoll => {
                    debug!("read poll from 0x{:02X}", header.address);
                    self.stats.read_polls += 1;
                    ctx.read_poll_received();
                }
                FrameKind::Telemetry | FrameKind::Unrecognized => {
                    debug!(
                        "{:?} frame addr=0x{:02X} cmd=0x{:02X} len={}",
                        kind, header.address, header.command, header.length
                    );
                    self.stats.acks += 1;
                    ctx.send_ack();
                    self.stats.frames_delivered += 1;
                    ctx.frame_received(InboundFrame::new(header, kind, candidate));
                }
            }
            Progress::Dispatched(kind)
        } else {
            if let Some((calculated, found)) = checksum::pair(Direction::Inbound, candidate) {
                warn!(
                    "checksum mismatch addr=0x{:02X} cmd=0x{:02X}: calculated 0x{:02X}, found 0x{:02X}",
                    header.address, header.command, calculated, found
                );
            }
            self.stats.naks += 1;
            ctx.send_nak();
            Progress::Rejected
        };

        self.buffer.consume(size);
        self.state = DecoderState::Scanning;
        self.maybe_compact();
        progress
    }

    fn maybe_compact(&mut self) {
        if self.buffer.consumed() >= self.config.compact_threshold {
            self.buffer.compact();
        }
    }
}

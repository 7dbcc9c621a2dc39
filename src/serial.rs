use embedded_hal_nb::serial::{Error, ErrorType, Read, Write};
use heapless::Deque;
use log::{debug, trace, warn};

use crate::{
    config::LinkConfig,
    decoder::{Decoder, LinkContext, LinkStats},
    error::LinkError,
    frame::{InboundFrame, OutboundFrame},
    protocol::{ACK, MAX_OUTBOUND_FRAME_SIZE, NAK},
    request::{ReadRequest, WriteRequest},
};

/// Requests of each kind that may wait for a poll.
pub const REQUEST_QUEUE_DEPTH: usize = 8;
/// Bytes the transmitter may hold while `Tx` is blocked.
pub const TX_QUEUE_DEPTH: usize = 2 * MAX_OUTBOUND_FRAME_SIZE;
/// Bytes moved from the receiver into the decoder at a time.
const RX_CHUNK: usize = 64;

pub type RequestQueue = Deque<OutboundFrame, REQUEST_QUEUE_DEPTH>;

/// Failure of the buffered transmitter.
#[derive(Debug)]
pub enum TxError<E> {
    /// `Tx` itself failed.
    Serial(E),
    /// Not enough room left in the transmit queue.
    QueueFull,
}

impl<E: Error> embedded_io::Error for TxError<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_hal_nb::serial::ErrorKind::*;
        match self {
            TxError::QueueFull => embedded_io::ErrorKind::OutOfMemory,
            TxError::Serial(e) => match e.kind() {
                Overrun => embedded_io::ErrorKind::OutOfMemory,
                FrameFormat => embedded_io::ErrorKind::InvalidData,
                Parity => embedded_io::ErrorKind::InvalidData,
                _ => embedded_io::ErrorKind::Other,
            },
        }
    }
}

impl<E: Error> From<E> for TxError<E> {
    fn from(value: E) -> Self {
        TxError::Serial(value)
    }
}

/// Transmit side that queues bytes and drains them into `Tx` on flush.
#[derive(Debug)]
pub struct BufferedTx<Tx: Write> {
    tx: Tx,
    buf: Deque<u8, TX_QUEUE_DEPTH>,
}

impl<Tx: Write> BufferedTx<Tx> {
    pub fn new(tx: Tx) -> BufferedTx<Tx> {
        BufferedTx {
            tx,
            buf: Deque::new(),
        }
    }

    /// Queue all of `data` for the next flush, or none of it.
    pub fn queue(&mut self, data: &[u8]) -> Result<(), TxError<Tx::Error>> {
        if data.len() > self.free() {
            return Err(TxError::QueueFull);
        }
        for &b in data {
            self.buf.push_back(b).map_err(|_| TxError::QueueFull)?;
        }
        Ok(())
    }

    /// Bytes queued but not yet accepted by `Tx`.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn free(&self) -> usize {
        TX_QUEUE_DEPTH - self.buf.len()
    }

    pub fn inner(&self) -> &Tx {
        &self.tx
    }

    pub fn inner_mut(&mut self) -> &mut Tx {
        &mut self.tx
    }

    pub fn release(self) -> Tx {
        self.tx
    }
}

impl<Tx: Write> ErrorType for BufferedTx<Tx> {
    type Error = Tx::Error;
}

impl<Tx: Write> Write for BufferedTx<Tx> {
    fn write(&mut self, word: u8) -> nb::Result<(), Tx::Error> {
        self.buf.push_back(word).map_err(|_| nb::Error::WouldBlock)
    }

    fn flush(&mut self) -> nb::Result<(), Tx::Error> {
        while let Some(x) = self.buf.front().copied() {
            // A byte only leaves the queue once Tx has accepted it
            self.tx.write(x)?;
            self.buf.pop_front();
        }
        self.tx.flush()
    }
}

impl<Tx: Write> embedded_io::ErrorType for BufferedTx<Tx> {
    type Error = TxError<Tx::Error>;
}

/// Never blocks: bytes `Tx` cannot take yet stay queued for a later flush.
impl<Tx: Write> embedded_io::Write for BufferedTx<Tx> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, TxError<Tx::Error>> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.free() == 0 {
            embedded_io::Write::flush(self)?;
        }
        let n = buf.len().min(self.free());
        if n == 0 {
            return Err(TxError::QueueFull);
        }
        self.queue(&buf[..n])?;
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), TxError<Tx::Error>> {
        match Write::flush(self) {
            Ok(()) | Err(nb::Error::WouldBlock) => Ok(()),
            Err(nb::Error::Other(e)) => Err(TxError::Serial(e)),
        }
    }
}

/// Receives every validated frame that is not a poll.
pub trait FrameSink {
    fn frame_received(&mut self, frame: InboundFrame<'_>);
}

impl<F> FrameSink for F
where
    F: FnMut(InboundFrame<'_>),
{
    fn frame_received(&mut self, frame: InboundFrame<'_>) {
        (*self)(frame)
    }
}

/// Answers the decoder's callbacks on the wire.
struct Responder<'a, Tx: Write, S: FrameSink + ?Sized> {
    tx: &'a mut BufferedTx<Tx>,
    reads: &'a mut RequestQueue,
    writes: &'a mut RequestQueue,
    sink: &'a mut S,
    ack_idle_polls: bool,
}

impl<Tx: Write, S: FrameSink + ?Sized> Responder<'_, Tx, S> {
    fn reply(&mut self, byte: u8) {
        if self.tx.queue(&[byte]).is_err() {
            warn!("transmit queue full, dropping reply 0x{:02X}", byte);
        }
    }
}

/// Send the request at the front of `queue`, leaving it queued if the
/// transmitter has no room for it.
fn answer_poll<Tx: Write>(
    tx: &mut BufferedTx<Tx>,
    queue: &mut RequestQueue,
    ack_idle_polls: bool,
    kind: &str,
) {
    match queue.front() {
        Some(frame) => {
            let size = frame.size();
            if tx.queue(frame.as_slice()).is_ok() {
                debug!("sending {} request, {} byte(s)", kind, size);
                queue.pop_front();
            } else {
                warn!("transmit queue full, {} request stays queued", kind);
            }
        }
        None if ack_idle_polls => {
            trace!("nothing to {}, acknowledging poll", kind);
            if tx.queue(&[ACK]).is_err() {
                warn!("transmit queue full, dropping poll ACK");
            }
        }
        None => {}
    }
}

impl<Tx: Write, S: FrameSink + ?Sized> LinkContext for Responder<'_, Tx, S> {
    fn frame_received(&mut self, frame: InboundFrame<'_>) {
        self.sink.frame_received(frame);
    }

    fn write_poll_received(&mut self) {
        answer_poll(self.tx, self.writes, self.ack_idle_polls, "write");
    }

    fn read_poll_received(&mut self) {
        answer_poll(self.tx, self.reads, self.ack_idle_polls, "read");
    }

    fn send_ack(&mut self) {
        self.reply(ACK);
    }

    fn send_nak(&mut self) {
        self.reply(NAK);
    }
}

/// A decoder wired to a serial port, answering polls from two request queues.
pub struct SerialLink<Tx: Write, Rx: Read> {
    tx: BufferedTx<Tx>,
    rx: Rx,
    decoder: Decoder,
    reads: RequestQueue,
    writes: RequestQueue,
    config: LinkConfig,
}

impl<Tx: Write, Rx: Read> SerialLink<Tx, Rx> {
    pub fn new(tx: Tx, rx: Rx) -> SerialLink<Tx, Rx> {
        SerialLink::with_config(tx, rx, LinkConfig::default())
    }

    pub fn with_config(tx: Tx, rx: Rx, config: LinkConfig) -> SerialLink<Tx, Rx> {
        SerialLink {
            tx: BufferedTx::new(tx),
            rx,
            decoder: Decoder::new(config.decoder),
            reads: RequestQueue::new(),
            writes: RequestQueue::new(),
            config,
        }
    }

    /// Queue a read of `address`, sent on the next read poll.
    pub fn queue_read(&mut self, address: u32) -> Result<(), LinkError<Tx::Error, Rx::Error>> {
        let frame = ReadRequest::new(address)?.frame()?;
        self.reads.push_back(frame).map_err(|_| LinkError::QueueFull)?;
        debug!("queued read of register {}", address);
        Ok(())
    }

    /// Queue a write of `value` to `address`, sent on the next write poll.
    pub fn queue_write(
        &mut self,
        address: u32,
        value: i32,
    ) -> Result<(), LinkError<Tx::Error, Rx::Error>> {
        let frame = WriteRequest::new(address, value)?.frame()?;
        self.writes.push_back(frame).map_err(|_| LinkError::QueueFull)?;
        debug!("queued write of {} to register {}", value, address);
        Ok(())
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Bytes waiting for the transmitter.
    pub fn pending_transmit(&self) -> usize {
        self.tx.pending()
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn stats(&self) -> LinkStats {
        self.decoder.stats()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn transmitter(&self) -> &Tx {
        self.tx.inner()
    }

    pub fn transmitter_mut(&mut self) -> &mut Tx {
        self.tx.inner_mut()
    }

    pub fn receiver_mut(&mut self) -> &mut Rx {
        &mut self.rx
    }

    /// Queue `data` ahead of any later reply and try to send it right away.
    ///
    /// Never blocks. Whatever `Tx` cannot take yet goes out on the next
    /// [`poll`](Self::poll) or [`flush`](Self::flush). Fails without queuing
    /// anything when the transmit queue has no room for all of `data`.
    pub fn transmit(&mut self, data: &[u8]) -> Result<(), LinkError<Tx::Error, Rx::Error>> {
        let tx_err = |e: TxError<Tx::Error>| -> LinkError<Tx::Error, Rx::Error> {
            match e {
                TxError::Serial(e) => LinkError::Write(e),
                TxError::QueueFull => LinkError::TransmitQueueFull,
            }
        };
        if data.len() > self.tx.free() {
            embedded_io::Write::flush(&mut self.tx).map_err(tx_err)?;
        }
        if data.len() > self.tx.free() {
            return Err(LinkError::TransmitQueueFull);
        }
        embedded_io::Write::write_all(&mut self.tx, data)
            .and_then(|_| embedded_io::Write::flush(&mut self.tx))
            .map_err(tx_err)
    }

    /// Drain the receiver, decode whatever arrived and answer on the wire.
    ///
    /// Returns the number of frames, polls included, that passed validation.
    /// Replies the transmitter could not take yet stay queued for the next
    /// poll or [`flush`](Self::flush).
    pub fn poll<S: FrameSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<usize, LinkError<Tx::Error, Rx::Error>> {
        let fill = self.fill();
        let mut responder = Responder {
            tx: &mut self.tx,
            reads: &mut self.reads,
            writes: &mut self.writes,
            sink,
            ack_idle_polls: self.config.ack_idle_polls,
        };
        // Bytes read before a receive error are still decoded
        let frames = self.decoder.process(&mut responder);
        let flushed = self.flush();
        fill.map_err(LinkError::Read)?;
        match flushed {
            Ok(()) | Err(nb::Error::WouldBlock) => Ok(frames),
            Err(nb::Error::Other(e)) => Err(e),
        }
    }

    pub fn flush(&mut self) -> nb::Result<(), LinkError<Tx::Error, Rx::Error>> {
        Write::flush(&mut self.tx).map_err(|e| e.map(LinkError::Write))
    }

    fn fill(&mut self) -> Result<usize, Rx::Error> {
        let mut chunk = heapless::Vec::<u8, RX_CHUNK>::new();
        let mut total = 0;
        let result = loop {
            match self.rx.read() {
                Ok(b) => {
                    let _ = chunk.push(b);
                    if chunk.is_full() {
                        self.decoder.feed(&chunk);
                        total += chunk.len();
                        chunk.clear();
                    }
                }
                Err(nb::Error::WouldBlock) => break Ok(()),
                Err(nb::Error::Other(e)) => break Err(e),
            }
        };
        self.decoder.feed(&chunk);
        total += chunk.len();
        if total > 0 {
            trace!("received {} byte(s)", total);
        }
        result.map(|_| total)
    }

    pub fn release(self) -> (Tx, Rx) {
        (self.tx.release(), self.rx)
    }
}

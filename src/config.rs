use crate::protocol::ADDR_MODBUS40;

/// Default number of consumed bytes tolerated before the stream buffer is
/// compacted.
pub const DEFAULT_COMPACT_THRESHOLD: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Address whose read/write request commands are treated as polls.
    pub poll_address: u8,
    pub compact_threshold: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            poll_address: ADDR_MODBUS40,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }
}

impl DecoderConfig {
    pub fn with_poll_address(mut self, address: u8) -> Self {
        self.poll_address = address;
        self
    }

    pub fn with_compact_threshold(mut self, threshold: usize) -> Self {
        self.compact_threshold = threshold;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    pub decoder: DecoderConfig,
    /// Answer a poll with a bare ACK when nothing of that kind is queued.
    pub ack_idle_polls: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            decoder: DecoderConfig::default(),
            ack_idle_polls: true,
        }
    }
}

impl LinkConfig {
    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_ack_idle_polls(mut self, ack: bool) -> Self {
        self.ack_idle_polls = ack;
        self
    }
}

use alloc::vec::Vec;

/// Growable byte arena with a read cursor.
///
/// Bytes before the cursor have either been dispatched or skipped and are
/// never looked at again. Bytes after it survive between transport reads until
/// the decoder consumes them.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    buf: Vec<u8>,
    cursor: usize,
}

impl StreamBuffer {
    pub fn new() -> StreamBuffer {
        StreamBuffer::default()
    }

    pub fn with_capacity(capacity: usize) -> StreamBuffer {
        StreamBuffer {
            buf: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Unconsumed bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes already consumed but still physically held.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    pub fn slice(&self) -> &[u8] {
        &self.buf[self.cursor..]
    }

    /// Byte at `offset` past the cursor.
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.slice().get(offset).copied()
    }

    /// The next `amount` unconsumed bytes, or `None` if not all of them
    /// have arrived yet.
    pub fn peek(&self, amount: usize) -> Option<&[u8]> {
        self.slice().get(..amount)
    }

    /// Advance the cursor by `amount`, clamped to what is buffered.
    pub fn consume(&mut self, amount: usize) {
        self.cursor = (self.cursor + amount).min(self.buf.len());
        if self.cursor == self.buf.len() {
            // Nothing left to keep, reuse the allocation from the start
            self.buf.clear();
            self.cursor = 0;
        }
    }

    /// Move the unconsumed tail to the front of the arena.
    pub fn compact(&mut self) {
        if self.cursor > 0 {
            self.buf.drain(..self.cursor);
            self.cursor = 0;
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_waits_for_all_bytes() {
        let mut b = StreamBuffer::new();
        b.append(&[1, 2, 3]);
        assert_eq!(b.peek(3), Some(&[1u8, 2, 3][..]));
        assert_eq!(b.peek(4), None);
        b.append(&[4]);
        assert_eq!(b.peek(4), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn consume_and_compact_keep_tail() {
        let mut b = StreamBuffer::new();
        b.append(&[1, 2, 3, 4, 5]);
        b.consume(2);
        assert_eq!(b.remaining(), 3);
        assert_eq!(b.consumed(), 2);
        assert_eq!(b.peek_at(0), Some(3));
        b.compact();
        assert_eq!(b.consumed(), 0);
        assert_eq!(b.slice(), &[3, 4, 5]);
    }

    #[test]
    fn consuming_everything_resets() {
        let mut b = StreamBuffer::with_capacity(8);
        b.append(&[9, 9]);
        b.consume(10);
        assert!(b.is_empty());
        assert_eq!(b.consumed(), 0);
        b.append(&[7]);
        assert_eq!(b.slice(), &[7]);
    }
}

use crate::source::{ChunkSource, Exhausted};
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::VecDeque;

/// A cursor over the logical concatenation of every chunk it has been given.
///
/// Chunks are queued as they arrive and released as soon as they have been read past. When the
/// queue runs dry the buffer asks its [`ChunkSource`] for exactly one more chunk and blocks until
/// it gets one, or until the source reports the end of input. The current byte is `None` while no
/// data is available.
///
/// The read position only moves forward: a byte that has been advanced past is never offered
/// again.
#[derive(Debug)]
pub struct StreamBuffer<S = Exhausted> {
    chunks: VecDeque<Bytes>,
    idx: usize,
    ch: Option<u8>,
    prev: Option<u8>,
    pos: u64,
    consumed: usize,
    source_done: bool,
    source: S,
    capture: Option<BytesMut>,
}

impl StreamBuffer<Exhausted> {
    /// Creates a buffer that only reads injected chunks.
    pub fn new() -> Self {
        StreamBuffer::with_source(Exhausted)
    }
}

impl Default for StreamBuffer<Exhausted> {
    fn default() -> Self {
        StreamBuffer::new()
    }
}

impl<S: ChunkSource> StreamBuffer<S> {
    /// Creates a buffer pulling chunks from `source` whenever it runs out.
    pub fn with_source(source: S) -> Self {
        StreamBuffer {
            chunks: VecDeque::new(),
            idx: 0,
            ch: None,
            prev: None,
            pos: 0,
            consumed: 0,
            source_done: false,
            source,
            capture: None,
        }
    }

    /// Appends chunks to the end of the stream.
    ///
    /// If no byte was available, the first byte of the new data becomes the current one.
    pub fn inject<I, B>(&mut self, chunks: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.chunks.extend(chunks.into_iter().map(Into::into));

        if self.ch.is_none() {
            self.load_queued();
        }
    }

    /// The byte at the read position, or `None` if no data is available.
    #[inline]
    pub fn current(&self) -> Option<u8> {
        self.ch
    }

    /// The byte consumed just before the current one.
    #[inline]
    pub(crate) fn previous(&self) -> Option<u8> {
        self.prev
    }

    /// Absolute offset of the current byte in the logical stream.
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Number of chunks read to their end so far.
    pub fn chunks_consumed(&self) -> usize {
        self.consumed
    }

    /// Whether the source has reported the end of input and every queued byte has been read.
    pub fn is_eof(&self) -> bool {
        self.ch.is_none() && self.source_done
    }

    /// Makes sure a current byte is loaded if one can be obtained.
    pub fn prime(&mut self) -> crate::Result<()> {
        if self.ch.is_none() {
            self.load()?;
        }
        Ok(())
    }

    /// Moves the read position forward by one byte.
    ///
    /// If the current chunk is exhausted, moves on to the next queued chunk, pulling one from the
    /// source if none is queued. Without a current byte this only tries to obtain one.
    pub fn advance(&mut self) -> crate::Result<()> {
        let ch = match self.ch {
            Some(ch) => ch,
            None => return self.load(),
        };

        if let Some(capture) = self.capture.as_mut() {
            capture.put_u8(ch);
        }

        self.prev = Some(ch);
        self.pos += 1;
        self.idx += 1;

        if let Some(chunk) = self.chunks.front() {
            if self.idx < chunk.len() {
                self.ch = Some(chunk[self.idx]);
                return Ok(());
            }
        }

        self.pop_chunk();
        self.load()
    }

    /// Moves forward until the current byte is `needle`, or to the end of input.
    ///
    /// Whole chunk slices are searched at once, so long stretches without `needle` cost little.
    pub fn skip_until(&mut self, needle: u8) -> crate::Result<()> {
        self.skip_to(|rest| memchr::memchr(needle, rest))
    }

    /// Like [`skip_until`](Self::skip_until), stopping at whichever of two bytes comes first.
    pub(crate) fn skip_until_either(&mut self, first: u8, second: u8) -> crate::Result<()> {
        self.skip_to(|rest| memchr::memchr2(first, second, rest))
    }

    fn skip_to<F>(&mut self, find: F) -> crate::Result<()>
    where
        F: Fn(&[u8]) -> Option<usize>,
    {
        loop {
            if self.ch.is_none() {
                self.load()?;
                if self.ch.is_none() {
                    return Ok(());
                }
            }

            let chunk = match self.chunks.front() {
                Some(chunk) => chunk,
                None => return Ok(()),
            };
            let rest = &chunk[self.idx..];

            match find(rest) {
                Some(0) => return Ok(()),
                Some(rel_idx) => {
                    if let Some(capture) = self.capture.as_mut() {
                        capture.extend_from_slice(&rest[..rel_idx]);
                    }
                    self.prev = Some(rest[rel_idx - 1]);
                    self.ch = Some(rest[rel_idx]);
                    self.pos += rel_idx as u64;
                    self.idx += rel_idx;
                    return Ok(());
                }
                None => {
                    if let Some(capture) = self.capture.as_mut() {
                        capture.extend_from_slice(rest);
                    }
                    self.prev = rest.last().copied();
                    self.pos += rest.len() as u64;
                    self.pop_chunk();
                    self.ch = None;
                }
            }
        }
    }

    /// Discards everything up to the true end of input.
    pub fn drain(&mut self) -> crate::Result<()> {
        loop {
            self.prime()?;
            if self.ch.is_none() {
                return Ok(());
            }

            if let Some(chunk) = self.chunks.front() {
                let rest = &chunk[self.idx..];
                if let Some(capture) = self.capture.as_mut() {
                    capture.extend_from_slice(rest);
                }
                self.prev = rest.last().copied();
                self.pos += rest.len() as u64;
            }

            self.pop_chunk();
            self.ch = None;
        }
    }

    /// Starts recording every consumed byte.
    pub(crate) fn start_capture(&mut self) {
        self.capture = Some(BytesMut::new());
    }

    /// Stops recording and returns what was consumed since [`start_capture`](Self::start_capture).
    pub(crate) fn take_capture(&mut self) -> Bytes {
        self.capture.take().map(BytesMut::freeze).unwrap_or_default()
    }

    fn pop_chunk(&mut self) {
        if self.chunks.pop_front().is_some() {
            self.consumed += 1;
        }
        self.idx = 0;
    }

    /// Loads the current byte from the queue, skipping empty chunks.
    fn load_queued(&mut self) {
        while let Some(chunk) = self.chunks.front() {
            if self.idx < chunk.len() {
                self.ch = Some(chunk[self.idx]);
                return;
            }
            self.pop_chunk();
        }
        self.ch = None;
    }

    /// Loads the current byte, asking the source for one chunk at a time while the queue is empty.
    fn load(&mut self) -> crate::Result<()> {
        loop {
            self.load_queued();
            if self.ch.is_some() || self.source_done {
                return Ok(());
            }

            match self.source.next_chunk()? {
                Some(chunk) => {
                    trace!("received chunk of {} bytes at offset {}", chunk.len(), self.pos);
                    self.chunks.push_back(chunk);
                }
                None => {
                    trace!("source reported end of input at offset {}", self.pos);
                    self.source_done = true;
                }
            }
        }
    }
}

//! Chunk producers the [`StreamBuffer`](crate::StreamBuffer) pulls from when it runs dry.
//!
//! The buffer asks for one chunk at a time and blocks until the producer answers, so at most
//! one request is outstanding and nothing is read ahead of what the parser needs.

use crate::constants;
use bytes::{Bytes, BytesMut};
use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, SyncSender};

/// A blocking "next chunk or end of input" operation.
pub trait ChunkSource {
    /// Returns the next chunk, or `None` once no more data will ever arrive.
    fn next_chunk(&mut self) -> crate::Result<Option<Bytes>>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn next_chunk(&mut self) -> crate::Result<Option<Bytes>> {
        (**self).next_chunk()
    }
}

/// A source with nothing behind it: only injected chunks are parsed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Exhausted;

impl ChunkSource for Exhausted {
    fn next_chunk(&mut self) -> crate::Result<Option<Bytes>> {
        Ok(None)
    }
}

/// Replays the chunks of an iterator in order.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator,
    I::Item: Into<Bytes>,
{
    /// Creates a source yielding `chunks` in order.
    pub fn new<T>(chunks: T) -> Self
    where
        T: IntoIterator<IntoIter = I, Item = I::Item>,
    {
        IterSource {
            iter: chunks.into_iter(),
        }
    }
}

impl<I> ChunkSource for IterSource<I>
where
    I: Iterator,
    I::Item: Into<Bytes>,
{
    fn next_chunk(&mut self) -> crate::Result<Option<Bytes>> {
        Ok(self.iter.next().map(Into::into))
    }
}

/// Reads chunks from a blocking reader.
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
    chunk_size: usize,
}

impl<R: Read> ReadSource<R> {
    /// Creates a source reading chunks of the default size.
    pub fn new(reader: R) -> Self {
        ReadSource::with_chunk_size(reader, constants::DEFAULT_READ_CHUNK_SIZE)
    }

    /// Creates a source reading chunks of at most `chunk_size` bytes.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        ReadSource {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<R: Read> ChunkSource for ReadSource<R> {
    fn next_chunk(&mut self) -> crate::Result<Option<Bytes>> {
        let mut buf = BytesMut::zeroed(self.chunk_size);

        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Some(buf.freeze()));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(crate::Error::StreamReadFailed(err.into())),
            }
        }
    }
}

/// A plain channel of chunks; a disconnected sender means end of input.
impl ChunkSource for Receiver<Bytes> {
    fn next_chunk(&mut self) -> crate::Result<Option<Bytes>> {
        Ok(self.recv().ok())
    }
}

/// Creates a rendezvous pair connecting a chunk producer to a parser.
///
/// The parser side ([`Handoff`]) raises a request each time it runs out of data and blocks until
/// the producer side ([`Feeder`]) answers with a chunk or with end of input. This lets a parser
/// run on its own thread directly against data that is still arriving from an SMTP session.
pub fn handoff() -> (Feeder, Handoff) {
    let (request_tx, request_rx) = mpsc::sync_channel(1);
    let (reply_tx, reply_rx) = mpsc::sync_channel(1);

    (Feeder { request_rx, reply_tx }, Handoff { request_tx, reply_rx })
}

/// The parser half of a [`handoff`] pair.
#[derive(Debug)]
pub struct Handoff {
    request_tx: SyncSender<()>,
    reply_rx: Receiver<Option<Bytes>>,
}

impl ChunkSource for Handoff {
    fn next_chunk(&mut self) -> crate::Result<Option<Bytes>> {
        if self.request_tx.send(()).is_err() {
            trace!("chunk producer is gone, treating as end of input");
            return Ok(None);
        }

        Ok(self.reply_rx.recv().ok().flatten())
    }
}

/// The producer half of a [`handoff`] pair.
#[derive(Debug)]
pub struct Feeder {
    request_rx: Receiver<()>,
    reply_tx: SyncSender<Option<Bytes>>,
}

impl Feeder {
    /// Waits until the parser asks for data, then hands it `chunk`.
    ///
    /// Returns `false` if the parser has stopped reading (it finished or failed), in which case
    /// the chunk is dropped.
    pub fn feed<B: Into<Bytes>>(&self, chunk: B) -> bool {
        if self.request_rx.recv().is_err() {
            return false;
        }

        self.reply_tx.send(Some(chunk.into())).is_ok()
    }

    /// Signals that no more data will arrive.
    ///
    /// Waits for the parser's next request so the answer is delivered in order; returns
    /// immediately if the parser has already stopped.
    pub fn finish(self) {
        if self.request_rx.recv().is_ok() {
            let _ = self.reply_tx.send(None);
        }
    }
}

#[cfg(feature = "tokio")]
#[cfg_attr(nightly, doc(cfg(feature = "tokio")))]
/// A Tokio channel of chunks, for a parser running on `spawn_blocking` or its own thread.
///
/// Must not be used from within an async context.
impl ChunkSource for tokio::sync::mpsc::Receiver<Bytes> {
    fn next_chunk(&mut self) -> crate::Result<Option<Bytes>> {
        Ok(self.blocking_recv())
    }
}

#[cfg(feature = "tokio-io")]
pub use self::stream::StreamSource;

#[cfg(feature = "tokio-io")]
mod stream {
    use super::ChunkSource;
    use bytes::Bytes;
    use futures_util::stream::{Stream, StreamExt};
    use tokio::io::AsyncRead;
    use tokio::runtime::Handle;
    use tokio_util::io::ReaderStream;

    /// Drives an async chunk stream from a blocking parser.
    ///
    /// Each request blocks on the given runtime until the stream yields, so the parser has to
    /// run outside of the runtime's async tasks, e.g. on `spawn_blocking`.
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub struct StreamSource<S> {
        stream: S,
        handle: Handle,
    }

    impl<S> StreamSource<S> {
        /// Creates a source over `stream`, polled on `handle`.
        pub fn new(stream: S, handle: Handle) -> Self {
            StreamSource { stream, handle }
        }
    }

    impl<R: AsyncRead + Unpin> StreamSource<ReaderStream<R>> {
        /// Creates a source reading chunks from an [`AsyncRead`].
        pub fn from_reader(reader: R, handle: Handle) -> Self {
            StreamSource::new(ReaderStream::new(reader), handle)
        }
    }

    impl<S, O, E> ChunkSource for StreamSource<S>
    where
        S: Stream<Item = Result<O, E>> + Unpin,
        O: Into<Bytes>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        fn next_chunk(&mut self) -> crate::Result<Option<Bytes>> {
            let stream = &mut self.stream;
            match self.handle.block_on(stream.next()) {
                Some(Ok(chunk)) => Ok(Some(chunk.into())),
                Some(Err(err)) => Err(crate::Error::StreamReadFailed(err.into())),
                None => Ok(None),
            }
        }
    }
}

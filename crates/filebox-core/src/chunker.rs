//! Fixed-size re-chunking of a byte stream.
//!
//! Buffers incoming data and re-emits it in pieces of exactly `chunk_size`
//! bytes, flushing the remainder when the input ends. Byte order and total
//! length are preserved; only delivery granularity changes.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, StreamExt};

use crate::stream::ByteStream;

pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Pure re-chunking state machine: feed bytes in, take sized chunks out.
#[derive(Debug)]
pub struct SizedChunker {
    chunk_size: usize,
    buffer: BytesMut,
}

impl SizedChunker {
    /// `chunk_size` of 0 is treated as 1.
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            buffer: BytesMut::with_capacity(chunk_size),
        }
    }

    /// Append `data`, returning every full chunk now available.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);
        let mut out = Vec::with_capacity(self.buffer.len() / self.chunk_size);
        while self.buffer.len() >= self.chunk_size {
            out.push(self.buffer.split_to(self.chunk_size).freeze());
        }
        out
    }

    /// The trailing partial chunk, if any.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split().freeze())
        }
    }
}

impl Default for SizedChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

/// Re-chunk `input` into `chunk_size` pieces. An upstream error is passed
/// through and ends the stream; buffered bytes before it are emitted first.
pub fn rechunk(input: ByteStream, chunk_size: usize) -> ByteStream {
    struct State {
        input: ByteStream,
        chunker: SizedChunker,
        ready: std::collections::VecDeque<crate::Result<Bytes>>,
        done: bool,
    }

    let state = State {
        input,
        chunker: SizedChunker::new(chunk_size),
        ready: Default::default(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.ready.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.input.next().await {
                Some(Ok(data)) => st.ready.extend(st.chunker.push(&data).into_iter().map(Ok)),
                Some(Err(e)) => {
                    st.done = true;
                    st.ready.extend(st.chunker.finish().map(Ok));
                    st.ready.push_back(Err(e));
                }
                None => {
                    st.done = true;
                    st.ready.extend(st.chunker.finish().map(Ok));
                }
            }
        }
    }))
}

//! Chunk range type and planning by chunk size.

/// A single chunk: byte range [start, end) (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Position of this chunk in the output stream.
    pub index: usize,
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ChunkRange {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// libcurl range value (inclusive end): `start-(end-1)`.
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end.saturating_sub(1))
    }

    /// HTTP Range header value (inclusive end): `bytes=start-(end-1)`.
    pub fn range_header_value(&self) -> String {
        if self.start >= self.end {
            "bytes=0-0".to_string()
        } else {
            format!("bytes={}-{}", self.start, self.end - 1)
        }
    }
}

/// Number of chunks needed for `total_size` bytes: `ceil(total / chunk)`.
pub fn chunk_count(total_size: u64, chunk_size: u64) -> usize {
    if total_size == 0 || chunk_size == 0 {
        return 0;
    }
    total_size.div_ceil(chunk_size) as usize
}

/// Builds the chunk plan for a given total size and chunk size.
///
/// Every chunk is `chunk_size` long except possibly the last.
/// Returns an empty vec if `total_size` or `chunk_size` is 0.
pub fn plan_chunks(total_size: u64, chunk_size: u64) -> Vec<ChunkRange> {
    let count = chunk_count(total_size, chunk_size);
    (0..count)
        .map(|index| {
            let start = index as u64 * chunk_size;
            let end = (start + chunk_size).min(total_size);
            ChunkRange { index, start, end }
        })
        .collect()
}

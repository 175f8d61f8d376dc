//! Per-download chunk bookkeeping.

use super::range::{plan_chunks, ChunkRange};

/// Lifecycle of one chunk inside a chunked download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    InFlight,
    Done,
    /// Retries exhausted; the whole download fails.
    Failed,
}

/// Ranges, per-chunk state and delivered byte count of one chunked download.
///
/// Chunks are emitted strictly in index order: `next_to_emit` only advances
/// past chunk `i` once every chunk below `i` has been emitted.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
    ranges: Vec<ChunkRange>,
    states: Vec<ChunkState>,
    next_to_emit: usize,
    bytes_emitted: u64,
}

impl ChunkPlan {
    pub fn new(total_size: u64, chunk_size: u64) -> Self {
        let ranges = plan_chunks(total_size, chunk_size);
        let states = vec![ChunkState::Pending; ranges.len()];
        Self {
            total_size,
            chunk_size,
            ranges,
            states,
            next_to_emit: 0,
            bytes_emitted: 0,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn range(&self, index: usize) -> ChunkRange {
        self.ranges[index]
    }

    pub fn state(&self, index: usize) -> ChunkState {
        self.states[index]
    }

    pub fn bytes_emitted(&self) -> u64 {
        self.bytes_emitted
    }

    pub fn next_to_emit(&self) -> usize {
        self.next_to_emit
    }

    pub fn mark_in_flight(&mut self, index: usize) {
        self.states[index] = ChunkState::InFlight;
    }

    pub fn mark_failed(&mut self, index: usize) {
        self.states[index] = ChunkState::Failed;
    }

    /// Record that chunk `index` was appended to the output.
    ///
    /// Panics if `index` is not the next chunk in order; the downloader
    /// never emits out of order.
    pub fn mark_emitted(&mut self, index: usize, len: u64) {
        assert_eq!(
            index, self.next_to_emit,
            "chunk {} emitted before chunk {}",
            index, self.next_to_emit
        );
        self.states[index] = ChunkState::Done;
        self.next_to_emit += 1;
        self.bytes_emitted += len;
    }

    /// True when every chunk is done and the byte count matches the total.
    pub fn is_complete(&self) -> bool {
        self.next_to_emit == self.ranges.len() && self.bytes_emitted == self.total_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_tracks_ordered_emission() {
        let mut plan = ChunkPlan::new(10, 4);
        assert_eq!(plan.chunk_count(), 3);
        assert!(plan.states.iter().all(|s| *s == ChunkState::Pending));

        plan.mark_in_flight(0);
        plan.mark_in_flight(1);
        assert_eq!(plan.state(1), ChunkState::InFlight);

        plan.mark_emitted(0, 4);
        plan.mark_emitted(1, 4);
        assert!(!plan.is_complete());
        plan.mark_in_flight(2);
        plan.mark_emitted(2, 2);
        assert_eq!(plan.bytes_emitted(), 10);
        assert!(plan.is_complete());
    }

    #[test]
    #[should_panic(expected = "emitted before")]
    fn out_of_order_emission_panics() {
        let mut plan = ChunkPlan::new(10, 4);
        plan.mark_emitted(1, 4);
    }

    #[test]
    fn failed_chunk_blocks_completion() {
        let mut plan = ChunkPlan::new(8, 4);
        plan.mark_emitted(0, 4);
        plan.mark_failed(1);
        assert_eq!(plan.state(1), ChunkState::Failed);
        assert!(!plan.is_complete());
    }
}

//! Range math and chunk planning.
//!
//! Splits a resource of known size into fixed-size byte ranges, computes the
//! HTTP Range header for each, and tracks per-chunk progress while a chunked
//! download runs.

mod plan;
mod range;

pub use plan::{ChunkPlan, ChunkState};
pub use range::{plan_chunks, ChunkRange};

pub mod http_server;

/// Deterministic, non-repeating-per-chunk test body.
#[allow(dead_code)]
pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

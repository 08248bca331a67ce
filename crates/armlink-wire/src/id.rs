use std::sync::atomic::{AtomicU64, Ordering};

/// Generates request ids unique for the lifetime of one control connection.
///
/// Ids are a monotonically increasing counter rather than random tokens, so
/// two outstanding requests can never collide in the correlation table.
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Produce the next id, e.g. `req-42`.
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("req-{n}")
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

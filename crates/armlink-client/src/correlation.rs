use std::collections::HashMap;
use std::sync::Mutex;

use armlink_wire::ResponseEnvelope;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{ClientError, Result};

/// One outstanding request, owned by the table from dispatch until it is
/// settled, abandoned, or the connection goes away.
pub(crate) struct Pending {
    pub(crate) tx: oneshot::Sender<ResponseEnvelope>,
    pub(crate) deadline: Instant,
}

/// Maps request ids to the continuation of the caller that issued them.
///
/// Exactly-once settlement is structural: the `oneshot` sender is consumed
/// by removal, so a second message bearing the same id finds nothing.
/// The lock is only held for map operations, never across an await.
#[derive(Default)]
pub struct CorrelationTable {
    entries: Mutex<HashMap<String, Pending>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a continuation. Rejects duplicate ids outright rather than
    /// silently replacing the earlier caller's continuation.
    pub(crate) fn insert(
        &self,
        id: &str,
        tx: oneshot::Sender<ResponseEnvelope>,
        deadline: Instant,
    ) -> Result<()> {
        let mut entries = self.entries.lock().expect("correlation table poisoned");
        if entries.contains_key(id) {
            return Err(ClientError::DuplicateRequestId(id.to_string()));
        }
        entries.insert(id.to_string(), Pending { tx, deadline });
        Ok(())
    }

    /// Remove and return the entry for `id`, if still outstanding.
    pub(crate) fn complete(&self, id: &str) -> Option<Pending> {
        self.entries
            .lock()
            .expect("correlation table poisoned")
            .remove(id)
    }

    /// Drop the entry for `id` without settling it. Used by the dispatcher
    /// when a request times out or its send fails; a late reply then falls
    /// into the uncorrelated-drop path.
    pub(crate) fn abandon(&self, id: &str) {
        self.entries
            .lock()
            .expect("correlation table poisoned")
            .remove(id);
    }

    /// Drain the table when the owning socket disconnects or fails.
    ///
    /// Dropping each sender wakes its caller with a closed-channel error,
    /// so no continuation is left pending forever. Returns how many were
    /// rejected.
    pub(crate) fn fail_all(&self) -> usize {
        let mut entries = self.entries.lock().expect("correlation table poisoned");
        let n = entries.len();
        entries.clear();
        n
    }

    /// Remove entries whose deadline has passed. Returns how many expired.
    pub(crate) fn sweep(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock().expect("correlation table poisoned");
        let before = entries.len();
        entries.retain(|_, pending| pending.deadline > now);
        before - entries.len()
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("correlation table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

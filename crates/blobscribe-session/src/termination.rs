use blobscribe_core::Termination;
use std::sync::Arc;
use tokio::sync::watch;

/// Write-once cell resolving a session. The first [`fire`](Self::fire) wins;
/// later calls leave the stored value untouched.
#[derive(Clone)]
pub struct TerminationSignal {
    tx: Arc<watch::Sender<Option<Termination>>>,
}

impl TerminationSignal {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Returns `true` if this call set the value.
    pub fn fire(&self, termination: Termination) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(termination);
            true
        })
    }

    pub fn get(&self) -> Option<Termination> {
        self.tx.borrow().clone()
    }

    pub fn is_fired(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

impl Default for TerminationSignal {
    fn default() -> Self {
        Self::new()
    }
}

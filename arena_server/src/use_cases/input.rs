// Coalescing intake for craft control input.

use crate::domain::{CraftId, Intent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Latest-intent-per-craft mailbox shared between connection tasks and the world task.
///
/// Writers overwrite whatever is pending for their craft; the world task takes
/// the whole map once per tick. Both sides hold the lock only for a single map
/// operation, so a burst of input can never stall a tick.
#[derive(Debug, Clone, Default)]
pub struct InputChannel {
    pending: Arc<Mutex<HashMap<CraftId, Intent>>>,
}

impl InputChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `intent` as the latest input for `craft_id`, replacing any unread one.
    pub fn submit(&self, craft_id: CraftId, intent: Intent) {
        self.lock().insert(craft_id, intent);
    }

    /// Takes every pending intent, leaving the channel empty.
    pub fn drain(&self) -> HashMap<CraftId, Intent> {
        std::mem::take(&mut *self.lock())
    }

    /// Discards an unread intent, e.g. after the craft's connection closed.
    pub fn forget(&self, craft_id: CraftId) {
        self.lock().remove(&craft_id);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CraftId, Intent>> {
        // The map holds plain values, so a panicked writer cannot leave it half-updated.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

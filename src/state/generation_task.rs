//! One in-flight attempt to produce a thumbnail for a slot.

use crate::content::{CacheKey, ContentItem};
use crate::ui::display_slot::{SlotId, ThumbnailSlot};
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

/// A generation task bound to one slot at request time.
///
/// The running job owns the task; the binding registry and the slot side only
/// ever see it through weak references.
pub struct GenerationTask {
    slot_id: SlotId,
    slot: Weak<dyn ThumbnailSlot>,
    item: ContentItem,
    key: CacheKey,
    cancelled: AtomicBool,
}

impl GenerationTask {
    pub fn new(slot_id: SlotId, slot: Weak<dyn ThumbnailSlot>, item: ContentItem) -> Self {
        let key = item.cache_key();
        Self {
            slot_id,
            slot,
            item,
            key,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn slot_id(&self) -> SlotId {
        self.slot_id
    }

    /// The slot, if it is still alive.
    pub fn slot(&self) -> Option<std::sync::Arc<dyn ThumbnailSlot>> {
        self.slot.upgrade()
    }

    pub fn item(&self) -> &ContentItem {
        &self.item
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Asks the task to stop at its next checkpoint. In-flight I/O is not interrupted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for GenerationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationTask")
            .field("slot_id", &self.slot_id)
            .field("key", &self.key)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

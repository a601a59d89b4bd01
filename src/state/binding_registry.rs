//! Association between display slots and their in-flight generation task.

use crate::content::ContentItem;
use crate::state::generation_task::GenerationTask;
use crate::ui::display_slot::SlotId;
use log::trace;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Maps slot ids to their current task.
///
/// Only weak references are kept: a finished or dropped task disappears from the
/// registry on the next lookup, and slots are never referenced at all.
#[derive(Default)]
pub struct BindingRegistry {
    bindings: Mutex<HashMap<SlotId, Weak<GenerationTask>>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `task` the slot's current task, replacing any previous binding.
    pub fn bind(&self, slot: SlotId, task: &Arc<GenerationTask>) {
        let mut bindings = self.lock();
        prune(&mut bindings);
        bindings.insert(slot, Arc::downgrade(task));
    }

    /// The slot's current task, if it is still alive.
    pub fn current_task(&self, slot: SlotId) -> Option<Arc<GenerationTask>> {
        let mut bindings = self.lock();
        let task = bindings.get(&slot).and_then(Weak::upgrade);
        if task.is_none() {
            bindings.remove(&slot);
        }
        task
    }

    /// Removes the binding only if `task` is still the current one, so a slow task
    /// finishing late cannot clobber a newer binding.
    pub fn unbind(&self, slot: SlotId, task: &Arc<GenerationTask>) -> bool {
        let mut bindings = self.lock();
        let is_current = bindings
            .get(&slot)
            .is_some_and(|current| Weak::ptr_eq(current, &Arc::downgrade(task)));
        if is_current {
            bindings.remove(&slot);
        }
        is_current
    }

    /// Atomically replaces the slot's task unless it is already working on `item`.
    ///
    /// A current task for a different item is cancelled. Returns the newly bound
    /// task, or `None` if the in-flight task was left alone.
    pub fn bind_unless_same(
        &self,
        slot: SlotId,
        item: &ContentItem,
        make_task: impl FnOnce() -> Arc<GenerationTask>,
    ) -> Option<Arc<GenerationTask>> {
        let mut bindings = self.lock();

        if let Some(current) = bindings.get(&slot).and_then(Weak::upgrade) {
            if current.item() == item && !current.is_cancelled() {
                return None;
            }
            current.cancel();
            trace!(
                "Cancelled generation of thumbnail {} for a reused slot",
                current.key()
            );
        }

        let task = make_task();
        prune(&mut bindings);
        bindings.insert(slot, Arc::downgrade(&task));
        Some(task)
    }

    /// Number of slots with a live task.
    pub fn len(&self) -> usize {
        let mut bindings = self.lock();
        prune(&mut bindings);
        bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SlotId, Weak<GenerationTask>>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune(bindings: &mut HashMap<SlotId, Weak<GenerationTask>>) {
    bindings.retain(|_, task| task.strong_count() > 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::LocalFile;
    use crate::ui::display_slot::{DisplaySlot, ThumbnailSlot};
    use std::path::PathBuf;

    fn item(name: &str) -> ContentItem {
        ContentItem::LocalFile(LocalFile {
            absolute_path: PathBuf::from(format!("/pics/{}", name)),
        })
    }

    fn task_for(slot: &Arc<DisplaySlot>, name: &str) -> Arc<GenerationTask> {
        let weak: Weak<dyn ThumbnailSlot> = Arc::downgrade(slot) as Weak<dyn ThumbnailSlot>;
        Arc::new(GenerationTask::new(slot.slot_id(), weak, item(name)))
    }

    #[test]
    fn bind_and_lookup() {
        let registry = BindingRegistry::new();
        let slot = Arc::new(DisplaySlot::new());
        let task = task_for(&slot, "a.jpg");

        registry.bind(slot.slot_id(), &task);

        let current = registry.current_task(slot.slot_id()).unwrap();
        assert!(Arc::ptr_eq(&current, &task));
    }

    #[test]
    fn unbind_ignores_stale_task() {
        let registry = BindingRegistry::new();
        let slot = Arc::new(DisplaySlot::new());
        let old = task_for(&slot, "a.jpg");
        let new = task_for(&slot, "b.jpg");

        registry.bind(slot.slot_id(), &old);
        registry.bind(slot.slot_id(), &new);

        assert!(!registry.unbind(slot.slot_id(), &old));
        assert!(Arc::ptr_eq(&registry.current_task(slot.slot_id()).unwrap(), &new));
        assert!(registry.unbind(slot.slot_id(), &new));
        assert!(registry.current_task(slot.slot_id()).is_none());
    }

    #[test]
    fn dropped_tasks_are_pruned() {
        let registry = BindingRegistry::new();
        let slot = Arc::new(DisplaySlot::new());
        let task = task_for(&slot, "a.jpg");
        registry.bind(slot.slot_id(), &task);
        assert_eq!(registry.len(), 1);

        drop(task);

        assert!(registry.current_task(slot.slot_id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_does_not_keep_slots_alive() {
        let registry = BindingRegistry::new();
        let slot = Arc::new(DisplaySlot::new());
        let task = task_for(&slot, "a.jpg");
        registry.bind(slot.slot_id(), &task);

        let weak_slot = Arc::downgrade(&slot);
        drop(slot);

        assert!(weak_slot.upgrade().is_none());
        assert!(task.slot().is_none());
    }

    #[test]
    fn same_item_keeps_in_flight_task() {
        let registry = BindingRegistry::new();
        let slot = Arc::new(DisplaySlot::new());

        let first = registry
            .bind_unless_same(slot.slot_id(), &item("a.jpg"), || task_for(&slot, "a.jpg"))
            .unwrap();
        let second =
            registry.bind_unless_same(slot.slot_id(), &item("a.jpg"), || task_for(&slot, "a.jpg"));

        assert!(second.is_none());
        assert!(!first.is_cancelled());
    }

    #[test]
    fn different_item_cancels_previous() {
        let registry = BindingRegistry::new();
        let slot = Arc::new(DisplaySlot::new());

        let first = registry
            .bind_unless_same(slot.slot_id(), &item("a.jpg"), || task_for(&slot, "a.jpg"))
            .unwrap();
        let second = registry
            .bind_unless_same(slot.slot_id(), &item("b.jpg"), || task_for(&slot, "b.jpg"))
            .unwrap();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(Arc::ptr_eq(&registry.current_task(slot.slot_id()).unwrap(), &second));
    }
}

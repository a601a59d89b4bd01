//! Background thumbnail generation.
//!
//! Requests are bound to a display slot, run on a bounded rayon pool and handed
//! back to the slot's owning context through a [`CompletionDispatcher`]. A slot
//! only ever shows the result of the last item it was asked for.

use crate::cache_gate::ThumbnailCacheGate;
use crate::config::{CacheSettings, ThumbnailConfig};
use crate::content::{CacheKey, ContentItem};
use crate::error::{Result, ThumbnailError};
use crate::services::{FetchStrategies, ThumbnailHost};
use crate::state::{BindingRegistry, GenerationTask};
use crate::ui::{CompletionDispatcher, ThumbnailSlot};
use image::DynamicImage;
use log::{debug, trace, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// What happened to a finished task once it reached the owning context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The thumbnail was shown in the slot.
    Committed,
    /// The slot moved on to another item, or is gone.
    Superseded,
    /// Nothing could be produced for the item.
    NoImage,
}

struct Shared {
    gate: Arc<ThumbnailCacheGate>,
    cache_settings: CacheSettings,
    strategies: FetchStrategies,
    host: Arc<dyn ThumbnailHost>,
    registry: BindingRegistry,
    dispatcher: Arc<dyn CompletionDispatcher>,
}

/// Entry point for UI code asking for thumbnails.
pub struct ThumbnailScheduler {
    shared: Arc<Shared>,
    pool: rayon::ThreadPool,
}

impl ThumbnailScheduler {
    pub fn new(
        config: &ThumbnailConfig,
        gate: Arc<ThumbnailCacheGate>,
        strategies: FetchStrategies,
        host: Arc<dyn ThumbnailHost>,
        dispatcher: Arc<dyn CompletionDispatcher>,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("thumbnail-{}", i))
            .panic_handler(|_| warn!("Thumbnail worker job panicked"))
            .build()
            .map_err(|e| ThumbnailError::WorkerPool(e.to_string()))?;

        let shared = Arc::new(Shared {
            gate,
            cache_settings: config.cache_settings(),
            strategies,
            host,
            registry: BindingRegistry::new(),
            dispatcher,
        });

        let init = Arc::clone(&shared);
        pool.spawn(move || {
            init.gate.ensure_initialized(&init.cache_settings);
        });

        Ok(Self { shared, pool })
    }

    /// Ensures a thumbnail for `item` will be produced for `slot`.
    ///
    /// Returns `false` if the slot is already working on the same item. Any other
    /// task bound to the slot is cancelled.
    pub fn request_thumbnail<S>(&self, item: ContentItem, slot: &Arc<S>) -> bool
    where
        S: ThumbnailSlot + 'static,
    {
        self.request_thumbnail_with(item, slot, |_| {})
    }

    /// Like [`request_thumbnail`](Self::request_thumbnail), reporting the outcome
    /// on the owning context once the task has completed.
    pub fn request_thumbnail_with<S, F>(
        &self,
        item: ContentItem,
        slot: &Arc<S>,
        on_done: F,
    ) -> bool
    where
        S: ThumbnailSlot + 'static,
        F: FnOnce(TaskOutcome) + Send + 'static,
    {
        let slot_id = slot.slot_id();
        let weak_slot: Weak<dyn ThumbnailSlot> = Arc::downgrade(slot) as Weak<dyn ThumbnailSlot>;

        let bound = self.shared.registry.bind_unless_same(slot_id, &item, || {
            Arc::new(GenerationTask::new(slot_id, weak_slot, item.clone()))
        });
        let Some(task) = bound else {
            trace!("Thumbnail for {} already in progress", item.describe());
            return false;
        };

        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || {
            let image = panic::catch_unwind(AssertUnwindSafe(|| shared.generate(&task)))
                .unwrap_or_else(|_| {
                    warn!("Thumbnail generation for {} panicked", task.item().describe());
                    None
                });
            let completion = Arc::clone(&shared);
            shared.dispatcher.dispatch(Box::new(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    completion.complete(&task, image)
                }))
                .unwrap_or_else(|_| {
                    warn!("Committing thumbnail for {} panicked", task.key());
                    completion.registry.unbind(task.slot_id(), &task);
                    TaskOutcome::NoImage
                });
                on_done(outcome);
            }));
        });
        true
    }

    /// Drops the cached thumbnail for `key`.
    pub fn invalidate(&self, key: &CacheKey) {
        self.shared.gate.remove(key);
    }

    /// Cached thumbnail for `key`, without generating one.
    pub fn get_cached(&self, key: &CacheKey) -> Option<DynamicImage> {
        self.shared.gate.get(key)
    }

    /// Number of slots with a task still in flight.
    pub fn in_flight(&self) -> usize {
        self.shared.registry.len()
    }
}

impl Shared {
    /// Worker side of a task. Never fails; errors are logged and become `None`.
    fn generate(&self, task: &GenerationTask) -> Option<DynamicImage> {
        if task.is_cancelled() {
            return None;
        }

        self.gate.ensure_initialized(&self.cache_settings);
        let cached = self.gate.get(task.key());
        if let Some(image) = cached.as_ref() {
            if !task.item().needs_update() {
                debug!("Thumbnail cache hit: {}", task.key());
                return Some(image.clone());
            }
            debug!("Refreshing cached thumbnail: {}", task.key());
        } else {
            debug!("Thumbnail cache miss: {}", task.key());
        }

        if task.is_cancelled() {
            return cached;
        }

        let fetched = panic::catch_unwind(AssertUnwindSafe(|| {
            self.strategies.fetch(task.item())
        }));
        match fetched {
            Ok(Ok(image)) => {
                self.gate.put(task.key(), &image);
                Some(image)
            }
            Ok(Err(e)) => {
                if e.is_resource_exhausted() {
                    self.host.reclaim_memory();
                }
                warn!("Thumbnail for {} failed: {}", task.item().describe(), e);
                cached
            }
            Err(_) => {
                warn!("Thumbnail for {} panicked", task.item().describe());
                cached
            }
        }
    }

    /// Owner-context side of a task.
    fn complete(&self, task: &Arc<GenerationTask>, image: Option<DynamicImage>) -> TaskOutcome {
        let was_current = self.registry.unbind(task.slot_id(), task);

        let slot = match task.slot() {
            Some(slot) if was_current && !task.is_cancelled() => slot,
            _ => {
                debug!("Discarding superseded thumbnail for {}", task.key());
                return TaskOutcome::Superseded;
            }
        };
        if slot.live_tag().as_ref() != Some(task.key()) {
            debug!("Slot no longer shows {}; discarding thumbnail", task.key());
            return TaskOutcome::Superseded;
        }

        match image {
            Some(image) => {
                slot.show_thumbnail(image);
                TaskOutcome::Committed
            }
            None => TaskOutcome::NoImage,
        }
    }
}

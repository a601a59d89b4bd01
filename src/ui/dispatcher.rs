//! Hand-off of completed work back to the thread that owns the display slots.

use log::warn;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

pub type CompletionJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs completion jobs on the UI context.
///
/// Jobs must run one at a time and in submission order per dispatcher.
pub trait CompletionDispatcher: Send + Sync {
    fn dispatch(&self, job: CompletionJob);
}

/// Runs jobs immediately on the calling thread. For headless use and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl CompletionDispatcher for InlineDispatcher {
    fn dispatch(&self, job: CompletionJob) {
        job();
    }
}

/// Queues jobs for a thread that drains a [`CompletionQueue`].
pub struct ChannelDispatcher {
    sender: Mutex<Sender<CompletionJob>>,
}

/// Receiving end of a [`ChannelDispatcher`]; owned by the UI thread.
pub struct CompletionQueue {
    receiver: Receiver<CompletionJob>,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, CompletionQueue) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            CompletionQueue { receiver },
        )
    }
}

impl CompletionDispatcher for ChannelDispatcher {
    fn dispatch(&self, job: CompletionJob) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.send(job).is_err() {
            warn!("Completion queue is gone; dropping a thumbnail result");
        }
    }
}

impl CompletionQueue {
    /// Runs every job already queued. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Waits up to `timeout` for one job and runs it.
    ///
    /// Returns `false` on timeout or once every dispatcher has been dropped.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                job();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

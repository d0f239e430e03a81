//! Cancellable background work for a pairing session.
//!
//! Every scheduled callback captures a [`SessionToken`]. Closing the session
//! bumps the tracker's generation, so a callback that wakes up afterwards sees
//! a dead token and does nothing, even if its abort raced with the wake-up.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;

#[derive(Debug, Default, Clone)]
pub struct SessionTracker {
    generation: Arc<AtomicU64>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation, invalidating all previously issued tokens.
    pub fn begin(&self) -> SessionToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        SessionToken {
            tracker: self.generation.clone(),
            generation,
        }
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    tracker: Arc<AtomicU64>,
    generation: u64,
}

impl SessionToken {
    pub fn is_live(&self) -> bool {
        self.tracker.load(Ordering::SeqCst) == self.generation
    }
}

/// Owns a spawned task. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct TaskHandle {
    handle: JoinHandle<()>,
}

impl TaskHandle {
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
        }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[test]
    fn test_begin_invalidates_older_tokens() {
        let tracker = SessionTracker::new();
        let first = tracker.begin();
        assert!(first.is_live());

        let second = tracker.begin();
        assert!(!first.is_live());
        assert!(second.is_live());

        tracker.invalidate();
        assert!(!second.is_live());
        assert!(tracker.begin().is_live());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_pending_task() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let handle = TaskHandle::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
        });

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_aborts_task() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        drop(TaskHandle::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}

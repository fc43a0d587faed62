//! Task spawning abstraction.
//!
//! Services spawn background work through [`TaskSpawner`] instead of calling
//! `tokio::spawn` directly, so the runtime handle is chosen once at bootstrap.

use std::future::Future;

use tokio::task::JoinHandle;

/// Abstraction for spawning detached background tasks.
///
/// Event handlers use it for follow-up work that must not hold up the
/// NOTIFY response, such as re-reading the alarm list.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a detached background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Spawns a task the caller can await or abort.
    pub fn spawn_with_handle<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn detached_task_runs() {
        let spawner = TokioSpawner::current();
        let executed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&executed);

        spawner.spawn(async move {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(executed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn handle_returns_task_output() {
        let spawner = TokioSpawner::current();
        let handle = spawner.spawn_with_handle(async { 42 });
        assert_eq!(handle.await.unwrap(), 42);
    }
}

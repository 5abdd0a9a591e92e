use std::future::Future;

use tokio::sync::OnceCell;

use crate::core::Result;

/// A single-flight asynchronous initialization cell.
///
/// The first caller runs the init future; every concurrent caller awaits
/// that same execution, and every later caller observes the stored outcome.
/// Failures are retained and replayed exactly like successes — the cell
/// never retries a failed initialization, so callers that need a fresh
/// attempt must build a new cell.
///
/// # Examples
///
/// ```
/// use docrepo::LazyShared;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> docrepo::Result<()> {
/// let cell: LazyShared<u32> = LazyShared::new();
/// let value = cell.get_or_init(|| async { Ok(7) }).await?;
/// assert_eq!(value, 7);
/// # Ok(())
/// # }
/// ```
pub struct LazyShared<T: Clone> {
    cell: OnceCell<Result<T>>,
}

impl<T: Clone> LazyShared<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Returns the shared value, running `init` if this is the first call.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cell.get_or_init(init).await.clone()
    }

    /// Whether an outcome (success or failure) has been stored.
    pub fn initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T: Clone> Default for LazyShared<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RepositoryError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn init_runs_once() {
        let cell: LazyShared<u32> = LazyShared::new();
        let runs = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cell
                .get_or_init(|| async {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(11)
                })
                .await
                .unwrap();
            assert_eq!(value, 11);
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_replay_without_retry() {
        let cell: LazyShared<u32> = LazyShared::new();
        let runs = AtomicUsize::new(0);

        let first = cell
            .get_or_init(|| async {
                runs.fetch_add(1, Ordering::SeqCst);
                Err(RepositoryError::Request {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            })
            .await;
        assert!(first.is_err());

        // The second caller's init closure must never run.
        let second = cell.get_or_init(|| async { Ok(99) }).await;
        assert_eq!(first.unwrap_err(), second.unwrap_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}

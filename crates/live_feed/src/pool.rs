use std::{future::Future, sync::Arc};

use tokio::sync::Semaphore;

use crate::{FetchError, FetchResult};

/// Bounds the number of feed requests in flight at once.
///
/// Work beyond the limit waits for a free slot instead of failing.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `work` on the current task once a slot is free.
    pub async fn run<F, T>(&self, work: F) -> FetchResult<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::PoolClosed)?;
        Ok(work.await)
    }
}

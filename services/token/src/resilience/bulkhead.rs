//! Per-operation concurrency limit.

use thiserror::Error;
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};

/// What to do when every permit is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaturationPolicy {
    /// Wait for a permit
    #[default]
    Queue,
    /// Fail the call immediately
    Reject,
}

/// Bulkhead configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkheadConfig {
    /// Calls allowed in flight at once
    pub max_concurrent: usize,
    /// Behaviour when saturated
    pub saturation: SaturationPolicy,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            saturation: SaturationPolicy::Queue,
        }
    }
}

impl BulkheadConfig {
    /// Set the concurrency limit. Zero is raised to one.
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Set the saturation policy.
    #[must_use]
    pub const fn with_saturation(mut self, saturation: SaturationPolicy) -> Self {
        self.saturation = saturation;
        self
    }
}

/// Why a permit was not handed out.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BulkheadError {
    /// All permits taken under [`SaturationPolicy::Reject`]
    #[error("bulkhead saturated ({0} calls in flight)")]
    Saturated(usize),
    /// Semaphore closed
    #[error("bulkhead closed")]
    Closed,
}

/// Semaphore-backed bulkhead.
#[derive(Debug)]
pub struct Bulkhead {
    semaphore: Semaphore,
    config: BulkheadConfig,
}

impl Bulkhead {
    /// Create a bulkhead.
    #[must_use]
    pub fn new(config: BulkheadConfig) -> Self {
        let max_concurrent = config.max_concurrent;
        let config = config.with_max_concurrent(max_concurrent);
        Self {
            semaphore: Semaphore::new(config.max_concurrent),
            config,
        }
    }

    /// Take a permit, held until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BulkheadError::Saturated`] when full under the reject policy.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, BulkheadError> {
        match self.config.saturation {
            SaturationPolicy::Queue => {
                self.semaphore.acquire().await.map_err(|_| BulkheadError::Closed)
            }
            SaturationPolicy::Reject => match self.semaphore.try_acquire() {
                Ok(permit) => Ok(permit),
                Err(TryAcquireError::NoPermits) => {
                    Err(BulkheadError::Saturated(self.config.max_concurrent))
                }
                Err(TryAcquireError::Closed) => Err(BulkheadError::Closed),
            },
        }
    }

    /// Permits currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Configured limit.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.config.max_concurrent
    }
}

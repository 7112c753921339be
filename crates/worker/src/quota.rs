//! Storage-pressure eviction.
//!
//! The guard runs after cache-first writes. Eviction is coarse on purpose:
//! the store holds a handful of whole generations, not many small entries,
//! so reclaiming means deleting every superseded generation rather than
//! picking entries by recency.

use outpost_core::{Error, GenerationStore};

/// Threshold-triggered eviction of non-current generations.
#[derive(Debug, Clone)]
pub struct QuotaGuard {
    /// Storage quota in bytes; None means the host exposes no usage
    /// estimate and the guard does nothing.
    limit_bytes: Option<u64>,
    /// Fraction of the quota above which eviction triggers. Checking
    /// against 90% of the quota instead of the quota itself keeps the
    /// guard from thrashing right at the boundary.
    trigger_ratio: f64,
}

impl QuotaGuard {
    pub fn new(limit_bytes: Option<u64>, trigger_ratio: f64) -> Self {
        Self { limit_bytes, trigger_ratio }
    }

    /// Check usage and evict superseded generations if over threshold.
    ///
    /// Returns the number of generations deleted (0 when below threshold
    /// or when no quota estimate is available).
    pub async fn enforce(&self, store: &GenerationStore, current: &str) -> Result<u64, Error> {
        let Some(limit) = self.limit_bytes else {
            return Ok(0);
        };

        let usage = store.usage_bytes().await?;
        let threshold = (limit as f64 * self.trigger_ratio) as u64;
        if usage <= threshold {
            return Ok(0);
        }

        let deleted = store.delete_generations_except(current).await?;
        tracing::info!(usage, limit, threshold, deleted, "storage pressure: deleted superseded generations");
        Ok(deleted)
    }
}

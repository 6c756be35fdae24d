//! Shared health counters for the /health endpoint.
//! Updated by the stock handlers and the listing fan-out.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Failed create/read/update/delete/list calls against the store.
    pub store_errors: AtomicU64,
    /// Price lookups that ended in a placeholder rather than a price.
    pub price_placeholders: AtomicU64,
    /// Millisecond timestamp of the last listing served (0 = none).
    pub last_listing_at_ms: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_store_errors(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_price_placeholders(&self, n: u64) {
        self.price_placeholders.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_last_listing_at_ms(&self, ms: u64) {
        self.last_listing_at_ms.store(ms, Ordering::Relaxed);
    }

    pub fn store_errors(&self) -> u64 {
        self.store_errors.load(Ordering::Relaxed)
    }

    pub fn price_placeholders(&self) -> u64 {
        self.price_placeholders.load(Ordering::Relaxed)
    }

    pub fn last_listing_at_ms(&self) -> u64 {
        self.last_listing_at_ms.load(Ordering::Relaxed)
    }
}

//! Heap accounting through an instrumented global allocator.
//!
//! Rust exposes no allocator statistics of its own, so heap and reclamation
//! fields are only reported when the host binary installs [`INSTRUMENTED`]:
//!
//! ```ignore
//! use std::alloc::System;
//! use runstats::alloc::{INSTRUMENTED, StatsAlloc};
//!
//! #[global_allocator]
//! static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED;
//! ```
//!
//! Without it, [`stats`] returns `None` and those fields are omitted.

pub use stats_alloc::INSTRUMENTED_SYSTEM as INSTRUMENTED;
pub use stats_alloc::StatsAlloc;

/// Snapshot of the allocator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Cumulative bytes handed out, including growth by reallocation.
    pub allocated_bytes: u64,
    /// Cumulative bytes returned, including shrinking by reallocation.
    pub freed_bytes: u64,
    /// Cumulative allocation calls.
    pub allocations: u64,
    /// Cumulative deallocation calls.
    pub deallocations: u64,
}

impl AllocStats {
    /// Bytes currently live on the heap.
    pub fn live_bytes(&self) -> u64 {
        self.allocated_bytes.saturating_sub(self.freed_bytes)
    }

    /// Allocations currently live on the heap.
    pub fn live_objects(&self) -> u64 {
        self.allocations.saturating_sub(self.deallocations)
    }
}

impl From<stats_alloc::Stats> for AllocStats {
    fn from(stats: stats_alloc::Stats) -> Self {
        Self {
            allocated_bytes: stats.bytes_allocated as u64,
            freed_bytes: stats.bytes_deallocated as u64,
            allocations: stats.allocations as u64,
            deallocations: stats.deallocations as u64,
        }
    }
}

/// Read the allocator counters, or `None` if [`INSTRUMENTED`] is not the
/// global allocator.
pub fn stats() -> Option<AllocStats> {
    from_raw(INSTRUMENTED.stats())
}

/// A process always allocates before it can sample, so an untouched
/// allocator means it was never installed.
fn from_raw(stats: stats_alloc::Stats) -> Option<AllocStats> {
    if stats.allocations == 0 {
        return None;
    }
    Some(stats.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_counts_saturate() {
        let stats = AllocStats {
            allocated_bytes: 10,
            freed_bytes: 25,
            allocations: 1,
            deallocations: 3,
        };
        assert_eq!(stats.live_bytes(), 0);
        assert_eq!(stats.live_objects(), 0);

        let stats = AllocStats {
            allocated_bytes: 4096,
            freed_bytes: 1024,
            allocations: 8,
            deallocations: 2,
        };
        assert_eq!(stats.live_bytes(), 3072);
        assert_eq!(stats.live_objects(), 6);
    }

    #[test]
    fn test_from_raw_counters() {
        let raw = stats_alloc::Stats {
            allocations: 8,
            deallocations: 3,
            reallocations: 2,
            bytes_allocated: 4096,
            bytes_deallocated: 1024,
            bytes_reallocated: 512,
        };

        let stats = from_raw(raw).unwrap();
        assert_eq!(stats.allocated_bytes, 4096);
        assert_eq!(stats.freed_bytes, 1024);
        assert_eq!(stats.allocations, 8);
        assert_eq!(stats.deallocations, 3);
        assert_eq!(stats.live_objects(), 5);
    }

    #[test]
    fn test_untouched_allocator_is_not_installed() {
        assert!(from_raw(stats_alloc::Stats::default()).is_none());
        // The unit-test binary runs on the plain system allocator
        assert!(stats().is_none());
    }
}

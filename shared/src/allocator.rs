use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use thiserror::Error;

/// Errors that can occur during allocator operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocatorError {
    /// The allocator's byte budget cannot satisfy the request
    #[error("Out of memory: requested {requested} bytes but only {available} bytes are available")]
    OutOfMemory { requested: usize, available: usize },
}

struct AllocatorShared {
    capacity: Option<usize>,
    used: AtomicUsize,
    num_allocations: AtomicUsize,
}

/// A byte budget that messages, blocks and packet storage are charged against.
///
/// Each peer gets its own `Allocator`, so that one peer flooding messages can
/// only exhaust its own budget. Cloning an `Allocator` shares the budget.
#[derive(Clone)]
pub struct Allocator {
    shared: Arc<AllocatorShared>,
}

impl Allocator {
    pub fn unbounded() -> Self {
        Self::from_capacity(None)
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self::from_capacity(Some(bytes))
    }

    fn from_capacity(capacity: Option<usize>) -> Self {
        Self {
            shared: Arc::new(AllocatorShared {
                capacity,
                used: AtomicUsize::new(0),
                num_allocations: AtomicUsize::new(0),
            }),
        }
    }

    /// Reserves `bytes` from the budget. The reservation lasts until the
    /// returned [`Allocation`] is dropped.
    pub fn try_allocate(&self, bytes: usize) -> Result<Allocation, AllocatorError> {
        let shared = &self.shared;
        let reserved = shared
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let total = used.checked_add(bytes)?;
                match shared.capacity {
                    Some(capacity) if total > capacity => None,
                    _ => Some(total),
                }
            });

        if reserved.is_err() {
            return Err(AllocatorError::OutOfMemory {
                requested: bytes,
                available: self.bytes_available(),
            });
        }

        shared.num_allocations.fetch_add(1, Ordering::AcqRel);
        Ok(Allocation {
            allocator: self.clone(),
            bytes,
        })
    }

    pub fn capacity(&self) -> Option<usize> {
        self.shared.capacity
    }

    pub fn bytes_used(&self) -> usize {
        self.shared.used.load(Ordering::Acquire)
    }

    pub fn bytes_available(&self) -> usize {
        match self.shared.capacity {
            Some(capacity) => capacity.saturating_sub(self.bytes_used()),
            None => usize::MAX - self.bytes_used(),
        }
    }

    /// Number of allocations currently live
    pub fn num_allocations(&self) -> usize {
        self.shared.num_allocations.load(Ordering::Acquire)
    }

    pub fn same_as(&self, other: &Allocator) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

/// A reservation against an [`Allocator`]. Returns its bytes when dropped.
pub struct Allocation {
    allocator: Allocator,
    bytes: usize,
}

impl Allocation {
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        let shared = &self.allocator.shared;
        shared.used.fetch_sub(self.bytes, Ordering::AcqRel);
        shared.num_allocations.fetch_sub(1, Ordering::AcqRel);
    }
}

//! Bounded active-capability set.
//!
//! A [`SlotPool`] is a counting semaphore; every held capability handle owns
//! one [`SlotPermit`], which returns its slot on drop. [`ActiveSet`] is the
//! executor's view: the handles it currently holds, keyed by capability.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug)]
struct PoolState {
    in_use: usize,
    peak: usize,
}

#[derive(Debug)]
pub struct SlotPool {
    capacity: usize,
    state: Mutex<PoolState>,
    freed: Condvar,
}

impl SlotPool {
    /// `capacity` must be non-zero; `ExecutorConfig` guarantees this.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            state: Mutex::new(PoolState { in_use: 0, peak: 0 }),
            freed: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Blocks until a slot is free, then takes it.
    pub fn acquire(self: &Arc<Self>, capability: &str) -> SlotPermit {
        let mut state = self.lock();
        while state.in_use >= self.capacity {
            state = self.freed.wait(state).unwrap_or_else(|p| p.into_inner());
        }
        state.in_use += 1;
        state.peak = state.peak.max(state.in_use);

        SlotPermit {
            pool: Arc::clone(self),
            capability: capability.to_string(),
        }
    }

    /// Takes a slot only if one is free right now.
    pub fn try_acquire(self: &Arc<Self>, capability: &str) -> Option<SlotPermit> {
        let mut state = self.lock();
        if state.in_use >= self.capacity {
            return None;
        }
        state.in_use += 1;
        state.peak = state.peak.max(state.in_use);

        Some(SlotPermit {
            pool: Arc::clone(self),
            capability: capability.to_string(),
        })
    }

    fn release(&self) {
        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
        self.freed.notify_one();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.lock().in_use
    }

    /// Highest simultaneous `in_use` seen by this pool.
    pub fn peak(&self) -> usize {
        self.lock().peak
    }
}

/// One held slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct SlotPermit {
    pool: Arc<SlotPool>,
    capability: String,
}

impl SlotPermit {
    pub fn capability(&self) -> &str {
        &self.capability
    }
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.pool.release();
    }
}

/// Capability handles the executor currently holds.
#[derive(Debug)]
pub struct ActiveSet {
    pool: Arc<SlotPool>,
    held: Vec<SlotPermit>,
}

impl ActiveSet {
    pub fn new(bound: usize) -> Self {
        Self {
            pool: SlotPool::new(bound),
            held: Vec::new(),
        }
    }

    /// Hold a handle for `capability`, reusing one already held.
    pub fn acquire(&mut self, capability: &str) {
        if self.holds(capability) {
            return;
        }
        let permit = self.pool.acquire(capability);
        self.held.push(permit);
    }

    pub fn holds(&self, capability: &str) -> bool {
        self.held.iter().any(|p| p.capability() == capability)
    }

    /// Release every handle except the one `keep` names, if any.
    pub fn release_except(&mut self, keep: Option<&str>) {
        self.held.retain(|p| Some(p.capability()) == keep);
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn bound(&self) -> usize {
        self.pool.capacity()
    }

    pub fn peak(&self) -> usize {
        self.pool.peak()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn permits_return_slots_on_drop() {
        let pool = SlotPool::new(2);
        let a = pool.acquire("a");
        let b = pool.acquire("b");
        assert_eq!(pool.in_use(), 2);
        assert!(pool.try_acquire("c").is_none());

        drop(a);
        assert_eq!(pool.in_use(), 1);
        let c = pool.try_acquire("c");
        assert!(c.is_some());
        drop(b);
        drop(c);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.peak(), 2);
    }

    #[test]
    fn contended_pool_never_exceeds_capacity() {
        let pool = SlotPool::new(3);
        let current = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let pool = Arc::clone(&pool);
                let current = Arc::clone(&current);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    let _permit = pool.acquire(&format!("cap-{}", i));
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    current.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(max_seen.load(Ordering::SeqCst) <= 3);
        assert!(pool.peak() <= 3);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn active_set_reuses_held_capability() {
        let mut active = ActiveSet::new(1);
        active.acquire("scaffold");
        active.acquire("scaffold");
        assert_eq!(active.len(), 1);

        active.release_except(Some("scaffold"));
        assert!(active.holds("scaffold"));

        active.release_except(Some("prisma"));
        assert!(active.is_empty());

        active.acquire("prisma");
        assert_eq!(active.len(), 1);
        assert_eq!(active.peak(), 1);
    }
}

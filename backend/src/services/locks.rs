//! Per-resource leases.
//!
//! A request leases the whole set of resource keys it touches at once. The
//! set is acquired all-or-nothing, in ascending key order, so two requests can
//! never each hold part of what the other needs. Requests with disjoint key
//! sets proceed in parallel.

use log::debug;
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ResourceKey;

#[derive(Debug, Default)]
struct LeaseTable {
    held: Mutex<BTreeSet<ResourceKey>>,
    released: Condvar,
}

/// Shared lease table. Cloning yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct ResourceLocks {
    table: Arc<LeaseTable>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lease every key in `keys`, waiting up to `timeout` for all of them to
    /// be free at the same moment.
    ///
    /// On timeout returns the first key (ascending) that was still held.
    pub fn acquire(
        &self,
        keys: &[ResourceKey],
        timeout: Duration,
    ) -> Result<ResourceLease, ResourceKey> {
        let wanted: BTreeSet<ResourceKey> = keys.iter().copied().collect();
        let deadline = Instant::now() + timeout;
        let mut held = self.table.held.lock();

        loop {
            let busy = wanted.iter().find(|key| held.contains(key)).copied();
            let Some(busy) = busy else {
                break;
            };
            debug!("Waiting for lease on {}", busy);
            if self.table.released.wait_until(&mut held, deadline).timed_out() {
                // A release may have raced with the timeout.
                match wanted.iter().find(|key| held.contains(key)) {
                    Some(still_busy) => return Err(*still_busy),
                    None => break,
                }
            }
        }

        held.extend(wanted.iter().copied());
        Ok(ResourceLease {
            table: Arc::clone(&self.table),
            keys: wanted.into_iter().collect(),
        })
    }

    /// Keys currently leased, ascending.
    pub fn held(&self) -> Vec<ResourceKey> {
        self.table.held.lock().iter().copied().collect()
    }
}

/// Keys held by one request. Dropping the lease releases them.
#[derive(Debug)]
pub struct ResourceLease {
    table: Arc<LeaseTable>,
    keys: Vec<ResourceKey>,
}

impl ResourceLease {
    pub fn keys(&self) -> &[ResourceKey] {
        &self.keys
    }

    pub fn covers(&self, key: &ResourceKey) -> bool {
        self.keys.binary_search(key).is_ok()
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        let mut held = self.table.held.lock();
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.table.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassroomId, TeacherId};
    use std::sync::mpsc;
    use std::thread;

    fn room(id: i64) -> ResourceKey {
        ResourceKey::Classroom(ClassroomId(id))
    }

    fn teacher(id: i64) -> ResourceKey {
        ResourceKey::Teacher(TeacherId(id))
    }

    #[test]
    fn test_lease_sorted_and_released_on_drop() {
        let locks = ResourceLocks::new();
        {
            let lease = locks
                .acquire(&[teacher(1), room(2), teacher(1)], Duration::from_millis(10))
                .unwrap();
            assert_eq!(lease.keys(), &[room(2), teacher(1)]);
            assert!(lease.covers(&teacher(1)));
            assert_eq!(locks.held(), vec![room(2), teacher(1)]);
        }
        assert!(locks.held().is_empty());
    }

    #[test]
    fn test_overlapping_sets_time_out() {
        let locks = ResourceLocks::new();
        let _first = locks
            .acquire(&[room(1), teacher(1)], Duration::from_millis(10))
            .unwrap();
        let busy = locks
            .acquire(&[teacher(1), teacher(2)], Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(busy, teacher(1));
        assert_eq!(locks.held(), vec![room(1), teacher(1)]);
    }

    #[test]
    fn test_disjoint_sets_coexist() {
        let locks = ResourceLocks::new();
        let _a = locks.acquire(&[room(1)], Duration::from_millis(10)).unwrap();
        let _b = locks.acquire(&[room(2)], Duration::from_millis(10)).unwrap();
        assert_eq!(locks.held().len(), 2);
    }

    #[test]
    fn test_waiter_wakes_after_release() {
        let locks = ResourceLocks::new();
        let lease = locks.acquire(&[room(1)], Duration::from_millis(10)).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let locks = locks.clone();
            thread::spawn(move || {
                tx.send(()).unwrap();
                locks
                    .acquire(&[room(1)], Duration::from_secs(5))
                    .map(|lease| lease.keys().to_vec())
            })
        };

        rx.recv().unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(lease);

        assert_eq!(waiter.join().unwrap(), Ok(vec![room(1)]));
    }
}

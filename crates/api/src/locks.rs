//! Per-section write locks.
//!
//! Saves, deletes and applies for one section run one at a time; different
//! sections reach the store in parallel. The store keeps each write atomic on
//! its own and serializes writes across sections where its checks span them
//! (the Postgres store takes one schedule-wide advisory lock), so these locks
//! only order competing requests for the same section.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct SectionLocks {
    sections: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SectionLocks {
    /// Wait for exclusive access to `section`. Released when the guard drops.
    pub async fn lock(&self, section: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut sections = self.sections.lock().await;
            Arc::clone(sections.entry(section.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry of a section that no longer exists.
    pub async fn forget(&self, section: &str) {
        let mut sections = self.sections.lock().await;
        if let Some(lock) = sections.get(section) {
            // Someone else holds or waits on it.
            if Arc::strong_count(lock) > 1 {
                return;
            }
        }
        sections.remove(section);
    }

    /// Drop every idle lock entry.
    pub async fn clear(&self) {
        self.sections
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub async fn tracked(&self) -> usize {
        self.sections.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_section_waits() {
        let locks = Arc::new(SectionLocks::default());
        let guard = locks.lock("CS-A").await;

        let pending = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock("CS-A").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("second lock should be granted")
            .unwrap();
    }

    #[tokio::test]
    async fn different_sections_do_not_block() {
        let locks = SectionLocks::default();
        let _a = locks.lock("CS-A").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("CS-B")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn forget_keeps_held_locks() {
        let locks = SectionLocks::default();
        let guard = locks.lock("CS-A").await;
        locks.forget("CS-A").await;
        assert_eq!(locks.tracked().await, 1);

        drop(guard);
        locks.forget("CS-A").await;
        assert_eq!(locks.tracked().await, 0);
    }
}

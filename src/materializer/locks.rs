// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// In-process advisory locks keyed by form id.
///
/// Structural work on one form is serialized by holding that form's lock
/// across the whole pass, metadata reads included. The form id is stable
/// for the form's entire lifetime, in particular across activation, so
/// every caller contends on the same key. Distinct forms never contend
/// with each other.
///
/// The registry only coordinates work inside one process. Concurrent
/// reconciliation remains safe without it since every operation checks
/// the live catalog first, the lock just avoids redundant passes racing
/// each other on the same table.
#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the advisory lock for `form_id`, waiting if another task
    /// holds it. The guard releases the lock on drop.
    pub async fn acquire(&self, form_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            // The poisoned case can not occur, no task panics while the
            // registry map itself is locked.
            let mut locks = self.locks.lock().unwrap_or_else(|error| error.into_inner());
            locks
                .entry(form_id.to_owned())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::LockRegistry;

    #[tokio::test]
    async fn serializes_same_form() {
        let registry = LockRegistry::new();
        let concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let concurrent = concurrent.clone();

            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire("form-1").await;
                let active = concurrent.fetch_add(1, Ordering::SeqCst);
                assert_eq!(active, 0);
                tokio::task::yield_now().await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn distinct_forms_do_not_contend() {
        let registry = LockRegistry::new();

        let _first = registry.acquire("form-1").await;
        // Must not block on the unrelated form.
        let _second = registry.acquire("form-2").await;
    }
}

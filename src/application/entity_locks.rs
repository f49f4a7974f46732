use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// In-process mutual exclusion keyed by entity id.
///
/// Holding the guard serializes lifecycle mutations for one subscription.
/// Entries nobody holds are pruned on the next acquire.
#[derive(Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks.retain(|key, lock| *key == id || Arc::strong_count(lock) > 1);
            locks
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

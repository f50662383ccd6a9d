use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One mutex per rider, shared by assignment and lifecycle so that the
/// `current_order` pointer and the one-active-order check never race.
#[derive(Default)]
pub struct RiderLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RiderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, rider_id: Uuid) -> RiderGuard {
        let lock = self.locks.entry(rider_id).or_default().clone();

        RiderGuard {
            rider_id,
            _guard: lock.lock_owned().await,
        }
    }
}

/// Proof that the caller holds a rider's lock.
pub struct RiderGuard {
    rider_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl RiderGuard {
    pub fn rider_id(&self) -> Uuid {
        self.rider_id
    }
}

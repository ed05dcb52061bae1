//! Hook between the VM lifecycle and the resource read models

use async_trait::async_trait;

/// Keeps resource inventories in step with the VM status.
///
/// The lifecycle controller calls `activate` while it publishes Running and
/// `clear` before it publishes Stopped, both inside the transition. `refresh`
/// runs after the transition lock is released; results that land after a
/// `clear` are dropped by the implementation.
#[async_trait]
pub trait ResourceSync: Send + Sync {
    fn activate(&self);

    async fn refresh(&self);

    async fn clear(&self);
}

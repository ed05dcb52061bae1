//! VM lifecycle state machine
//!
//! ```text
//!            start                 stop
//!  Stopped ─────────► Starting ──► Running ─────────► Stopping ──► Stopped
//!     ▲                  │            │                   │
//!     └──── failure ─────┘            │ restart           └─ failure ─► Running
//!                                     ▼
//!                                Restarting ── stop leg fails ──► Running
//!                                     │
//!                                     └─ start leg ─► Running | Stopped
//!
//!  Stopped (or any, with force) ── remove ──► Deleting ──► Stopped
//! ```
//!
//! One transition runs at a time per VM; a second caller gets
//! [`DocksideError::Busy`] instead of waiting. Inventory refreshes run after
//! the transition lock is released, so they never make a transition busy.

use crate::colima::{Colima, StartOptions};
use dockside_core::{
    DocksideError, ResourceSync, Result, VmInfo, VmState, VmStatus,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Default pause between the stop and start legs of a restart
pub const DEFAULT_RESTART_SETTLE: Duration = Duration::from_millis(2000);

/// Owns the state of one VM profile
pub struct VmController {
    name: String,
    colima: Colima,
    sync: Arc<dyn ResourceSync>,
    settle_delay: Duration,
    state: RwLock<VmState>,
    transition: Mutex<()>,
    /// Bumped whenever a transition begins; lets status polls detect stale observations
    generation: AtomicU64,
}

impl VmController {
    pub fn new(name: impl Into<String>, colima: Colima, sync: Arc<dyn ResourceSync>) -> Self {
        let name = name.into();
        Self {
            state: RwLock::new(VmState::stopped(&name)),
            name,
            colima,
            sync,
            settle_delay: DEFAULT_RESTART_SETTLE,
            transition: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn snapshot(&self) -> VmState {
        self.state.read().await.clone()
    }

    pub async fn status(&self) -> VmStatus {
        self.state.read().await.status
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>> {
        self.transition.try_lock().map_err(|_| DocksideError::Busy {
            name: self.name.clone(),
        })
    }

    /// Check the guard and enter the transitional status; returns the previous status
    async fn begin(
        &self,
        action: &'static str,
        allowed: impl Fn(VmStatus) -> bool,
        next: VmStatus,
    ) -> Result<VmStatus> {
        let mut state = self.state.write().await;
        if !allowed(state.status) {
            return Err(DocksideError::InvalidTransition {
                name: self.name.clone(),
                action,
                status: state.status,
            });
        }

        self.generation.fetch_add(1, Ordering::SeqCst);
        let previous = state.status;
        state.status = next;
        state.last_error = None;
        tracing::info!("VM '{}': {} -> {}", self.name, previous, next);
        Ok(previous)
    }

    async fn fail(&self, revert_to: VmStatus, error: &DocksideError, fallback: &str) {
        let message = error.failure_message(fallback);
        tracing::warn!(
            "VM '{}': {} ({}), reverting to {}",
            self.name,
            fallback,
            message,
            revert_to
        );

        let mut state = self.state.write().await;
        state.status = revert_to;
        state.last_error = Some(message);
    }

    /// Publish Running with the VM's actual resources and open the inventories.
    ///
    /// Callers hold the transition lock and refresh once they release it.
    async fn mark_running(&self) {
        let info = match self.colima.status(&self.name).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("VM '{}': could not read status after start: {}", self.name, e);
                None
            }
        };

        {
            let mut state = self.state.write().await;
            state.status = VmStatus::Running;
            if let Some(info) = info {
                state.info = info;
            }
        }
        self.sync.activate();
        tracing::info!("VM '{}' is running", self.name);
    }

    /// Empty the inventories, then publish Stopped
    async fn mark_stopped(&self, reset_info: bool) {
        self.sync.clear().await;

        let mut state = self.state.write().await;
        state.status = VmStatus::Stopped;
        if reset_info {
            state.info = VmInfo::defaults(&self.name);
        } else {
            state.info.address.clear();
        }
        tracing::info!("VM '{}' is stopped", self.name);
    }

    pub async fn start(&self, options: &StartOptions) -> Result<()> {
        {
            let _guard = self.acquire()?;
            self.begin("start", |s| s == VmStatus::Stopped, VmStatus::Starting)
                .await?;

            if let Err(e) = self.colima.start(&self.name, options).await {
                self.fail(VmStatus::Stopped, &e, "Start failed").await;
                return Err(e);
            }
            self.mark_running().await;
        }

        self.sync.refresh().await;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let _guard = self.acquire()?;
        self.begin("stop", |s| s == VmStatus::Running, VmStatus::Stopping)
            .await?;

        match self.colima.stop(&self.name).await {
            Ok(_) => {
                self.mark_stopped(false).await;
                Ok(())
            }
            Err(e) => {
                self.fail(VmStatus::Running, &e, "Stop failed").await;
                Err(e)
            }
        }
    }

    /// Stop, wait for the hypervisor to release resources, start with defaults.
    ///
    /// A failed stop leg leaves the VM running and skips the start leg.
    pub async fn restart(&self) -> Result<()> {
        {
            let _guard = self.acquire()?;
            self.begin("restart", |s| s == VmStatus::Running, VmStatus::Restarting)
                .await?;

            if let Err(e) = self.colima.stop(&self.name).await {
                self.fail(VmStatus::Running, &e, "Stop failed").await;
                return Err(e);
            }

            self.sync.clear().await;
            self.state.write().await.info.address.clear();

            tokio::time::sleep(self.settle_delay).await;

            if let Err(e) = self.colima.start(&self.name, &StartOptions::default()).await {
                self.fail(VmStatus::Stopped, &e, "Start failed").await;
                return Err(e);
            }
            self.mark_running().await;
        }

        self.sync.refresh().await;
        Ok(())
    }

    /// Delete the VM. Only a stopped VM can be removed unless `force` is set.
    pub async fn remove(&self, force: bool) -> Result<()> {
        let _guard = self.acquire()?;
        let previous = self
            .begin(
                "delete",
                |s| force || s == VmStatus::Stopped,
                VmStatus::Deleting,
            )
            .await?;

        match self.colima.delete(&self.name, force).await {
            Ok(_) => {
                self.mark_stopped(true).await;
                Ok(())
            }
            Err(e) => {
                self.fail(previous, &e, "Delete failed").await;
                Err(e)
            }
        }
    }

    /// Re-read the VM status from colima.
    ///
    /// While a transition is in flight the cached snapshot is returned as is;
    /// an observation that raced with a transition is discarded.
    pub async fn fetch_status(&self) -> Result<VmState> {
        if self.transition.try_lock().is_err() {
            return Ok(self.snapshot().await);
        }
        let generation = self.generation.load(Ordering::SeqCst);

        let observed = self.colima.status(&self.name).await;

        let (state, came_up) = {
            let Ok(_guard) = self.transition.try_lock() else {
                return Ok(self.snapshot().await);
            };
            if self.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("VM '{}': discarding stale status observation", self.name);
                return Ok(self.snapshot().await);
            }

            let observed = match observed {
                Ok(observed) => observed,
                Err(e) => {
                    self.state.write().await.last_error = Some(e.to_string());
                    return Err(e);
                }
            };

            let previous = self.status().await;
            let came_up = match observed {
                Some(info) => {
                    {
                        let mut state = self.state.write().await;
                        state.status = VmStatus::Running;
                        state.info = info;
                    }
                    if previous != VmStatus::Running {
                        tracing::info!("VM '{}' observed running", self.name);
                        self.sync.activate();
                    }
                    previous != VmStatus::Running
                }
                None => {
                    self.sync.clear().await;
                    let mut state = self.state.write().await;
                    state.status = VmStatus::Stopped;
                    state.info = VmInfo::defaults(&self.name);
                    if previous != VmStatus::Stopped {
                        tracing::info!("VM '{}' observed stopped", self.name);
                    }
                    false
                }
            };
            (self.snapshot().await, came_up)
        };

        if came_up {
            self.sync.refresh().await;
        }
        Ok(state)
    }
}

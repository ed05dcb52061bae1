//! Docker engine layer for Dockside
//!
//! - [`DockerCli`]: docker CLI wrapper decoding `--format json` output
//! - [`Reconciler`]: cached inventories kept in step with the VM
//! - [`Dispatcher`]: single-resource operations with targeted re-sync

pub mod dispatcher;
pub mod docker;
pub mod reconciler;

pub use dispatcher::Dispatcher;
pub use docker::{ContainerStats, DockerCli, context_for_profile};
pub use reconciler::{Inventory, Reconciler, RefreshReport, aggregate_usage};

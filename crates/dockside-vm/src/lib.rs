//! Colima VM management for Dockside
//!
//! - [`Colima`]: thin wrapper over the `colima` CLI
//! - [`VmController`]: per-profile lifecycle state machine

pub mod colima;
pub mod controller;

pub use colima::{Colima, StartOptions};
pub use controller::{DEFAULT_RESTART_SETTLE, VmController};

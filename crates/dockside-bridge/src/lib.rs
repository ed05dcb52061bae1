//! Frontend bridge for Dockside
//!
//! [`Dockside`] is the single entry point a UI talks to: typed async
//! methods, plus [`BridgeRequest`] for callers that speak JSON.

pub mod facade;
pub mod machine;
pub mod request;

pub use dockside_core::{
    ContainerRecord, ContainerState, DiskUsageRecord, ImageRecord, LogsResult, NetworkRecord,
    OperationResult, ResourceUsage, Runtime, VmState, VmStatus, VolumeRecord,
};
pub use dockside_vm::StartOptions;
pub use facade::Dockside;
pub use machine::Machine;
pub use request::BridgeRequest;

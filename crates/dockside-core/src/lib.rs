//! Dockside core
//!
//! Building blocks shared by the VM controller and the container engine
//! layer: running external commands, decoding their output, the data model
//! handed to the frontend and the uniform operation envelope.

pub mod error;
pub mod exec;
pub mod model;
pub mod outcome;
pub mod parser;
pub mod sync;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{DocksideError, Result};
pub use exec::{Args, CommandOutput, CommandRunner, ProcessRunner};
pub use model::*;
pub use outcome::{LogsResult, OperationResult};
pub use parser::{normalize_gib, parse_percent, parse_record_stream, parse_single_record};
pub use sync::ResourceSync;

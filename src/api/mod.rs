pub mod process;
pub mod sandbox;
pub mod snapshot;

pub use process::ProcessApi;
pub use sandbox::{SandboxApi, SandboxBuilder, SandboxInstance};
pub use snapshot::{CreateSnapshotParams, LogSink, SnapshotApi, SnapshotBuilder, SnapshotSource};

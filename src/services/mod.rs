//! Runner services.

pub mod connectivity;
pub mod payload;
pub mod report;
pub mod rpc_client;
pub mod runner;

pub use connectivity::ConnectivityCheck;
pub use payload::{BundledPayloadSource, FsPayloadSource, PayloadSource};
pub use rpc_client::{RestRpcClient, SqlExecutor};
pub use runner::MigrationRunner;

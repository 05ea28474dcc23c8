pub mod client;
pub mod envelope;
pub mod error;
pub mod host;
pub mod logger;
pub mod memory;

pub use client::Bridge;
pub use envelope::CallEnvelope;
pub use error::{BridgeError, BridgeResult, HostError};
pub use host::HostCall;
pub use logger::RemoteLog;
pub use memory::MemoryHost;

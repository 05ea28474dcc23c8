//! Client half of the TunUp quick-access panel: a logged call/response
//! bridge to the plugin backend, settings sync over it, and the MVU state
//! the panel renders from.

pub mod app;
pub mod backend;
pub mod bridge;
pub mod model;
pub mod msg;

pub use app::{App, Session};
pub use backend::{Backend, SetupReport, SyncReport};
pub use bridge::{Bridge, BridgeError, BridgeResult, CallEnvelope, HostCall, MemoryHost, RemoteLog};
pub use model::settings::{KeyPath, Scalar, Settings, SettingsGroup};

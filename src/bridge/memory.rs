use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::bridge::envelope::CallEnvelope;
use crate::bridge::error::HostError;
use crate::bridge::host::HostCall;

const MEMORY_TOKEN: &str = "memory-session";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub function: String,
    pub args: Value,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<RecordedCall>,
    values: BTreeMap<String, Value>,
    committed: BTreeMap<String, Value>,
    scripted: HashMap<String, CallEnvelope>,
    unreachable: HashSet<String>,
}

/// In-process stand-in for the plugin backend.
///
/// Records every call and answers the settings functions from an in-memory
/// key-value store, the way the real backend does: `set_settings` is visible
/// to `get_settings` right away, `commit_settings` snapshots the store.
/// `get_token`/`check_token` issue and validate a fixed token. Every other
/// function must be scripted with [`MemoryHost::respond`]; unscripted calls
/// come back with `success: false`.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<State>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed a stored setting.
    pub fn with_setting(self, key: &str, value: Value) -> Self {
        self.set_setting(key, value);
        self
    }

    /// Mutate the store behind the client's back.
    pub fn set_setting(&self, key: &str, value: Value) {
        self.state().values.insert(key.to_string(), value);
    }

    /// Answer every later call to `function` with `envelope`.
    pub fn respond(&self, function: &str, envelope: CallEnvelope) {
        let mut state = self.state();
        state.unreachable.remove(function);
        state.scripted.insert(function.to_string(), envelope);
    }

    /// Make every later call to `function` fail at the transport.
    pub fn unreachable(&self, function: &str) {
        self.state().unreachable.insert(function.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Arguments of every recorded call to `function`, in order.
    pub fn calls_to(&self, function: &str) -> Vec<Value> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.function == function)
            .map(|call| call.args.clone())
            .collect()
    }

    pub fn count(&self, function: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.function == function)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn setting(&self, key: &str) -> Option<Value> {
        self.state().values.get(key).cloned()
    }

    pub fn committed(&self) -> BTreeMap<String, Value> {
        self.state().committed.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl HostCall for MemoryHost {
    async fn call(&self, function: &str, args: Value) -> Result<CallEnvelope, HostError> {
        let mut state = self.state();
        state.calls.push(RecordedCall {
            function: function.to_string(),
            args: args.clone(),
        });

        if state.unreachable.contains(function) {
            return Err(HostError::Unavailable(format!("{function} unreachable")));
        }
        if let Some(envelope) = state.scripted.get(function) {
            return Ok(envelope.clone());
        }

        let envelope = match function {
            "get_settings" => {
                let key = args["key"].as_str().unwrap_or_default();
                let value = state
                    .values
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| args["default"].clone());
                CallEnvelope::ok(value)
            }
            "set_settings" => match args["key"].as_str() {
                Some(key) => {
                    state.values.insert(key.to_string(), args["value"].clone());
                    CallEnvelope::empty()
                }
                None => CallEnvelope::failed("set_settings() missing argument: 'key'"),
            },
            "commit_settings" => {
                let snapshot = state.values.clone();
                state.committed = snapshot;
                CallEnvelope::empty()
            }
            "log" | "log_err" => CallEnvelope::empty(),
            "get_token" => CallEnvelope::ok(json!(MEMORY_TOKEN)),
            "check_token" => CallEnvelope::ok(json!(args["token"] == MEMORY_TOKEN)),
            other => CallEnvelope::failed(format!("plugin has no method {other}")),
        };
        Ok(envelope)
    }
}

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::bridge::envelope::{CallEnvelope, CallPayload};
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::host::HostCall;
use crate::bridge::logger::RemoteLog;

const SENDER: &str = "bridge";

/// Calls that stay reachable without a session token.
pub const BOOTSTRAP_CALLS: [&str; 2] = ["get_token", "check_token"];

/// Call/response wrapper around the host primitive.
///
/// Every dispatched call logs its arguments and the raw envelope; failures log
/// one extra error line. `Ok(Some(data))` is a success with payload,
/// `Ok(None)` a success without one.
pub struct Bridge {
    host: Arc<dyn HostCall>,
    log: RemoteLog,
    token_gate: bool,
    token: Mutex<Option<String>>,
}

impl Bridge {
    pub fn new(host: Arc<dyn HostCall>, log: RemoteLog) -> Self {
        Self {
            host,
            log,
            token_gate: false,
            token: Mutex::new(None),
        }
    }

    /// Require a validated session token for everything but [`BOOTSTRAP_CALLS`].
    pub fn with_token_gate(mut self) -> Self {
        self.token_gate = true;
        self
    }

    pub fn log(&self) -> &RemoteLog {
        &self.log
    }

    pub async fn call(&self, function: &str, args: Option<Value>) -> BridgeResult<Option<Value>> {
        if self.token_gate && !BOOTSTRAP_CALLS.iter().any(|name| *name == function) {
            self.authorize(function).await?;
        }
        self.dispatch(function, args.unwrap_or_else(|| json!({}))).await
    }

    /// [`Bridge::call`] and decode the payload. A missing payload is an error here.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        function: &str,
        args: Option<Value>,
    ) -> BridgeResult<T> {
        let data = self.call(function, args).await?;
        self.decode_payload(function, data).await
    }

    /// Decode data from an accepted envelope. A missing or undecodable payload
    /// logs one error line, like any other failed call.
    pub async fn decode_payload<T: DeserializeOwned>(
        &self,
        function: &str,
        data: Option<Value>,
    ) -> BridgeResult<T> {
        match decode(function, data) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.log.log_error(SENDER, &err.to_string(), None).await;
                Err(err)
            }
        }
    }

    async fn dispatch(&self, function: &str, args: Value) -> BridgeResult<Option<Value>> {
        self.log
            .log(SENDER, &format!("{function} call with {args}"))
            .await;

        let envelope = match self.host.call(function, args).await {
            Ok(envelope) => envelope,
            Err(source) => {
                self.log
                    .log(SENDER, &format!("{function} return <transport error: {source}>"))
                    .await;
                let err = BridgeError::Transport {
                    function: function.to_string(),
                    source,
                };
                self.log.log_error(SENDER, &err.to_string(), None).await;
                return Err(err);
            }
        };

        let raw = envelope.to_log_string();
        self.log
            .log(SENDER, &format!("{function} return {raw}"))
            .await;

        match interpret(function, envelope, raw) {
            Ok(data) => Ok(data),
            Err(err) => {
                self.log.log_error(SENDER, &err.to_string(), None).await;
                Err(err)
            }
        }
    }

    async fn authorize(&self, function: &str) -> BridgeResult<()> {
        let token = match self.cached_token() {
            Some(token) => token,
            None => {
                let data = self.dispatch("get_token", json!({})).await?;
                let token: String = self.decode_payload("get_token", data).await?;
                *self.token.lock().unwrap_or_else(|p| p.into_inner()) = Some(token.clone());
                token
            }
        };

        let valid = self
            .dispatch("check_token", json!({ "token": token }))
            .await?;
        if valid == Some(Value::Bool(true)) {
            return Ok(());
        }

        self.token.lock().unwrap_or_else(|p| p.into_inner()).take();
        let err = BridgeError::Unauthorized {
            function: function.to_string(),
        };
        self.log.log_error(SENDER, &err.to_string(), None).await;
        Err(err)
    }

    fn cached_token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

fn decode<T: DeserializeOwned>(function: &str, data: Option<Value>) -> BridgeResult<T> {
    let data = data.ok_or_else(|| BridgeError::MissingPayload {
        function: function.to_string(),
    })?;
    serde_json::from_value(data).map_err(|source| BridgeError::Decode {
        function: function.to_string(),
        source,
    })
}

fn interpret(function: &str, envelope: CallEnvelope, raw: String) -> BridgeResult<Option<Value>> {
    if !envelope.success {
        return Err(BridgeError::Unsuccessful {
            function: function.to_string(),
            envelope: raw,
        });
    }

    let Some(result) = envelope.result.filter(|result| !result.is_null()) else {
        return Ok(None);
    };

    match serde_json::from_value::<CallPayload>(result) {
        Ok(CallPayload { code: 0, data }) => Ok(Some(data)),
        Ok(CallPayload { code, data }) => Err(BridgeError::Rejected {
            function: function.to_string(),
            code,
            data,
            envelope: raw,
        }),
        Err(_) => Err(BridgeError::Malformed {
            function: function.to_string(),
            envelope: raw,
        }),
    }
}

use serde_json::Value;

/// Failure of the host primitive itself, before any envelope exists.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[cfg(feature = "http")]
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("host unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{function} transport failure: {source}")]
    Transport {
        function: String,
        #[source]
        source: HostError,
    },
    #[error("{function} fail: {envelope}")]
    Unsuccessful { function: String, envelope: String },
    #[error("{function} return fail (code {code}): {envelope}")]
    Rejected {
        function: String,
        code: i64,
        data: Value,
        envelope: String,
    },
    #[error("{function} returned a malformed payload: {envelope}")]
    Malformed { function: String, envelope: String },
    #[error("{function} blocked: session token failed validation")]
    Unauthorized { function: String },
    #[error("{function} returned no payload")]
    MissingPayload { function: String },
    #[error("{function} payload did not decode: {source}")]
    Decode {
        function: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BridgeError {
    pub fn function(&self) -> &str {
        match self {
            BridgeError::Transport { function, .. }
            | BridgeError::Unsuccessful { function, .. }
            | BridgeError::Rejected { function, .. }
            | BridgeError::Malformed { function, .. }
            | BridgeError::Unauthorized { function }
            | BridgeError::MissingPayload { function }
            | BridgeError::Decode { function, .. } => function,
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

use async_trait::async_trait;
use serde_json::Value;

use crate::bridge::envelope::CallEnvelope;
use crate::bridge::error::HostError;

/// The loader's remote-call primitive: invoke `function` on the plugin
/// backend with named `args` and get its envelope back.
#[async_trait]
pub trait HostCall: Send + Sync {
    async fn call(&self, function: &str, args: Value) -> Result<CallEnvelope, HostError>;
}

#[cfg(feature = "http")]
pub use http::HttpHost;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::model::config::AppConfig;

    /// Calls plugin methods through the loader's HTTP endpoint.
    #[derive(Debug, Clone)]
    pub struct HttpHost {
        client: reqwest::Client,
        config: AppConfig,
    }

    impl HttpHost {
        pub fn new(config: AppConfig) -> Self {
            Self {
                client: reqwest::Client::new(),
                config,
            }
        }
    }

    #[async_trait]
    impl HostCall for HttpHost {
        async fn call(&self, function: &str, args: Value) -> Result<CallEnvelope, HostError> {
            let mut request = self
                .client
                .post(self.config.method_url(function))
                .json(&serde_json::json!({ "args": args }));

            if !self.config.host.auth_token.is_empty() {
                request = request.header("Authentication", &self.config.host.auth_token);
            }

            let envelope = request
                .send()
                .await?
                .error_for_status()?
                .json::<CallEnvelope>()
                .await?;
            Ok(envelope)
        }
    }
}

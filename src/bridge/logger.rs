use std::sync::Arc;

use serde_json::json;

use crate::bridge::host::HostCall;

/// Logging collaborator. Every line goes to the local subscriber and, when
/// forwarding is on, to the backend's `log` / `log_err` endpoints.
#[derive(Clone)]
pub struct RemoteLog {
    host: Arc<dyn HostCall>,
    forward: bool,
}

impl RemoteLog {
    pub fn new(host: Arc<dyn HostCall>, forward: bool) -> Self {
        Self { host, forward }
    }

    pub async fn log(&self, sender: &str, message: &str) {
        let line = format!("[{sender}] {message}");
        tracing::info!("{line}");
        self.forward("log", line).await;
    }

    pub async fn log_error(&self, sender: &str, message: &str, stack: Option<&str>) {
        let mut line = format!("[{sender}] {message}");
        if let Some(stack) = stack {
            line.push_str("\n-->\n");
            line.push_str(stack);
        }
        tracing::error!("{line}");
        self.forward("log_err", line).await;
    }

    // Goes straight to the host, never through the bridge.
    async fn forward(&self, endpoint: &str, line: String) {
        if !self.forward {
            return;
        }
        if let Err(err) = self.host.call(endpoint, json!({ "message": line })).await {
            tracing::warn!(endpoint, "log forwarding failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::memory::MemoryHost;

    #[tokio::test]
    async fn forwards_prefixed_lines() {
        let host = Arc::new(MemoryHost::new());
        let log = RemoteLog::new(host.clone(), true);

        log.log("bridge", "hello").await;
        log.log_error("bridge", "boom", Some("at frame 1")).await;

        assert_eq!(host.calls_to("log"), [json!({"message": "[bridge] hello"})]);
        assert_eq!(
            host.calls_to("log_err"),
            [json!({"message": "[bridge] boom\n-->\nat frame 1"})]
        );
    }

    #[tokio::test]
    async fn local_only_when_forwarding_is_off() {
        let host = Arc::new(MemoryHost::new());
        let log = RemoteLog::new(host.clone(), false);

        log.log("app", "quiet").await;
        log.log_error("app", "still quiet", None).await;

        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn forwarding_failure_is_swallowed() {
        let host = Arc::new(MemoryHost::new());
        host.unreachable("log");
        let log = RemoteLog::new(host.clone(), true);

        log.log("app", "dropped").await;

        assert_eq!(host.count("log"), 1);
    }
}

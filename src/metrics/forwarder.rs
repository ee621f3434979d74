//! Plaintext line forwarding of measured events to a metrics collector
//!
//! Each event becomes one `namespace.label value timestamp\n` line written to
//! a persistent TCP connection. Writes are not acknowledged, buffered or
//! retried.

use crate::constants::FORWARDER_CLOSE_TIMEOUT;
use crate::errors::{ErrorContext, Result};
use crate::events::{EventSink, MeasuredEvent};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Serialize an event as a collector line.
///
/// Dots inside the label would collide with the namespace separator, so
/// they become hyphens.
pub fn format_metric_line(namespace: &str, event: &MeasuredEvent) -> String {
    format!(
        "{}.{} {} {}\n",
        namespace,
        event.label.replace('.', "-"),
        event.duration_ms,
        event.observed_at
    )
}

/// Event sink owning one collector connection
#[derive(Debug)]
pub struct MetricsForwarder {
    namespace: String,
    peer: String,
    // Serializes writes from concurrent publishers; `None` once closed
    stream: Mutex<Option<TcpStream>>,
}

impl MetricsForwarder {
    /// Open the collector connection
    pub async fn connect(addr: &str, namespace: impl Into<String>) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_telemetry_context(&format!("Failed to connect to metrics collector {}", addr))?;
        stream.set_nodelay(true)?;
        debug!("Connected to metrics collector {}", addr);

        Ok(Self {
            namespace: namespace.into(),
            peer: addr.to_string(),
            stream: Mutex::new(Some(stream)),
        })
    }

    /// Half-close the connection so the collector sees EOF, then drop it.
    /// Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };

        match tokio::time::timeout(FORWARDER_CLOSE_TIMEOUT, stream.shutdown()).await {
            Ok(result) => result.with_telemetry_context("Failed to shut down metrics connection")?,
            Err(_) => warn!("Metrics connection to {} did not shut down in time", self.peer),
        }

        debug!("Closed metrics connection to {}", self.peer);
        Ok(())
    }

    #[cfg(test)]
    pub async fn is_open(&self) -> bool {
        self.stream.lock().await.is_some()
    }
}

#[async_trait]
impl EventSink for MetricsForwarder {
    fn name(&self) -> &str {
        "metrics-forwarder"
    }

    async fn on_event(&self, event: &MeasuredEvent) -> Result<()> {
        let line = format_metric_line(&self.namespace, event);
        let mut guard = self.stream.lock().await;
        let stream = guard
            .as_mut()
            .with_telemetry_context("Metrics connection is closed")?;

        stream
            .write_all(line.as_bytes())
            .await
            .with_telemetry_context(&format!("Failed to write metric to {}", self.peer))
    }
}

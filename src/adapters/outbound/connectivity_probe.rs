//! Connectivity Probes
//!
//! Two ways of answering "are we online":
//! - `HttpConnectivityProbe` actively sends a HEAD request to a known URL
//! - `SignalConnectivityProbe` remembers the last `{online}` signal

use crate::domain::errors::TransportError;
use crate::domain::ports::ConnectivityProbe;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Active HTTP probe.
///
/// Any HTTP response counts as online, whatever its status; only a failure
/// to reach the probe URL within the timeout counts as offline.
pub struct HttpConnectivityProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpConnectivityProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("client error: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn is_online(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "connectivity probe failed");
                false
            }
        }
    }
}

/// Probe driven by explicit connectivity signals.
pub struct SignalConnectivityProbe {
    online: AtomicBool,
}

impl SignalConnectivityProbe {
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
        }
    }
}

impl Default for SignalConnectivityProbe {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConnectivityProbe for SignalConnectivityProbe {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn observe(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

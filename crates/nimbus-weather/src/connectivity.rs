//! Network reachability probes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;

/// Answers "can the device reach the network right now".
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Probe whose answer is set explicitly (offline mode, tests).
#[derive(Debug)]
pub struct ManualProbe {
    online: AtomicBool,
}

impl ManualProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for ManualProbe {
    async fn is_connected(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Probe that opens a TCP connection to the weather API host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    /// Target the host and port of `base_url`. Returns `None` for URLs without a host.
    pub fn for_base_url(base_url: &str, timeout: Duration) -> Option<Self> {
        let url = url::Url::parse(base_url).ok()?;
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(format!("{}:{}", host, port), timeout))
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_connected(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Connectivity probe to {} failed: {}", self.address, e);
                false
            }
            Err(_) => {
                tracing::debug!("Connectivity probe to {} timed out", self.address);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[tokio::test]
    async fn test_manual_probe_toggles() {
        let probe = ManualProbe::new(false);
        assert!(!probe.is_connected().await);
        probe.set_online(true);
        assert!(probe.is_connected().await);
    }

    #[test]
    fn test_probe_address_from_base_url() {
        let probe = TcpProbe::for_base_url(
            "https://api.openweathermap.org/data/2.5",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(probe.address(), "api.openweathermap.org:443");

        let probe =
            TcpProbe::for_base_url("http://127.0.0.1:8080/api", Duration::from_secs(1)).unwrap();
        assert_eq!(probe.address(), "127.0.0.1:8080");

        assert!(TcpProbe::for_base_url("not a url", Duration::from_secs(1)).is_none());
    }

    #[tokio::test]
    async fn test_tcp_probe_reaches_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(probe.is_connected().await);
    }

    #[tokio::test]
    async fn test_tcp_probe_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(!probe.is_connected().await);
    }
}

//! Discovery of the clipper service on a small range of local ports.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::error::{ClipperError, Result};

use super::transport::{Request, Transport};
use super::{PING_PATH, SENTINEL};

/// Where the service was last found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub port: u16,
    pub connected: bool,
}

/// Probes candidate ports in ascending order until one answers `/ping`
/// with the sentinel body.
///
/// Every [`locate`](Self::locate) call scans the whole range again; a port
/// found earlier is not trusted once the endpoint is disconnected.
pub struct ServiceLocator {
    transport: Arc<dyn Transport>,
    config: ServiceConfig,
    endpoint: ServiceEndpoint,
}

impl ServiceLocator {
    pub fn new(transport: Arc<dyn Transport>, config: ServiceConfig) -> Self {
        let endpoint = ServiceEndpoint {
            port: config.base_port,
            connected: false,
        };
        Self {
            transport,
            config,
            endpoint,
        }
    }

    /// Scan the port range once. Returns the adopted port, or `None` when no
    /// candidate identified itself; the endpoint is then disconnected.
    ///
    /// Probes run one after another, so a fully absent service costs up to
    /// `ports × timeout`.
    pub async fn locate(&mut self) -> Option<u16> {
        for port in self.config.ports() {
            let url = format!("http://{}:{}{}", self.config.host, port, PING_PATH);
            match self
                .transport
                .send(Request::get(url, self.config.timeout()))
                .await
            {
                Ok(body) if body == SENTINEL => {
                    info!(port, "Found clipper service");
                    self.endpoint = ServiceEndpoint {
                        port,
                        connected: true,
                    };
                    return Some(port);
                }
                Ok(body) => {
                    debug!(port, len = body.len(), "Port answered without the sentinel");
                }
                Err(e) => {
                    debug!(port, error = %e, "No service on port");
                }
            }
        }

        debug!(
            first = self.config.base_port,
            span = self.config.port_span,
            "Clipper service not found"
        );
        self.endpoint.connected = false;
        None
    }

    /// Mark the endpoint as lost; the next [`locate`](Self::locate) rescans.
    pub fn disconnect(&mut self) {
        self.endpoint.connected = false;
    }

    pub fn endpoint(&self) -> ServiceEndpoint {
        self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.endpoint.connected
    }

    /// `http://host:port` of the located service.
    pub fn base_url(&self) -> Result<String> {
        if !self.endpoint.connected {
            return Err(ClipperError::NotConnected);
        }
        Ok(format!("http://{}:{}", self.config.host, self.endpoint.port))
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::transport::testing::FakeTransport;

    fn locator(fake: &Arc<FakeTransport>) -> ServiceLocator {
        ServiceLocator::new(fake.clone(), ServiceConfig::default())
    }

    #[tokio::test]
    async fn test_locate_stops_at_first_sentinel() {
        let fake = Arc::new(
            FakeTransport::new().on_url("http://127.0.0.1:41187/ping", SENTINEL),
        );
        let mut loc = locator(&fake);

        assert_eq!(loc.locate().await, Some(41187));

        let urls: Vec<String> = fake.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://127.0.0.1:41184/ping",
                "http://127.0.0.1:41185/ping",
                "http://127.0.0.1:41186/ping",
                "http://127.0.0.1:41187/ping",
            ]
        );
        assert!(loc.is_connected());
        assert_eq!(loc.base_url().unwrap(), "http://127.0.0.1:41187");
    }

    #[tokio::test]
    async fn test_wrong_body_is_not_a_match() {
        let fake = Arc::new(
            FakeTransport::new()
                .on_url("http://127.0.0.1:41184/ping", "SomethingElse")
                .on_url("http://127.0.0.1:41185/ping", "JoplinClipperServer\n")
                .on_url("http://127.0.0.1:41190/ping", SENTINEL),
        );
        let mut loc = locator(&fake);
        assert_eq!(loc.locate().await, Some(41190));
        assert_eq!(fake.requests().len(), 7);
    }

    #[tokio::test]
    async fn test_not_found_scans_whole_range_and_disconnects() {
        let fake = Arc::new(
            FakeTransport::new().on_url("http://127.0.0.1:41184/ping", SENTINEL),
        );
        let mut loc = locator(&fake);
        assert_eq!(loc.locate().await, Some(41184));

        // Service goes away: a new locator pass over an empty range.
        let empty = Arc::new(FakeTransport::new());
        let mut loc = ServiceLocator {
            transport: empty.clone(),
            ..loc
        };
        assert_eq!(loc.locate().await, None);
        assert_eq!(empty.requests().len(), 11);
        assert!(!loc.is_connected());
        assert!(matches!(loc.base_url(), Err(ClipperError::NotConnected)));
    }

    #[tokio::test]
    async fn test_base_url_requires_connection() {
        let fake = Arc::new(FakeTransport::new());
        let loc = locator(&fake);
        assert!(matches!(loc.base_url(), Err(ClipperError::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_forces_rescan() {
        let fake = Arc::new(
            FakeTransport::new().on_url("http://127.0.0.1:41186/ping", SENTINEL),
        );
        let mut loc = locator(&fake);
        loc.locate().await;
        loc.disconnect();
        assert!(!loc.is_connected());
        assert_eq!(loc.locate().await, Some(41186));
        // Two full passes up to the match, nothing cached.
        assert_eq!(fake.requests().len(), 6);
    }
}

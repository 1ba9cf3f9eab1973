use crate::api::LiFiClient;
use crate::bubbles::BubbleLayoutEngine;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::metrics;
use crate::web::proxy::{routes, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use log::info;

pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: &Config) -> Result<Self> {
        let state = AppState {
            lifi: LiFiClient::new(&config.lifi)?,
            bubbles: BubbleLayoutEngine::new(config.bubbles.clone()),
        };
        Ok(Self { state: Arc::new(state) })
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Serves until ctrl-c.
    pub async fn start(&self, host: &str, port: u16) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| {
                Error::ConfigError(format!("Invalid listen address {}:{}: {}", host, port, e))
            })?;

        metrics::init();

        let (bound, server) = warp::serve(routes(self.state.clone()))
            .try_bind_with_graceful_shutdown(addr, async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .map_err(|e| Error::NetworkError(format!("Failed to bind {}: {}", addr, e)))?;

        info!(
            "Starting web server on {} (upstream {}, timeout {:?})",
            bound,
            self.state.lifi.base_url(),
            self.state.lifi.timeout()
        );
        server.await;
        info!("Web server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_web_server_creation() {
        let server = WebServer::new(&Config::default()).unwrap();
        assert_eq!(server.state().lifi.base_url(), "https://li.quest/v1");
        assert_eq!(server.state().lifi.timeout().as_secs(), 15);
    }

    #[tokio::test]
    async fn test_invalid_host_is_config_error() {
        let server = WebServer::new(&Config::default()).unwrap();
        let result = server.start("not a host", 3000).await;
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}

//! Test server management.
//!
//! Runs a braid Gateway inside the test's runtime on ephemeral ports.

use braid::config::Config;
use braid::network::Gateway;
use braid::state::{HandoffStats, Matrix, MatrixHandle};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

const TEST_CONFIG: &str = r#"
[server]
name = "test.server"
network = "TestNet"
description = "Test IRC Server"
motd = ["Test Server"]

[listen]
address = "127.0.0.1:0"
relay_address = "127.0.0.1:0"
"#;

/// A running test server. Shuts down when dropped.
pub struct TestServer {
    addr: SocketAddr,
    relay_addr: Option<SocketAddr>,
    state: MatrixHandle,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Start a server with the default test configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(TEST_CONFIG).await
    }

    /// Start a server from a TOML configuration string.
    pub async fn spawn_with(config: &str) -> anyhow::Result<Self> {
        let config = Config::parse(config)?;
        let state = MatrixHandle::new(Matrix::new(config.server_info(), config.matrix_config()));
        let shutdown = CancellationToken::new();
        let gateway = Gateway::bind(
            config.listen.address,
            config.listen.relay_address,
            state.clone(),
            config.endpoint_settings(),
            shutdown.clone(),
        )
        .await?;
        let addr = gateway.local_addr()?;
        let relay_addr = gateway.relay_addr();
        tokio::spawn(gateway.run());
        Ok(Self {
            addr,
            relay_addr,
            state,
            shutdown,
        })
    }

    /// Client listener address as `host:port`.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    #[allow(dead_code)]
    pub fn relay_address(&self) -> String {
        self.relay_addr
            .map(|a| a.to_string())
            .expect("relay listener not configured")
    }

    #[allow(dead_code)]
    pub fn handoff_stats(&self) -> HandoffStats {
        self.state.stats()
    }

    #[allow(dead_code)]
    pub async fn user_count(&self) -> usize {
        self.state.acquire().await.user_count()
    }

    #[allow(dead_code)]
    pub async fn channel_count(&self) -> usize {
        self.state.acquire().await.channel_count()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

//! Acquirer application lifecycle

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api;
use crate::config::AcquirerConfig;
use crate::gateway::IssuerGateway;
use crate::repository::Repository;
use crate::service::Service;

pub struct App {
    config: AcquirerConfig,
}

impl App {
    pub fn new(config: AcquirerConfig) -> Self {
        Self { config }
    }

    /// Run until the cancellation token fires
    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        info!("starting acquirer");

        let repo = Arc::new(Repository::new());
        let gateway = Arc::new(IssuerGateway::new(&self.config.issuer_addr));
        let service = Arc::new(Service::new(repo, gateway));

        let listener = tokio::net::TcpListener::bind(&self.config.http_addr)
            .await
            .context("binding http listener")?;
        info!(addr = %listener.local_addr()?, "http server listening");

        axum::serve(listener, api::router(service))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .context("serving http")?;

        info!("acquirer stopped");
        Ok(())
    }
}

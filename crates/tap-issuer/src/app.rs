//! Issuer application lifecycle
//!
//! Wires the repository, service, ISO 8583 endpoint and HTTP API together
//! and tears them down in order on shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tap_iso8583::spec::auth_spec;
use tap_iso8583::Server;

use crate::api;
use crate::authorize::AuthorizationEndpoint;
use crate::config::IssuerConfig;
use crate::personalizer::PersonalizerClient;
use crate::repository::Repository;
use crate::service::Service;

pub struct App {
    config: IssuerConfig,
}

impl App {
    pub fn new(config: IssuerConfig) -> Self {
        Self { config }
    }

    /// Run until the cancellation token fires
    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        info!("starting issuer");

        let repo = Arc::new(Repository::new());
        let personalizer = self
            .config
            .personalizer_url
            .as_deref()
            .map(PersonalizerClient::new);
        let service = Arc::new(Service::new(repo, personalizer));

        let iso_server = Server::start(
            &self.config.iso8583_addr,
            auth_spec(),
            Arc::new(AuthorizationEndpoint::new(service.clone())),
        )
        .await
        .context("starting iso8583 server")?;

        let listener = tokio::net::TcpListener::bind(&self.config.http_addr)
            .await
            .context("binding http listener")?;
        info!(addr = %listener.local_addr()?, "http server listening");

        let http_cancel = cancel.clone();
        axum::serve(listener, api::router(service))
            .with_graceful_shutdown(async move { http_cancel.cancelled().await })
            .await
            .context("serving http")?;

        iso_server.shutdown().await;
        info!("issuer stopped");
        Ok(())
    }
}

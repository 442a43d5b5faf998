//! Personalizer application lifecycle
//!
//! The worker owns the one physical reader; the HTTP API only sees the
//! submission handle.

use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tap_card::CardReader;

use crate::api;
use crate::config::PersonalizerConfig;
use crate::service;
use crate::watcher::PcscWatcher;
use crate::writer::PcscWriter;

pub struct App {
    config: PersonalizerConfig,
}

impl App {
    pub fn new(config: PersonalizerConfig) -> Self {
        Self { config }
    }

    /// Run until the cancellation token fires
    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        info!("starting card personalizer");

        let mut reader = CardReader::new().context("establishing PC/SC context")?;
        reader
            .select_containing(&self.config.reader_name)
            .with_context(|| format!("no card reader matching {:?}", self.config.reader_name))?;

        let reader = Arc::new(Mutex::new(reader));
        let watcher = Arc::new(PcscWatcher::new(reader.clone()));
        let writer = Arc::new(PcscWriter::new(reader));

        let (handle, worker) = service::spawn(watcher, writer, cancel.clone());

        let listener = tokio::net::TcpListener::bind(&self.config.http_addr)
            .await
            .context("binding http listener")?;
        info!(addr = %listener.local_addr()?, "http server listening");

        let http_cancel = cancel.clone();
        axum::serve(listener, api::router(handle))
            .with_graceful_shutdown(async move { http_cancel.cancelled().await })
            .await
            .context("serving http")?;

        cancel.cancel();
        worker.await.context("joining worker")?;

        info!("card personalizer stopped");
        Ok(())
    }
}

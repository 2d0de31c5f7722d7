// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! xlog ingester binary
//!
//! Consumes shipper events from the configured queue and commits them into
//! day partitions until Ctrl-C or SIGTERM.
//!
//! ## Environment Variables
//!
//! - `XLOG_QUEUE_URL`: `redb://<path>` or `redis://...` (default: `redb://./data/queue.redb`)
//! - `XLOG_QUEUE_KEY`: queue key (default: `xlog`)
//! - `XLOG_STORE_PATH`: store file (default: `./data/xlog.redb`)
//! - `XLOG_PARTITION_PREFIX`, `XLOG_PARTITION_OFFSET`, `XLOG_INDEXED_FIELDS`
//! - `XLOG_BATCH_SIZE`, `XLOG_BATCH_WINDOW_MS`, `XLOG_POLL_TIMEOUT_MS`
//! - `XLOG_LOG_FORMAT`: `json` or `pretty`; `RUST_LOG` sets the filter

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xlog_core::Normalizer;
use xlog_ingest::{IngestConfig, IngestLoop, LogFormat, QueueUrl};
use xlog_source::{RecordSource, RedbQueue};
use xlog_store::{MetricsStore, RedbStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = IngestConfig::from_env()?;
    init_tracing(config.log_format);

    info!(
        queue = ?config.queue,
        queue_key = %config.queue_key,
        store = %config.store_path.display(),
        prefix = %config.partition_prefix,
        "starting xlog ingester"
    );

    let store = RedbStore::open(&config.store_path, config.partitioner())
        .with_context(|| format!("opening store at {}", config.store_path.display()))?
        .with_indexed_fields(config.indexed_fields.clone());
    let store = MetricsStore::new(store);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        // The loop may already have exited on a source failure.
        let _ = shutdown_tx.send(true);
    });

    match &config.queue {
        QueueUrl::Redb(path) => {
            let source = RedbQueue::open(path, &config.queue_key, config.poll_timeout)
                .with_context(|| format!("opening queue at {}", path.display()))?;
            run(source, &store, &config, shutdown_rx).await?;
        }
        #[cfg(feature = "redis")]
        QueueUrl::Redis(url) => {
            let source = xlog_source::RedisQueue::connect(url, &config.queue_key, config.poll_timeout)
                .await
                .context("connecting to redis queue")?;
            run(source, &store, &config, shutdown_rx).await?;
        }
        #[cfg(not(feature = "redis"))]
        QueueUrl::Redis(_) => {
            anyhow::bail!("XLOG_QUEUE_URL is a redis URL but this build lacks the `redis` feature");
        }
    }

    let stats = store.stats().await;
    info!(
        commits = stats.commits,
        failed_commits = stats.failed_commits,
        documents = stats.documents_written,
        "xlog ingester shutdown complete"
    );
    Ok(())
}

async fn run<S: RecordSource>(
    source: S,
    store: &MetricsStore<RedbStore>,
    config: &IngestConfig,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut ingest = IngestLoop::new(source, store.clone(), Normalizer::default(), config.batch_config());
    ingest.run(shutdown).await?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

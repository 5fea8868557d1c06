use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cluster_health::config::{Config, Options};
use cluster_health::error::{AnalyzerError, AnalyzerResult};
use cluster_health::processor::Processor;
use cluster_health::server::{serve, Metrics};
use cluster_health::telemetry::{AlertmanagerClient, PromClient, Querier, SilenceSource};
use cluster_health::common::time::current_time_millis;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let options = Options::parse();
    let config = match options.validate() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(config).await {
        error!(error = %err, "fatal");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> AnalyzerResult<()> {
    let metrics = Arc::new(Metrics::new());
    let token = CancellationToken::new();

    let querier: Arc<dyn Querier> =
        Arc::new(PromClient::new(&config.prom_url, config.interval)?);
    let silences: Option<Arc<dyn SilenceSource>> = match &config.alertmanager_url {
        Some(url) => Some(Arc::new(AlertmanagerClient::new(url, config.interval)?)),
        None => {
            warn!("no alertmanager url configured, silences will not be reflected");
            None
        }
    };

    // bind before spawning so a busy port is a startup failure, not a log line
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|err| AnalyzerError::ServeError(format!("{}: {err}", config.listen_addr)))?;
    let server = tokio::spawn(serve(listener, Arc::clone(&metrics), token.clone()));

    let mut processor = Processor::new(querier, silences, Arc::clone(&metrics), config.interval);
    if config.disable_incidents {
        info!("incident grouping disabled");
    } else {
        processor.restore_groups(current_time_millis()).await;
    }
    let driver = tokio::spawn(processor.run(token.clone()));

    shutdown_signal().await;
    info!("shutdown signal received");
    token.cancel();

    let _ = driver.await;
    match server.await {
        Ok(result) => result,
        Err(err) => Err(AnalyzerError::ServeError(err.to_string())),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

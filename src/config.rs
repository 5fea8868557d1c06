use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::error::{AnalyzerError, AnalyzerResult};

/// Command-line and environment surface of the daemon.
#[derive(Debug, Parser)]
#[command(
    name = "cluster-health",
    about = "Groups firing cluster alerts into incidents and exports a component health map",
    version
)]
pub struct Options {
    /// Processing interval in seconds.
    #[arg(long, default_value_t = 30)]
    pub interval: u64,

    /// Base URL of the Prometheus-compatible telemetry API.
    #[arg(long, env = "PROM_URL")]
    pub prom_url: Option<String>,

    /// Base URL of the Alertmanager API. Silence lookups are skipped when unset.
    #[arg(long, env = "ALERTMANAGER_URL")]
    pub alertmanager_url: Option<String>,

    /// Address the metrics endpoint listens on.
    #[arg(long, default_value = "0.0.0.0:8443")]
    pub listen_addr: String,

    /// Path to a kubeconfig granting cluster access (reserved for the
    /// per-object health evaluator).
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Path to the serving certificate.
    #[arg(long)]
    pub tls_cert_file: Option<PathBuf>,

    /// Path to the serving private key.
    #[arg(long)]
    pub tls_private_key_file: Option<PathBuf>,

    /// Serve without authentication. Never use outside test environments.
    #[arg(long, default_value_t = false)]
    pub disable_auth_for_testing: bool,

    /// Disable incident grouping; health entries carry no group ids.
    #[arg(long, default_value_t = false)]
    pub disable_incidents: bool,
}

/// Resolved, validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub interval: Duration,
    pub prom_url: String,
    pub alertmanager_url: Option<String>,
    pub listen_addr: SocketAddr,
    pub disable_incidents: bool,
}

impl Options {
    /// Resolves and checks everything that must fail fast: URLs, the listen
    /// address and the TLS material. Any error here exits the process.
    pub fn validate(&self) -> AnalyzerResult<Config> {
        let prom_url = self
            .prom_url
            .clone()
            .ok_or_else(|| {
                AnalyzerError::InvalidConfiguration(
                    "--prom-url or PROM_URL is required".to_string(),
                )
            })?;
        Url::parse(&prom_url)
            .map_err(|err| AnalyzerError::InvalidConfiguration(format!("prom url: {err}")))?;
        if let Some(url) = &self.alertmanager_url {
            Url::parse(url).map_err(|err| {
                AnalyzerError::InvalidConfiguration(format!("alertmanager url: {err}"))
            })?;
        }

        let listen_addr: SocketAddr = self.listen_addr.parse().map_err(|err| {
            AnalyzerError::InvalidConfiguration(format!("listen address: {err}"))
        })?;

        if self.interval == 0 {
            return Err(AnalyzerError::InvalidConfiguration(
                "interval must be positive".to_string(),
            ));
        }

        self.validate_tls()?;

        Ok(Config {
            interval: Duration::from_secs(self.interval),
            prom_url,
            alertmanager_url: self.alertmanager_url.clone(),
            listen_addr,
            disable_incidents: self.disable_incidents,
        })
    }

    /// TLS termination is delegated to the serving front end; the material is
    /// only checked for presence and readability here.
    fn validate_tls(&self) -> AnalyzerResult<()> {
        match (&self.tls_cert_file, &self.tls_private_key_file) {
            (None, None) => Ok(()),
            (Some(cert), Some(key)) => {
                read_pem(cert)?;
                read_pem(key)?;
                Ok(())
            }
            _ => Err(AnalyzerError::InvalidConfiguration(
                "--tls-cert-file and --tls-private-key-file must be set together".to_string(),
            )),
        }
    }
}

fn read_pem(path: &PathBuf) -> AnalyzerResult<()> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AnalyzerError::InvalidConfiguration(format!("{}: {err}", path.display()))
    })?;
    if !content.contains("-----BEGIN") {
        return Err(AnalyzerError::InvalidConfiguration(format!(
            "{}: not PEM encoded",
            path.display()
        )));
    }
    Ok(())
}

//! Shared plumbing for the uninats example programs.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use uninats::config::DEFAULT_ADDRESS;
use uninats::{Client, ClientConfig};
use uninats_transport_nats::{NatsTransport, NatsTransportOptions};

/// Client type used by every program.
pub type NatsClient = Client<NatsTransport>;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client error
    #[error(transparent)]
    Client(#[from] uninats::Error<uninats_transport_nats::Error>),
}

/// Connection flags shared by every program.
#[derive(Clone, Debug, Args)]
pub struct ConnectArgs {
    /// NATS server address
    #[arg(long, default_value = DEFAULT_ADDRESS, env = "UNINATS_URL")]
    pub url: String,

    /// Connection name reported to the server
    #[arg(long, env = "UNINATS_NAME")]
    pub name: Option<String>,

    /// Token authentication
    #[arg(long, env = "UNINATS_TOKEN")]
    pub token: Option<String>,

    /// Path to a NATS credentials file
    #[arg(long, env = "UNINATS_CREDS")]
    pub creds: Option<PathBuf>,

    /// JetStream domain to publish into
    #[arg(long, env = "UNINATS_JETSTREAM_DOMAIN")]
    pub jetstream_domain: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 5, env = "UNINATS_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// Send handler failures back as error replies
    #[arg(long, env = "UNINATS_ERROR_REPLIES")]
    pub error_replies: bool,

    /// Log at debug level
    #[arg(long, env = "UNINATS_DEBUG")]
    pub debug: bool,
}

impl ConnectArgs {
    /// Client configuration described by the flags.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.url.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }

    /// Transport options described by the flags.
    #[must_use]
    pub fn transport_options(&self) -> NatsTransportOptions {
        NatsTransportOptions {
            name: self.name.clone(),
            token: self.token.clone(),
            credentials_file: self.creds.clone(),
            jetstream_domain: self.jetstream_domain.clone(),
            error_replies: self.error_replies,
            ..Default::default()
        }
    }

    /// Creates and connects a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(&self) -> Result<NatsClient, Error> {
        let client: NatsClient = Client::new(self.client_config(), self.transport_options());
        client.connect().await?;

        Ok(client)
    }
}

/// Installs the fmt subscriber.
pub fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt().with_max_level(level).init();
}

/// Returns a token cancelled on SIGINT or SIGTERM.
#[must_use]
pub fn shutdown_token() -> CancellationToken {
    let shutdown_token = CancellationToken::new();

    let signal_shutdown_token = shutdown_token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;

        info!("shutting down");
        signal_shutdown_token.cancel();
    });

    shutdown_token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM"),
                _ = sigint.recv() => info!("received SIGINT"),
            }
        }
        _ => {
            warn!("signal handlers unavailable, waiting for ctrl-c");
            let _ = tokio::signal::ctrl_c().await;
            info!("received interrupt signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received interrupt signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        connect: ConnectArgs,
    }

    #[test]
    fn test_connect_args_defaults() {
        let cli = TestCli::try_parse_from(["test"]).unwrap();

        assert_eq!(cli.connect.request_timeout_secs, 5);
        assert!(!cli.connect.error_replies);
        assert!(cli.connect.creds.is_none());
    }

    #[test]
    fn test_connect_args_map_to_options() {
        let cli = TestCli::try_parse_from([
            "test",
            "--url",
            "nats://localhost:4333",
            "--name",
            "publisher",
            "--request-timeout-secs",
            "2",
            "--error-replies",
        ])
        .unwrap();

        let config = cli.connect.client_config();
        assert_eq!(config.address, "nats://localhost:4333");
        assert_eq!(config.request_timeout, Duration::from_secs(2));

        let options = cli.connect.transport_options();
        assert_eq!(options.name.as_deref(), Some("publisher"));
        assert!(options.error_replies);
        assert!(options.token.is_none());
    }
}

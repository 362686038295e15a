//! Headless notification host speaking newline-delimited JSON.
//!
//! Reads `MethodCall` messages from stdin, answers them through the
//! notification plugin, and writes `MethodResponse` and `EventEnvelope`
//! messages to stdout. Periodic polling runs on the in-process job host and
//! notifications are rendered to the log.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use notification_master::app_dirs;
use notification_master::config::NotifierConfig;
use notification_master::feed::FeedClient;
use notification_master::host::stdio::run_stdio_bridge;
use notification_master::host::{HostCapabilities, NotificationPlugin};
use notification_master::platform::{HttpImageLoader, TokioJobHost, create_renderer};
use notification_master::store::JsonFileStore;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for the JSON protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = NotifierConfig::default_config_path();
    let config = NotifierConfig::load_or_default(&config_path)?;
    let settings_path = app_dirs::settings_file();
    tracing::info!(
        config = %config_path.display(),
        settings = %settings_path.display(),
        "notification-host starting"
    );

    let host = HostCapabilities {
        renderer: Arc::from(create_renderer()),
        images: Arc::new(HttpImageLoader::new(&config.feed)?),
        feed: Arc::new(FeedClient::new(&config.feed)?),
        jobs: Arc::new(TokioJobHost::new(Duration::from_secs(
            config.polling.max_backoff_secs,
        ))),
        store: Arc::new(JsonFileStore::open(settings_path)?),
    };
    let plugin = Arc::new(NotificationPlugin::new(&config, host));
    let active = plugin.restore();
    tracing::info!(active = %active, "restored notification service");

    run_stdio_bridge(plugin).await.map_err(|e| {
        tracing::error!(error = %e, "notification-host exited with error");
        anyhow::anyhow!("notification-host failed: {e}")
    })?;

    tracing::info!("notification-host shut down cleanly");
    Ok(())
}

use anyhow::Result;
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::Config;

/// Filter for messages logged before the configured subscriber exists.
pub fn bootstrap_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Plain fmt subscriber used while configuration is being loaded.
pub fn bootstrap_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .finish()
}

/// Load configuration with a scoped subscriber so its warnings reach stderr.
pub fn load_config() -> Result<Config> {
    let subscriber = bootstrap_subscriber(bootstrap_filter(), std::io::stderr);
    tracing::subscriber::with_default(subscriber, Config::load)
}

/// Install the global tracing subscriber described by `config.logging`.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format.to_lowercase().as_str() {
        "json" => registry.with(fmt::layer().json()).init(),
        "compact" => registry.with(fmt::layer().compact().with_target(false)).init(),
        _ => registry.with(fmt::layer().pretty()).init(),
    }
}

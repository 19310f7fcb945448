// Tracing initialization

use std::sync::Once;

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::LoggingConfig;

static TEST_INIT: Once = Once::new();

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With `json` set, events are
/// written as JSON lines; otherwise a compact human-readable format is used.
/// Both formats go to stderr, keeping stdout for command output. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(level: &str, json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing::subscriber::set_global_default(build_subscriber(level, json, std::io::stderr)?)?;
    Ok(())
}

fn build_subscriber<W>(
    level: &str,
    json: bool,
    writer: W,
) -> Result<Box<dyn Subscriber + Send + Sync>, Box<dyn std::error::Error + Send + Sync>>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let subscriber = Registry::default().with(env_filter);

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_writer(writer);
        Ok(Box::new(subscriber.with(json_layer)))
    } else {
        let fmt_layer = fmt::layer()
            .compact()
            .with_target(true)
            .with_level(true)
            .with_writer(writer);
        Ok(Box::new(subscriber.with(fmt_layer)))
    }
}

/// Install the subscriber described by `config`
pub fn init_from_config(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing(&config.level, config.json)
}

/// Initialize debug-level logging once per test binary
pub fn init_test_logging() {
    TEST_INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let fmt_layer = fmt::layer().with_target(true).with_test_writer();
        let _ = tracing::subscriber::set_global_default(Registry::default().with(env_filter).with(fmt_layer));
    });
}

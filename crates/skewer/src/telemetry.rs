//! Structured logging setup for binaries built on skewer.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the application.

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};
use crate::error::{Error, Result};

/// Install a global subscriber.
///
/// `RUST_LOG` takes precedence over `log_level` when it is set. With
/// `json_format` every event is written as one JSON object per line.
pub fn init_tracing(log_level: &str, json_format: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = Registry::default().with(env_filter);

    let installed = if json_format {
        registry.with(json_layer()).try_init()
    } else {
        registry.with(pretty_layer()).try_init()
    };
    installed.map_err(|e| Error::Config(format!("failed to initialize tracing subscriber: {e}")))
}

fn json_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(true)
        .with_level(true)
}

fn pretty_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_span_events(FmtSpan::CLOSE)
}

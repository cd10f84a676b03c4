//! Wirecast wireless tally bridge.

use clap::Parser;
use std::time::Duration;
use tallybridge::{
    internet_facing_ipv4, BridgeConfig, BroadcastConfig, Error, Result, WirecastLayer,
};
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

/// Broadcasts Wirecast tally state to wireless tally lights.
///
/// Shots are assigned to tally lights with a `[T:n,...]` tag in the shot's
/// name. Only one master layer of the first open document is followed.
///
/// Wirecast is reached through its object model, which needs a host-provided
/// `WirecastDocument` binding. This program validates its options, and exits
/// if no binding is available.
#[derive(Debug, Parser)]
#[clap(verbatim_doc_comment)]
struct CliParser {
    /// Master layer to follow, from 1 to 5.
    #[clap(short, long, default_value_t = WirecastLayer::default(), value_parser = parse_layer)]
    pub layer: WirecastLayer,

    /// Bind to the internet connected network adapter.
    #[clap(short, long)]
    pub bind: bool,

    /// Milliseconds between tally broadcasts.
    #[clap(long, default_value_t = 250, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Milliseconds to wait for Wirecast on each cycle, shorter than the interval.
    #[clap(long, default_value_t = 200, value_parser = clap::value_parser!(u64).range(1..))]
    pub fetch_timeout_ms: u64,

    #[clap(flatten)]
    pub broadcast: BroadcastConfig,
}

fn parse_layer(s: &str) -> std::result::Result<WirecastLayer, String> {
    s.parse().map_err(|_| {
        format!(
            "must be a number from {} to {}",
            WirecastLayer::MIN,
            WirecastLayer::MAX
        )
    })
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .compact()
        .init();

    let mut opts = CliParser::parse();
    let config = BridgeConfig::new(
        Duration::from_millis(opts.interval_ms),
        Duration::from_millis(opts.fetch_timeout_ms),
    )?;

    if opts.bind && opts.broadcast.interface.is_none() {
        match internet_facing_ipv4().await {
            Ok(ip) => opts.broadcast.interface = Some(ip),
            Err(e) => warn!("couldn't find internet connected adapter: {e}"),
        }
    }

    match opts.broadcast.interface {
        Some(ip) => info!("Binding: {ip}"),
        None => info!("Binding: disabled"),
    }
    info!("Layer: {}", opts.layer);
    info!(
        "Multicast: {}, TTL {}, every {:?}",
        opts.broadcast.destination(),
        opts.broadcast.ttl,
        config.interval
    );

    // TODO: add a Windows `WirecastDocument` binding over the
    // `Wirecast.Application` COM object, then run a `TallyBridge` over
    // `WirecastSource::new(document, opts.layer)` as `vmix_tally_bridge` does.
    error!("no Wirecast object model binding is available in this build");
    Err(Error::SourceUnavailable("Wirecast.Application".to_string()))
}

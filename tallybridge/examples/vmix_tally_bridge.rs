//! vMix wireless tally bridge.

use clap::Parser;
use std::time::Duration;
use tallybridge::{
    internet_facing_ipv4, BridgeConfig, BroadcastConfig, Result, TallyBridge, TallyBroadcaster,
    VmixSource,
};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

/// Broadcasts vMix tally state to wireless tally lights.
///
/// Shots are assigned to tally lights with a `[T:n,...]` tag in the input's
/// title. For example, an input titled `Wide [T:1,3]` lights tally lights 1
/// and 3.
#[derive(Debug, Parser)]
#[clap(verbatim_doc_comment)]
struct CliParser {
    /// Address (IP or host name) of the vMix web API.
    #[clap(short, long, default_value = VmixSource::DEFAULT_ADDRESS)]
    pub address: String,

    /// Port of the vMix web API.
    #[clap(short, long, default_value_t = VmixSource::DEFAULT_PORT)]
    pub port: u16,

    /// Bind to the internet connected network adapter.
    #[clap(short, long)]
    pub bind: bool,

    /// Milliseconds between tally broadcasts.
    #[clap(long, default_value_t = 250, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Milliseconds to wait for vMix on each cycle, shorter than the interval.
    #[clap(long, default_value_t = 200, value_parser = clap::value_parser!(u64).range(1..))]
    pub fetch_timeout_ms: u64,

    #[clap(flatten)]
    pub broadcast: BroadcastConfig,
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

    let source = VmixSource::new(&opts.address, opts.port)?;
    info!("Address: {}", source.url());
    info!(
        "Multicast: {}, TTL {}",
        opts.broadcast.destination(),
        opts.broadcast.ttl
    );

    let config = BridgeConfig::new(
        Duration::from_millis(opts.interval_ms),
        Duration::from_millis(opts.fetch_timeout_ms),
    )?;
    let broadcaster = TallyBroadcaster::bind(&opts.broadcast).await?;
    let bridge = TallyBridge::new(source, broadcaster, config)?;

    tokio::select! {
        () = bridge.run() => (),
        r = tokio::signal::ctrl_c() => {
            r?;
            info!("stopping");
        }
    }

    Ok(())
}

use clap::Parser;
use std::time::Duration;
use tallybridge::{protocol::TallyStateBuffer, BroadcastConfig, Result, TallyListener};
use tokio::time::timeout;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

/// Tally broadcast watcher.
///
/// Joins the tally multicast group, and logs changes to each receiver's state,
/// like a set of tally lights would show them.
#[derive(Debug, Parser)]
#[clap(verbatim_doc_comment)]
struct CliParser {
    /// Warn when no broadcast is received for this many milliseconds.
    #[clap(long, default_value_t = 1000)]
    pub silence_ms: u64,

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
    let opts = CliParser::parse();
    let silence = Duration::from_millis(opts.silence_ms);
    let listener = TallyListener::join(&opts.broadcast).await?;
    info!("Listening on {}", opts.broadcast.destination());

    let mut last = TallyStateBuffer::default();
    let mut silent = false;
    loop {
        let (buffer, src) = match timeout(silence, listener.recv()).await {
            Err(_) => {
                if !silent {
                    silent = true;
                    warn!("no tally broadcast for {silence:?}");
                }
                continue;
            }
            Ok(Err(e)) => {
                warn!("bad tally broadcast: {e}");
                continue;
            }
            Ok(Ok(r)) => r,
        };

        if silent {
            silent = false;
            info!("receiving tally broadcasts from {src}");
        }

        for (i, (was, now)) in last.iter().zip(buffer.iter()).enumerate() {
            if was != now {
                info!("Tally {}: {now:?}", i + 1);
            }
        }
        last = buffer;
    }
}

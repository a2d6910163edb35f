//! `codegraph consume`: run the durable-stream batch consumer for a
//! repository, either once (drain and return) or continuously until the
//! process receives `SIGINT`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use codegraph_config::CodegraphConfig;
use codegraph_db::CodegraphDb;
use codegraph_stream::{BatchConsumer, ConsumerConfig};
use tracing::info;

use crate::cli::ConsumeArgs;

/// # Errors
/// Returns an error if the relational store or stream connection cannot
/// be established, or if the consumer loop hits a non-retryable stream
/// failure.
pub async fn run(args: ConsumeArgs) -> anyhow::Result<()> {
    let config = CodegraphConfig::load()?;
    let db = CodegraphDb::open(&config.database.url).await?;

    let consumer_name = args.consumer_name.clone().unwrap_or_else(|| {
        format!("codegraph-consumer-{}", std::process::id())
    });
    let worker_binary = std::env::current_exe()?;
    let consumer_config = ConsumerConfig::new(worker_binary, config.database.url.clone(), consumer_name);

    let mut consumer = BatchConsumer::connect(&config.stream.url, &args.repository, &db, consumer_config).await?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_signal = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop_for_signal.store(true, Ordering::Relaxed);
        }
    });

    loop {
        consumer.run(&args.repository, &stop).await?;
        if !args.follow || stop.load(Ordering::Relaxed) {
            break;
        }
        info!(repository = %args.repository, "stream drained, waiting for more entries");
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    }

    Ok(())
}

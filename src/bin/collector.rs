use std::sync::Arc;

use clap::Parser;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use xroad_telemetry::{
    actors::collector::CollectorHandle,
    backoff::{BackoffPolicy, FixedDelay},
    config::read_config_file,
    storage::{SqliteStore, TelemetryStore},
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("xroad_telemetry", LevelFilter::TRACE),
        ("xroad_collector", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let store = Arc::new(SqliteStore::new(&config.database_path).await?);
    let backoff: Box<dyn BackoffPolicy> = Box::new(FixedDelay::new(config.retry_pause()));

    let handle = CollectorHandle::spawn(&config, store.clone(), backoff)?;
    info!(
        "collecting from {} every {} minutes",
        config.xroad_server, config.poll_interval_minutes
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    handle.shutdown().await?;
    store.close().await?;

    Ok(())
}

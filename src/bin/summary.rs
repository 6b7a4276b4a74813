use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Parser;
use xroad_telemetry::{
    analytics::{AnalyticsEngine, Summary},
    config::read_config_file,
    storage::{SqliteStore, TelemetryStore},
};

/// Print request summaries and current health status from a collected
/// telemetry database.
#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Only summarize this service
    #[arg(long)]
    service: Option<String>,

    /// Trailing window in hours
    #[arg(long, default_value_t = 24)]
    hours: i64,
}

fn print_summary(label: &str, summary: &Summary) {
    println!("{label}");
    println!(
        "  requests: {} total, {} ok, {} failed",
        summary.total_requests, summary.successful_requests, summary.failed_requests
    );
    match (summary.avg_duration_ms, summary.min_duration_ms, summary.max_duration_ms) {
        (Some(avg), Some(min), Some(max)) => {
            println!("  duration: avg {avg:.1}ms, min {min}ms, max {max}ms");
        }
        _ => println!("  duration: no data"),
    }
    if let (Some(req), Some(resp)) = (summary.avg_request_size, summary.avg_response_size) {
        println!("  sizes: avg request {req:.0}B, avg response {resp:.0}B");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = read_config_file(&args.file)?;
    let store = Arc::new(SqliteStore::new(&config.database_path).await?);
    let window = Duration::hours(args.hours);

    let engine = AnalyticsEngine::new(store.clone());

    match &args.service {
        Some(service) => {
            let summary = engine.summarize(service, window).await?;
            print_summary(&format!("{service} (last {}h)", args.hours), &summary);
        }
        None => {
            let summaries = engine.summarize_all(window).await?;
            if summaries.is_empty() {
                println!("no operational records in the last {}h", args.hours);
            }
            for entry in &summaries {
                print_summary(&entry.service_id, &entry.summary);
            }

            let counts = store.status_counts(Utc::now() - window).await?;
            println!(
                "status counts (last {}h): {} ok, {} failed",
                args.hours, counts.succeeded, counts.failed
            );

            let health = store.latest_health_per_service().await?;
            if !health.is_empty() {
                println!("current health:");
                for snapshot in &health {
                    println!(
                        "  {}: {} ok / {} failed, avg {:.1}ms (as of {})",
                        snapshot.service_code,
                        snapshot.successful_count,
                        snapshot.unsuccessful_count,
                        snapshot.avg_duration_ms,
                        snapshot.collected_at.format("%Y-%m-%d %H:%M:%S"),
                    );
                }
            }
        }
    }

    println!("{}", store.get_stats().await?);

    store.close().await?;
    Ok(())
}

//! Kinneret Water Level Monitor
//!
//! Loads the lake level series (data.gov.il datastore, falling back to the
//! local CSV file) and either prints a one-shot summary or serves the
//! dashboard JSON endpoint.
//!
//! Usage:
//!   cargo run --release                                # Print summary and exit
//!   cargo run --release -- --endpoint 8080             # Serve on port 8080
//!   cargo run --release -- --serve                     # Serve on [endpoint] port from config
//!   cargo run --release -- --config other.toml         # Use another config file
//!
//! Environment:
//!   MONITOR_CONFIG - config file path when --config is not given (.env is read)
//!   RUST_LOG       - log filter, default "info"

use std::env;
use std::process;

use kinneret_monitor::analysis::{metrics, quality};
use kinneret_monitor::cache::TimedCache;
use kinneret_monitor::config::{load_config_from, resolve_config_path};
use kinneret_monitor::endpoint::{self, DashboardState};
use kinneret_monitor::ingest::datastore::HttpDatastore;
use kinneret_monitor::loader::WaterLevelLoader;
use kinneret_monitor::logging::init_logging;
use kinneret_monitor::model::{LoadOutcome, NoticeLevel};
use kinneret_monitor::thresholds::{self, classify_level};

fn usage(program: &str) -> String {
    format!("Usage: {} [--config PATH] [--endpoint PORT | --serve]", program)
}

fn main() {
    init_logging();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_arg: Option<String> = None;
    let mut endpoint_port: Option<u16> = None;
    let mut serve = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_arg = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("Error: --config requires a file path");
                    process::exit(1);
                }
            }
            "--endpoint" => match args.get(i + 1).and_then(|p| p.parse::<u16>().ok()) {
                Some(port) => {
                    endpoint_port = Some(port);
                    serve = true;
                    i += 2;
                }
                None => {
                    eprintln!("Error: --endpoint requires a port number");
                    process::exit(1);
                }
            },
            "--serve" => {
                serve = true;
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("{}", usage(&args[0]));
                process::exit(1);
            }
        }
    }

    let config_path = resolve_config_path(config_arg.as_deref());
    let config = match load_config_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration in {}: {}", config_path.display(), e);
            process::exit(1);
        }
    };

    let source = HttpDatastore::new(config.datastore.base_url.clone());
    let loader = WaterLevelLoader::new(source, config.loader_settings());

    if serve {
        let port = endpoint_port.unwrap_or(config.endpoint.port);
        println!("🌊 Kinneret Water Level Monitor");
        println!("   Serving dashboard data on http://0.0.0.0:{}", port);
        println!("   Cache TTL: {} s\n", config.cache.ttl_secs);
        let state = DashboardState::new(loader, TimedCache::new(config.cache.ttl()));
        if let Err(e) = endpoint::start_endpoint_server(port, state) {
            eprintln!("❌ Endpoint server error: {}", e);
            process::exit(1);
        }
        return;
    }

    print_summary(&loader.load());
}

fn print_summary(outcome: &LoadOutcome) {
    println!("🌊 Kinneret Water Level Monitor");
    println!("================================\n");

    for notice in &outcome.notices {
        let marker = match notice.level {
            NoticeLevel::Info => "ℹ️ ",
            NoticeLevel::Warning => "⚠️ ",
            NoticeLevel::Error => "❌",
        };
        println!("{} {}", marker, notice.message);
    }
    println!();

    let series = &outcome.series;
    if series.is_empty() {
        println!("No data available from the API or the local file.");
        return;
    }

    let m = metrics::compute_metrics(series);
    println!("📊 Source: {:?}, {} readings", outcome.origin, series.len());
    if let Some((first, last)) = series.date_range() {
        println!("   Date range: {} to {}", first, last);
    }
    if let (Some(date), Some(level)) = (m.latest_date, m.current_level) {
        println!("   Current level ({}): {:.2} m", date, level);
        println!("   Status: {}", classify_level(level).as_str());
    }
    println!("   Daily change:   {:+.3} m", m.daily_change);
    println!("   Monthly change: {:+.3} m", m.monthly_change);
    println!("   Yearly change:  {:+.3} m", m.yearly_change);
    println!(
        "   Red lines: upper {:.2} m, lower {:.2} m; black line {:.2} m",
        thresholds::UPPER_RED_LINE_M,
        thresholds::LOWER_RED_LINE_M,
        thresholds::BLACK_LINE_M
    );

    let q = quality::assess(series);
    println!("\n📋 Data quality");
    if let (Some(min), Some(max)) = (q.min_level, q.max_level) {
        println!("   Range: {:.2} to {:.2} m", min, max);
    }
    println!("   Outliers (>{}σ): {}", quality::OUTLIER_SIGMAS, q.outliers.len());
    if !q.sparse_years.is_empty() {
        println!("   Sparse years: {:?}", q.sparse_years);
    }
    for gap in &q.gaps {
        println!("   Gap: {} to {} ({} days)", gap.from, gap.to, gap.days);
    }
}

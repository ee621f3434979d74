mod clock;
mod common;
mod config;
mod constants;
mod control_plane;
mod errors;
mod events;
mod metrics;
mod polling;
mod user;

#[cfg(test)]
mod testing;

use config::Config;
use errors::Result;
use std::process;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use user::LoadTest;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application failed: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Parse and validate configuration
    let config = Config::from_args()?;

    init_logging(&config);

    info!("🎮 Fleet Load - game server allocation load driver");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    config.print_summary();

    let mut load_test = LoadTest::new(config)?;

    load_test
        .run()
        .await
        .map(|_| {
            info!("Load test completed successfully");
        })
        .map_err(|e| {
            error!("Load test failed: {}", e);
            e
        })
}

/// Initialize logging based on configuration
fn init_logging(config: &Config) {
    let level = if config.output.verbose {
        "debug"
    } else {
        "info"
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(
                    format!("fleet_load={}", level)
                        .parse()
                        .expect("Invalid filter directive"),
                )
                .add_directive("reqwest=warn".parse().expect("Invalid filter directive"))
                .add_directive("hyper=warn".parse().expect("Invalid filter directive")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");

    if config.output.verbose {
        info!("Verbose logging enabled");
    }
}

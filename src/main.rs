use std::process;

use clap::Parser;
use logcheck::cli::{self, Cli};
use logcheck::config::Config;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "logcheck=warn";

fn main() {
    let cli = Cli::parse();

    let config = if cli.command.uses_config() {
        match Config::load() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {e}");
                process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    init_tracing(&config);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("logcheck-reminder")
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(cli, &config, runtime.handle()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG` wins over the config's `log-filter`.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .log_filter
            .as_deref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

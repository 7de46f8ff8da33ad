#![forbid(unsafe_code)]

mod config;
mod github;
mod sync;

use clap::Parser;
use std::env;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STITCH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "stitch=debug,info"
        } else {
            "stitch=info,warn"
        })
    });

    let format = env::var("STITCH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = config::Config::parse();
    config.log_summary();

    sync::run(&config)
}

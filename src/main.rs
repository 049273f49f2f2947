mod config;
mod coordinator;
mod domain;
mod gateway;
mod notification;
mod service;
mod storage;
mod web;

use config::Config;
use service::{Service, ServiceConfig};
use std::env;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

fn parse_config_path() -> String {
    for arg in env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[actix_web::main]
async fn main() {
    let config_path = parse_config_path();

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    init_tracing(config.app.log_level.as_deref());

    let service = match Service::new(ServiceConfig {
        app_config: config,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
    .await
    {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "Failed to create checkout service");
            std::process::exit(1);
        }
    };

    info!(config = %config_path, "Checkout service initialized");

    if let Err(e) = service.run().await {
        error!(error = %e, "Checkout service error");
    }

    if let Err(e) = service.stop().await {
        error!(error = %e, "Failed to stop checkout service cleanly");
    }
}

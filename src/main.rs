use actix_web::{web, App, HttpServer};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod api;
mod cli;
mod config;
mod jobs;
mod shutdown;

use crate::api::state::AppState;
use crate::cli::{Cli, Command};
use crate::shutdown::ShutdownCoordinator;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment, then apply command-line overrides
    let mut config = config::Config::from_env().map_err(std::io::Error::other)?;
    cli.apply(&mut config);

    if *cli.command() == Command::CheckConfig {
        print!("{config}");
        return Ok(());
    }

    std::fs::create_dir_all(&config.log_dir)?;

    // Log files are created as: logs/info.log.2024-12-22, logs/error.log.2024-12-22, etc.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let info_file = tracing_appender::rolling::daily(&config.log_dir, "info.log");
    let warn_file = tracing_appender::rolling::daily(&config.log_dir, "warn.log");
    let error_file = tracing_appender::rolling::daily(&config.log_dir, "error.log");
    let debug_file = tracing_appender::rolling::daily(&config.log_dir, "debug.log");

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let warn_layer = tracing_subscriber::fmt::layer()
        .with_writer(warn_file)
        .with_ansi(false)
        .with_filter(LevelFilter::WARN);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let debug_layer = tracing_subscriber::fmt::layer()
        .with_writer(debug_file)
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(warn_layer)
        .with(error_layer)
        .with(debug_layer)
        .init();

    info!("Starting studio-proxy");
    info!("Configuration loaded successfully:");
    for line in config.to_string().lines() {
        info!("  - {}", line);
    }

    let config = Arc::new(config);
    let bind = (config.host.clone(), config.port);
    let shutdown = CancellationToken::new();

    let server_config = config.clone();
    let server_shutdown = shutdown.clone();
    let server = HttpServer::new(move || {
        let state = web::Data::new(AppState::new(server_config.clone(), server_shutdown.clone()));

        // Bounds non-multipart bodies; multipart uploads are bounded while collected
        let payload_config = web::PayloadConfig::default().limit(server_config.max_payload_size);

        App::new()
            .app_data(state)
            .app_data(payload_config)
            .configure(api::routes)
    });

    info!("Server starting on http://{}:{}", bind.0, bind.1);

    let server = server.bind(bind)?.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let coordinator = ShutdownCoordinator::new(server_handle, server_task, shutdown);
    coordinator.wait_for_shutdown().await
}

//! Sonos Broker - standalone headless daemon.
//!
//! Discovers zone players, keeps their state current through UPnP event
//! subscriptions and publishes changes as JSON datagrams.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sonos_broker_core::{
    bind, bootstrap_services, serve, AppState, LocalIpDetector, NetworkContext,
};
use tokio::signal;

use crate::config::ServerConfig;

/// Sonos Broker - zone state broker for Sonos players.
#[derive(Parser, Debug)]
#[command(name = "sonos-broker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "SONOS_BROKER_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "SONOS_BROKER_BIND_PORT")]
    port: Option<u16>,

    /// Advertise IP address (overrides config file).
    #[arg(short = 'a', long, env = "SONOS_BROKER_ADVERTISE_IP")]
    advertise_ip: Option<std::net::IpAddr>,

    /// Host receiving state datagrams (overrides config file).
    #[arg(long, env = "SONOS_BROKER_PUBLISH_HOST")]
    publish_host: Option<String>,

    /// Port receiving state datagrams (overrides config file).
    #[arg(long, env = "SONOS_BROKER_PUBLISH_PORT")]
    publish_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Sonos Broker v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(ip) = args.advertise_ip {
        config.advertise_ip = Some(ip);
    }
    if let Some(host) = args.publish_host {
        config.publish_host = host;
    }
    if let Some(port) = args.publish_port {
        config.publish_port = port;
    }

    // Bind first so the callback URL carries the real port before any SUBSCRIBE
    let (port, listener) = bind(config.bind_port)
        .await
        .context("Failed to bind HTTP listener")?;

    let network = if let Some(ip) = config.advertise_ip {
        log::info!("Configuration: bind_port={}, advertise_ip={}", port, ip);
        NetworkContext::explicit(port, ip)
    } else {
        log::info!("Configuration: bind_port={}, advertise_ip=auto", port);
        NetworkContext::auto_detect(port, LocalIpDetector::arc()).context(
            "Failed to auto-detect local IP address. \
             Please specify --advertise-ip or set SONOS_BROKER_ADVERTISE_IP to the IP \
             address that zone players can reach.",
        )?
    };

    let core_config = config.to_core_config();
    let services = bootstrap_services(&core_config, network)
        .await
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let app_state = AppState::new(&services);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = serve(app_state, listener).await {
            log::error!("Server error: {}", e);
        }
    });

    services.start_background_tasks();

    shutdown_signal().await?;

    log::info!("Shutdown signal received, cleaning up...");

    // Cancels discovery, renewal and the server loop, then releases leases
    services.shutdown().await;
    if let Err(e) = server_handle.await {
        log::warn!("Server task ended abnormally: {}", e);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = signal::ctrl_c() => res.context("Failed to install Ctrl+C handler")?,
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    signal::ctrl_c()
        .await
        .context("Failed to install Ctrl+C handler")?;

    Ok(())
}

mod cli;
mod demo;
mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use svcrun_core::config::{Placement, RuntimeConfig, ServiceConfig};
use svcrun_engine::Scheduler;

use crate::cli::Cli;
use crate::demo::{Heartbeat, Relay};
use crate::shutdown::{install_ctrl_c_handler, ShutdownController, ShutdownEvent};

const DEFAULT_HEARTBEAT_PERIOD_MS: u64 = 500;
const DEFAULT_RELAY_PERIOD_MS: u64 = 50;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config.max_workers = workers.max(1);
    }

    info!(max_workers = config.max_workers, "starting scheduler");
    let scheduler = Scheduler::new(config.max_workers);
    scheduler.set_tick_period_ms(cli.tick_ms);
    scheduler.set_error_threshold(cli.error_threshold);

    register_demo_services(&scheduler, &config);

    scheduler.start_all();

    let shutdown = Arc::new(ShutdownController::new());
    install_ctrl_c_handler(Arc::clone(&shutdown), |event| match event {
        ShutdownEvent::Graceful => info!("ctrl-c received, shutting down gracefully"),
        ShutdownEvent::Immediate => {
            info!("second ctrl-c received, exiting immediately");
            std::process::exit(130);
        }
    })
    .context("installing ctrl-c handler")?;

    let status_interval = Duration::from_millis(cli.status_interval_ms.max(1));
    while !shutdown.requested() {
        std::thread::sleep(status_interval);
        scheduler.reap_completed();
        for (worker, summary) in scheduler.status_log() {
            info!(%worker, %summary, "status");
        }
    }

    scheduler.stop_all();
    Ok(())
}

fn find_config<'a>(config: &'a RuntimeConfig, name: &str) -> Option<&'a ServiceConfig> {
    config.services.iter().find(|s| s.name == name)
}

fn register_demo_services(scheduler: &Scheduler, config: &RuntimeConfig) {
    let heartbeat = find_config(config, "heartbeat");
    if !matches!(heartbeat, Some(s) if !s.enabled) {
        let period = heartbeat.map(ServiceConfig::period_ms).unwrap_or(DEFAULT_HEARTBEAT_PERIOD_MS);
        let placement = heartbeat.map(ServiceConfig::placement).unwrap_or(Placement::Balanced);
        scheduler.register("heartbeat", Box::new(Heartbeat::new(period)), placement);
    }

    let relay = find_config(config, "relay");
    if !matches!(relay, Some(s) if !s.enabled) {
        let period = relay.map(ServiceConfig::period_ms).unwrap_or(DEFAULT_RELAY_PERIOD_MS);
        let placement = relay.map(ServiceConfig::placement).unwrap_or(Placement::Balanced);
        scheduler.register("relay", Box::new(Relay::new(period)), placement);
    }
}

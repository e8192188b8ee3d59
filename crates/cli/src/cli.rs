use std::path::PathBuf;

use clap::Parser;

pub fn default_max_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[derive(Debug, Clone, Parser)]
#[command(name = "svcrun", version, about = "In-process service runtime driver")]
pub struct Cli {
    /// Path to a JSON runtime configuration file. See `RuntimeConfig` for the schema.
    #[arg(long, env = "SVCRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides the worker count from the config (or its hardware-thread default).
    #[arg(long, env = "SVCRUN_WORKERS")]
    pub workers: Option<usize>,

    /// Worker polling quantum, in milliseconds.
    #[arg(long, env = "SVCRUN_TICK_MS", default_value_t = svcrun_engine::worker::DEFAULT_TICK_PERIOD_MS)]
    pub tick_ms: u64,

    /// Consecutive work-step failures before a service is auto-quarantined.
    #[arg(long, env = "SVCRUN_ERROR_THRESHOLD", default_value_t = svcrun_engine::worker::DEFAULT_ERROR_THRESHOLD)]
    pub error_threshold: u64,

    /// How often the status loop sweeps completed services and prints status, in milliseconds.
    #[arg(long, env = "SVCRUN_STATUS_INTERVAL_MS", default_value_t = 1_000)]
    pub status_interval_ms: u64,
}

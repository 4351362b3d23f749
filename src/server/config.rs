//! Server configuration.
//!
//! Parsed from the command line with `clap`; also constructible directly
//! (e.g. in tests) through `Default` and struct update syntax.

use crate::storage::protocol::DEFAULT_KV_GROUP;

use clap::Parser;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8500";
pub const DEFAULT_GRACE_SHUTDOWN_TIMEOUT_S: u64 = 60;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_DATE: &str = env!("KV_BUILD_DATE");
pub const RUSTC_VERSION: &str = env!("KV_RUSTC_VERSION");

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nbuild_date: ",
    env!("KV_BUILD_DATE"),
    "\nrustc_version: ",
    env!("KV_RUSTC_VERSION"),
);

#[derive(Parser, Debug, Clone)]
#[command(name = "kv-server", version, long_version = LONG_VERSION, about, long_about = None)]
pub struct Config {
    /// Address the HTTP listener binds to
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,

    /// Expose runtime snapshots under /debug/pprof
    #[arg(long)]
    pub enable_pprof: bool,

    /// Record per-route metrics and expose them on /metrics
    #[arg(long)]
    pub enable_metrics: bool,

    /// Seconds in-flight requests get to finish on shutdown
    #[arg(long, default_value_t = DEFAULT_GRACE_SHUTDOWN_TIMEOUT_S)]
    pub grace_shutdown_timeout: u64,

    /// API group the key-value service is mounted under
    #[arg(long, default_value = DEFAULT_KV_GROUP)]
    pub kv_group: String,

    /// Maximum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,
}

impl Config {
    pub fn grace_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.grace_shutdown_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            enable_pprof: false,
            enable_metrics: false,
            grace_shutdown_timeout: DEFAULT_GRACE_SHUTDOWN_TIMEOUT_S,
            kv_group: DEFAULT_KV_GROUP.to_string(),
            log_level: tracing::Level::INFO,
        }
    }
}

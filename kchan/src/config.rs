use anyhow::Result;
use clap::Parser;
use kchan_client::HeartbeatConfig;
use serde_derive::Deserialize;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "kchan",
    version,
    author,
    about = "Console of a kernel serving the length-prefixed TCP framing",
    long_about = "Console of a kernel serving the length-prefixed TCP framing of kchan. Messages are not \
                  signed and not carried over ZeroMQ, so stock Jupyter kernels don't accept them."
)]
pub(crate) struct Cli {
    /// Connection file of the running kernel
    #[arg(long, value_name = "FILE")]
    pub(crate) existing: String,

    /// Path to the config file
    #[arg(short, long, value_name = "FILE")]
    pub(crate) config: Option<String>,

    /// Executes the code and exits
    #[arg(short, long, value_name = "CODE")]
    pub(crate) execute: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) timeouts: Timeouts,
    #[serde(default)]
    pub(crate) heartbeat: Heartbeat,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct Timeouts {
    pub(crate) ready_ms: u64,
    pub(crate) reply_ms: u64,
    pub(crate) iopub_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            ready_ms: 10_000,
            reply_ms: 30_000,
            iopub_ms: 100,
        }
    }
}

impl Timeouts {
    pub(crate) fn ready(&self) -> Duration {
        Duration::from_millis(self.ready_ms)
    }

    pub(crate) fn reply(&self) -> Duration {
        Duration::from_millis(self.reply_ms)
    }

    pub(crate) fn iopub(&self) -> Duration {
        Duration::from_millis(self.iopub_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct Heartbeat {
    pub(crate) time_to_dead_ms: u64,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Heartbeat { time_to_dead_ms: 1_000 }
    }
}

impl Heartbeat {
    pub(crate) fn time_to_dead(&self) -> Duration {
        Duration::from_millis(self.time_to_dead_ms)
    }

    /// Blocking heartbeat with the configured time to dead.
    pub(crate) fn config(&self) -> HeartbeatConfig {
        HeartbeatConfig::blocking().with_time_to_dead(self.time_to_dead())
    }
}

pub(crate) fn parse_config(path: &str) -> Result<Config> {
    let cfg = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&cfg)?)
}

/// Config of the file if there is one, the defaults otherwise.
pub(crate) fn load(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => parse_config(path),
        None => Ok(Config::default()),
    }
}

//! Runtime configuration.
//!
//! A `Config` is built once at startup (from command-line flags) and handed
//! to every component at construction; nothing reads configuration globally.

use crate::cache::types::EvictionPolicy;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP transport binds.
    pub port: u16,
    /// Victim selection policy for the local store.
    pub eviction: EvictionPolicy,
    /// Local store capacity.
    pub max_items: usize,
    /// Stable node identity; generated when unset.
    pub node_id: Option<String>,
    /// Bootstrap peer URL to register with at startup.
    pub seed: Option<String>,
    /// Directory holding the persistence file; created if missing.
    pub data_dir: PathBuf,
    /// Replica copies beyond the primary.
    pub replicas: usize,
    /// Whether the persistence engine runs.
    pub persistence: bool,
    /// Health-check tick.
    pub check_interval: Duration,
    /// Snapshot tick.
    pub save_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            eviction: EvictionPolicy::Lru,
            max_items: 1000,
            node_id: None,
            seed: None,
            data_dir: PathBuf::from("./data"),
            replicas: 2,
            persistence: true,
            check_interval: Duration::from_secs(5),
            save_interval: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Parses `--flag value` pairs over the defaults; unknown flags are
    /// rejected rather than ignored.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = Config::default();

        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = args
                .get(i + 1)
                .with_context(|| format!("missing value for {flag}"))?;

            match flag {
                "--port" => config.port = value.parse().context("invalid --port")?,
                "--eviction" => config.eviction = value.parse()?,
                "--max-items" => config.max_items = value.parse().context("invalid --max-items")?,
                "--node-id" => config.node_id = Some(value.clone()),
                "--seed" => config.seed = Some(value.trim_end_matches('/').to_string()),
                "--data-dir" => config.data_dir = PathBuf::from(value),
                "--replicas" => config.replicas = value.parse().context("invalid --replicas")?,
                "--persistence" => {
                    config.persistence = match value.as_str() {
                        "on" | "true" => true,
                        "off" | "false" => false,
                        other => bail!("invalid --persistence value: {other} (expected on or off)"),
                    }
                }
                "--check-interval" => {
                    config.check_interval = Duration::from_secs(
                        value.parse().context("invalid --check-interval")?,
                    )
                }
                "--save-interval" => {
                    config.save_interval =
                        Duration::from_secs(value.parse().context("invalid --save-interval")?)
                }
                other => bail!("unknown flag: {other}"),
            }

            i += 2;
        }

        if config.max_items == 0 {
            bail!("--max-items must be at least 1");
        }
        if config.check_interval.is_zero() || config.save_interval.is_zero() {
            bail!("--check-interval and --save-interval must be at least 1 second");
        }

        Ok(config)
    }
}

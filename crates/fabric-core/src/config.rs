//! Configuration system for the storage fabric simulator.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $FABRIC_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/fabric/config.toml
//!   3. ~/.config/fabric/config.toml

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Bytes per configured gigabyte of node storage.
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;
/// Bits/sec per configured megabit/sec of bandwidth.
pub const BPS_PER_MBPS: u64 = 1_000_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    pub monitor: MonitorConfig,
    pub simulation: SimulationConfig,
    pub api: ApiConfig,
    pub topology: TopologyConfig,
}

/// Periods of the per-node background activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub listen_interval_ms: u64,
    pub storage_report_interval_ms: u64,
    pub transfer_report_interval_ms: u64,
    /// Upper bound `stop()` waits for each activity. Advisory.
    pub stop_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// `max_chunks` passed to every step.
    pub chunks_per_step: usize,
    /// Delay between polling steps.
    pub step_pacing_ms: u64,
    /// Give up after this many steps. 0 = never.
    pub max_steps: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub nodes: Vec<NodeConfig>,
    pub links: Vec<LinkConfig>,
    pub transfers: Vec<TransferJobConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    pub address: Ipv4Addr,
    pub cpu_capacity: u32,
    /// GB. Informational only.
    pub memory_capacity: u32,
    pub storage_gb: u64,
    pub bandwidth_mbps: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: String,
    pub b: String,
    pub bandwidth_mbps: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferJobConfig {
    pub source: String,
    pub target: String,
    pub file_name: String,
    pub file_size_bytes: u64,
}

impl NodeConfig {
    pub fn storage_bytes(&self) -> u64 {
        self.storage_gb.saturating_mul(BYTES_PER_GB)
    }

    pub fn bandwidth_bps(&self) -> u64 {
        self.bandwidth_mbps.saturating_mul(BPS_PER_MBPS)
    }
}

impl LinkConfig {
    pub fn bandwidth_bps(&self) -> u64 {
        self.bandwidth_mbps.saturating_mul(BPS_PER_MBPS)
    }
}

impl MonitorConfig {
    pub fn listen_interval(&self) -> Duration {
        Duration::from_millis(self.listen_interval_ms.max(1))
    }

    pub fn storage_report_interval(&self) -> Duration {
        Duration::from_millis(self.storage_report_interval_ms.max(1))
    }

    pub fn transfer_report_interval(&self) -> Duration {
        Duration::from_millis(self.transfer_report_interval_ms.max(1))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl SimulationConfig {
    pub fn step_pacing(&self) -> Duration {
        Duration::from_millis(self.step_pacing_ms)
    }
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            listen_interval_ms: 2_000,
            storage_report_interval_ms: 5_000,
            transfer_report_interval_ms: 3_000,
            stop_timeout_ms: 1_000,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            chunks_per_step: 3,
            step_pacing_ms: 1_000,
            max_steps: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9101,
        }
    }
}

/// Four-node diamond: node1 reaches node4 through node2 or node3.
impl Default for TopologyConfig {
    fn default() -> Self {
        let node = |id: &str, last_octet: u8, cpu, mem, storage_gb, bandwidth_mbps| NodeConfig {
            id: id.to_string(),
            address: Ipv4Addr::new(10, 0, 0, last_octet),
            cpu_capacity: cpu,
            memory_capacity: mem,
            storage_gb,
            bandwidth_mbps,
        };
        let link = |a: &str, b: &str, bandwidth_mbps| LinkConfig {
            a: a.to_string(),
            b: b.to_string(),
            bandwidth_mbps,
        };

        Self {
            nodes: vec![
                node("node1", 1, 4, 16, 500, 1000),
                node("node2", 2, 8, 32, 1000, 2000),
                node("node3", 3, 4, 16, 500, 1000),
                node("node4", 4, 8, 32, 1000, 2000),
            ],
            links: vec![
                link("node1", "node2", 1000),
                link("node1", "node3", 2000),
                link("node2", "node4", 1000),
                link("node3", "node4", 2000),
            ],
            transfers: vec![TransferJobConfig {
                source: "node1".to_string(),
                target: "node4".to_string(),
                file_name: "large_dataset.zip".to_string(),
                file_size_bytes: 100 * 1024 * 1024,
            }],
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("fabric")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl FabricConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            FabricConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a config file without applying env overrides.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("FABRIC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&FabricConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply FABRIC_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(p) = lookup("FABRIC_API__PORT").and_then(|v| v.parse().ok()) {
            self.api.port = p;
        }
        if let Some(v) = lookup("FABRIC_API__ENABLED") {
            self.api.enabled = v == "true" || v == "1";
        }
        if let Some(n) = lookup("FABRIC_SIMULATION__CHUNKS_PER_STEP").and_then(|v| v.parse().ok()) {
            self.simulation.chunks_per_step = n;
        }
        if let Some(ms) = lookup("FABRIC_SIMULATION__STEP_PACING_MS").and_then(|v| v.parse().ok()) {
            self.simulation.step_pacing_ms = ms;
        }
        if let Some(n) = lookup("FABRIC_SIMULATION__MAX_STEPS").and_then(|v| v.parse().ok()) {
            self.simulation.max_steps = n;
        }
        if let Some(ms) = lookup("FABRIC_MONITOR__STOP_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.monitor.stop_timeout_ms = ms;
        }
    }
}

// argus is a distributed web search engine.
// Copyright (C) 2026 Argus Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Configuration surface for the three long-lived processes: Storage Node,
//! Dispatcher, and Crawler. Each is a plain value object deserialized once
//! from a TOML file at startup via [`load_toml_config`]; nothing here
//! consults the environment or re-reads itself.
//!
//! There is no standalone registry process: `rmi.host`/`rmi.port` models the
//! Dispatcher's own bind address, the one rendezvous point every other
//! process resolves `gateway.name` to. Storage node addresses are instead
//! derived structurally from `barrels.host`/`barrels.base_port` plus each
//! node's index, so Dispatcher and Crawler can build the same
//! [`crate::distributed::registry::Registry`] from configuration alone.

pub mod defaults;

use std::{fs, net::SocketAddr, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::distributed::registry::Registry;

pub fn load_toml_config<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse config: '{}'", path.display()))
}

/// The address other processes resolve the Dispatcher's `gateway.name` to.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegistryConfig {
    pub host: String,
    pub port: u16,
}

impl RegistryConfig {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid rmi.host/rmi.port: {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BarrelsConfig {
    pub count: usize,
    pub prefix: String,
    pub base_port: u16,

    #[serde(default = "defaults::Barrels::host")]
    pub host: String,
}

impl BarrelsConfig {
    pub fn name(&self, index: usize) -> String {
        format!("{}{}", self.prefix, index)
    }

    pub fn primary_name(&self) -> String {
        self.name(0)
    }

    pub fn addr(&self, index: usize) -> anyhow::Result<SocketAddr> {
        let port = self
            .base_port
            .checked_add(index as u16)
            .context("barrel index overflows base_port")?;
        format!("{}:{port}", self.host)
            .parse()
            .with_context(|| format!("invalid barrels.host: {}", self.host))
    }

    /// Builds the name -> address book for every configured storage node.
    pub fn registry(&self) -> anyhow::Result<Registry> {
        let mut entries = Vec::with_capacity(self.count);
        for index in 0..self.count {
            entries.push((self.name(index), self.addr(index)?));
        }
        Ok(Registry::new(entries))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BloomConfig {
    #[serde(default = "defaults::Bloom::expected_elements")]
    pub expected_elements: u64,

    #[serde(default = "defaults::Bloom::false_positive_rate")]
    pub false_positive_rate: f64,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            expected_elements: defaults::Bloom::expected_elements(),
            false_positive_rate: defaults::Bloom::false_positive_rate(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatisticsConfig {
    #[serde(default = "defaults::Statistics::monitor_interval_ms")]
    pub monitor_interval_ms: u64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            monitor_interval_ms: defaults::Statistics::monitor_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BarrelAutosaveConfig {
    #[serde(default = "defaults::Barrel::autosave_interval_secs")]
    pub autosave_interval_secs: u64,
}

impl Default for BarrelAutosaveConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: defaults::Barrel::autosave_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DownloaderConfig {
    #[serde(default = "defaults::Downloader::threads")]
    pub threads: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            threads: defaults::Downloader::threads(),
        }
    }
}

/// Where a Storage Node keeps its snapshot files; names follow the fixed
/// filenames of the persisted-state surface (`barrel_state_primary.bin`,
/// `barrel_urlqueue_backup.bin`) rooted under `data_dir`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageConfig {
    pub barrels: BarrelsConfig,

    #[serde(default)]
    pub bloom: BloomConfig,

    #[serde(default)]
    pub barrel: BarrelAutosaveConfig,

    #[serde(default = "defaults_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DispatcherConfig {
    pub rmi: RegistryConfig,
    pub gateway: GatewayConfig,
    pub barrels: BarrelsConfig,

    #[serde(default)]
    pub statistics: StatisticsConfig,

    #[serde(default = "defaults_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GatewayConfig {
    pub name: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrawlerConfig {
    pub rmi: RegistryConfig,
    pub barrels: BarrelsConfig,

    #[serde(default)]
    pub downloader: DownloaderConfig,
}

fn defaults_data_dir() -> String {
    ".".to_string()
}

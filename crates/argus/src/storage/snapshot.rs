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

//! Disk persistence for a Storage Node's full state (primary only) and its
//! URL-queue replica (every node). Both files are written temp-then-rename
//! so a crash mid-write never corrupts the previous snapshot.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use crate::model::{PageRecord, UrlQueueSnapshot};

pub const PRIMARY_STATE_FILE: &str = "barrel_state_primary.bin";
pub const QUEUE_BACKUP_FILE: &str = "barrel_urlqueue_backup.bin";

pub fn primary_state_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join(PRIMARY_STATE_FILE)
}

pub fn queue_backup_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join(QUEUE_BACKUP_FILE)
}

/// On-disk shape of a primary node's full state. `bloom` is carried for
/// format fidelity but deliberately never restored: every startup path
/// rebuilds the filter from `inverted_index`'s keys instead.
#[derive(bincode::Encode, bincode::Decode)]
pub struct BarrelState {
    pub inverted_index: HashMap<String, HashSet<String>>,
    pub backlinks: HashMap<String, HashSet<String>>,
    pub page_info: HashMap<String, PageRecord>,
    pub bloom: bloom::BloomFilter,
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

pub fn save_barrel_state(path: &Path, state: &BarrelState) -> anyhow::Result<()> {
    let bytes = bincode::encode_to_vec(state, bincode::config::standard())?;
    write_atomic(path, &bytes)?;
    Ok(())
}

pub fn load_barrel_state(path: &Path) -> anyhow::Result<BarrelState> {
    let bytes = std::fs::read(path)?;
    let (state, _) = bincode::decode_from_slice(&bytes, bincode::config::standard())?;
    Ok(state)
}

pub fn save_queue_snapshot(path: &Path, snapshot: &UrlQueueSnapshot) -> anyhow::Result<()> {
    let bytes = bincode::encode_to_vec(snapshot, bincode::config::standard())?;
    write_atomic(path, &bytes)?;
    Ok(())
}

pub fn load_queue_snapshot(path: &Path) -> anyhow::Result<UrlQueueSnapshot> {
    let bytes = std::fs::read(path)?;
    let (snapshot, _) = bincode::decode_from_slice(&bytes, bincode::config::standard())?;
    Ok(snapshot)
}

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

//! A Storage Node: one replica of the inverted index, backlink graph, and
//! per-URL metadata, plus a Bloom filter that lets `search` reject
//! never-indexed terms without touching the index at all.

pub mod service;
pub mod snapshot;

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{Arc, RwLock},
    time::Duration,
};

use dashmap::{DashMap, DashSet};
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    config::StorageConfig,
    distributed::{sonic::service::Server, RemoteClient},
    model::{normalize_term, PageRecord, SearchResult, UrlQueueSnapshot},
};

use self::service::StorageService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Starting,
    Syncing,
    Ready,
    Snapshotting,
}

pub struct StorageNode {
    pub index: usize,
    pub name: String,
    config: StorageConfig,
    state: RwLock<NodeState>,

    inverted_index: DashMap<String, DashSet<String>>,
    backlinks: DashMap<String, DashSet<String>>,
    page_info: DashMap<String, PageRecord>,
    bloom: RwLock<bloom::BloomFilter>,

    queue: RwLock<UrlQueueSnapshot>,
    queue_file_lock: AsyncMutex<()>,
    snapshot_lock: AsyncMutex<()>,
}

impl StorageNode {
    pub fn new(index: usize, config: StorageConfig) -> Self {
        let name = config.barrels.name(index);
        let bloom = bloom::BloomFilter::new(
            config.bloom.expected_elements,
            config.bloom.false_positive_rate,
        );

        Self {
            index,
            name,
            config,
            state: RwLock::new(NodeState::Starting),
            inverted_index: DashMap::new(),
            backlinks: DashMap::new(),
            page_info: DashMap::new(),
            bloom: RwLock::new(bloom),
            queue: RwLock::new(UrlQueueSnapshot::default()),
            queue_file_lock: AsyncMutex::new(()),
            snapshot_lock: AsyncMutex::new(()),
        }
    }

    pub fn is_primary(&self) -> bool {
        self.index == 0
    }

    fn set_state(&self, state: NodeState) {
        *self.state.write().unwrap() = state;
        tracing::info!(node = %self.name, ?state, "state transition");
    }

    pub fn state(&self) -> NodeState {
        *self.state.read().unwrap()
    }

    /// Conjunctive AND search, bloom-accelerated (spec §4.1).
    pub fn search(&self, terms: &[String]) -> Vec<SearchResult> {
        if terms.is_empty() {
            return Vec::new();
        }

        let lowered: Vec<String> = terms.iter().map(|t| normalize_term(t)).collect();

        {
            let bloom = self.bloom.read().unwrap();
            if lowered.iter().any(|t| !bloom.might_contain(t.as_bytes())) {
                return Vec::new();
            }
        }

        let mut matching: Option<HashSet<String>> = None;
        for term in &lowered {
            let Some(urls) = self.inverted_index.get(term) else {
                return Vec::new();
            };
            let urls: HashSet<String> = urls.iter().map(|r| r.clone()).collect();

            matching = Some(match matching {
                None => urls,
                Some(acc) => acc.intersection(&urls).cloned().collect(),
            });

            if matching.as_ref().is_some_and(|m| m.is_empty()) {
                return Vec::new();
            }
        }

        matching
            .unwrap_or_default()
            .into_iter()
            .map(|url| {
                let relevance = self
                    .backlinks
                    .get(&url)
                    .map(|s| s.len() as u64)
                    .unwrap_or(0);
                let (title, snippet) = self
                    .page_info
                    .get(&url)
                    .map(|r| (r.title.clone(), r.snippet.clone()))
                    .unwrap_or_default();

                SearchResult {
                    url,
                    title,
                    snippet,
                    relevance,
                }
            })
            .collect()
    }

    /// Idempotent: re-indexing a URL overwrites its PageRecord and grows the
    /// index/backlink sets, never shrinks them.
    pub fn update_index(
        &self,
        url: String,
        title: String,
        snippet: String,
        terms: HashSet<String>,
        outgoing_links: HashSet<String>,
    ) {
        self.page_info
            .insert(url.clone(), PageRecord::new(title, snippet));

        {
            let mut bloom = self.bloom.write().unwrap();
            for term in &terms {
                let term = normalize_term(term);
                bloom.insert(term.as_bytes());
                self.inverted_index
                    .entry(term)
                    .or_default()
                    .insert(url.clone());
            }
        }

        for link in outgoing_links {
            self.backlinks.entry(link).or_default().insert(url.clone());
        }
    }

    pub fn backlinks(&self, url: &str) -> Vec<String> {
        self.backlinks
            .get(url)
            .map(|set| set.iter().map(|r| r.clone()).collect())
            .unwrap_or_default()
    }

    pub fn barrel_stats(&self) -> String {
        let words = self.inverted_index.len();
        let urls: HashSet<String> = self
            .inverted_index
            .iter()
            .flat_map(|entry| entry.value().iter().map(|r| r.clone()).collect::<Vec<_>>())
            .collect();
        let bloom = self.bloom.read().unwrap();

        format!(
            "Index: {} words, {} URLs. BloomFilter[m={},k={},set={},occ={:.2}%]",
            words,
            urls.len(),
            bloom.num_bits(),
            bloom.num_hashes(),
            bloom.cardinality(),
            bloom.occupancy_rate() * 100.0,
        )
    }

    pub fn inverted_index_snapshot(&self) -> HashMap<String, HashSet<String>> {
        self.inverted_index
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().iter().map(|r| r.clone()).collect(),
                )
            })
            .collect()
    }

    pub fn backlinks_snapshot(&self) -> HashMap<String, HashSet<String>> {
        self.backlinks
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().iter().map(|r| r.clone()).collect(),
                )
            })
            .collect()
    }

    pub fn page_info_snapshot(&self) -> HashMap<String, PageRecord> {
        self.page_info
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn rebuild_bloom_from_keys(&self) {
        let template = bloom::BloomFilter::new(
            self.config.bloom.expected_elements,
            self.config.bloom.false_positive_rate,
        );
        let keys: Vec<String> = self
            .inverted_index
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        let rebuilt = bloom::rebuild_from_keys(&template, &keys);
        *self.bloom.write().unwrap() = rebuilt;
    }

    fn bulk_merge(
        &self,
        inverted_index: HashMap<String, HashSet<String>>,
        backlinks: HashMap<String, HashSet<String>>,
        page_info: HashMap<String, PageRecord>,
    ) {
        for (term, urls) in inverted_index {
            let entry = self.inverted_index.entry(term).or_default();
            for url in urls {
                entry.insert(url);
            }
        }
        for (target, sources) in backlinks {
            let entry = self.backlinks.entry(target).or_default();
            for source in sources {
                entry.insert(source);
            }
        }
        for (url, record) in page_info {
            self.page_info.insert(url, record);
        }
    }

    pub async fn backup_queue(&self, snapshot: UrlQueueSnapshot) {
        *self.queue.write().unwrap() = snapshot.clone();

        let path = snapshot::queue_backup_path(&self.config.data_dir);
        let _guard = self.queue_file_lock.lock().await;
        if let Err(e) = snapshot::save_queue_snapshot(&path, &snapshot) {
            tracing::warn!(error = %e, "failed to persist queue snapshot (SnapshotIOFailure)");
        }
    }

    pub async fn restore_queue(&self) -> UrlQueueSnapshot {
        {
            let current = self.queue.read().unwrap();
            if !current.pending.is_empty() || !current.visited.is_empty() {
                return current.clone();
            }
        }

        let path = snapshot::queue_backup_path(&self.config.data_dir);
        let _guard = self.queue_file_lock.lock().await;
        match snapshot::load_queue_snapshot(&path) {
            Ok(snapshot) => {
                *self.queue.write().unwrap() = snapshot.clone();
                snapshot
            }
            Err(_) => UrlQueueSnapshot::default(),
        }
    }

    /// Startup state recovery: peer sync, then disk fallback, then empty.
    pub async fn recover(self: &Arc<Self>) {
        self.set_state(NodeState::Syncing);

        if self.peer_sync().await {
            self.set_state(NodeState::Ready);
            return;
        }

        if self.disk_fallback() {
            self.set_state(NodeState::Ready);
            return;
        }

        tracing::info!(node = %self.name, "starting with empty state");
        self.set_state(NodeState::Ready);
    }

    async fn peer_sync(self: &Arc<Self>) -> bool {
        let Ok(registry) = self.config.barrels.registry() else {
            return false;
        };

        for (peer_name, peer_addr) in registry.entries() {
            if peer_name == self.name {
                continue;
            }

            let Ok(client) = RemoteClient::<StorageService>::new(peer_name, peer_addr) else {
                continue;
            };

            let index = client.send(service::GetInvertedIndex).await;
            let backlinks = client.send(service::GetBacklinksMap).await;
            let page_info = client.send(service::GetPageInfoMap).await;

            if let (Ok(index), Ok(backlinks), Ok(page_info)) = (index, backlinks, page_info) {
                self.bulk_merge(index, backlinks, page_info);
                self.rebuild_bloom_from_keys();
                tracing::info!(node = %self.name, peer = %peer_name, "synced from peer");
                return true;
            }
        }

        false
    }

    fn disk_fallback(&self) -> bool {
        let path = snapshot::primary_state_path(&self.config.data_dir);
        match snapshot::load_barrel_state(&path) {
            Ok(state) => {
                for (term, urls) in state.inverted_index {
                    self.inverted_index.insert(term, urls.into_iter().collect());
                }
                for (target, sources) in state.backlinks {
                    self.backlinks.insert(target, sources.into_iter().collect());
                }
                for (url, record) in state.page_info {
                    self.page_info.insert(url, record);
                }
                self.rebuild_bloom_from_keys();
                tracing::info!(node = %self.name, "restored from disk snapshot");
                true
            }
            Err(_) => false,
        }
    }

    /// Primary-only periodic full-state snapshot. Synchronous with itself
    /// (guarded by `snapshot_lock`) but never blocks concurrent readers: the
    /// maps are copied out before serialization begins.
    pub async fn run_autosave(self: Arc<Self>) {
        if !self.is_primary() {
            return;
        }

        let interval = Duration::from_secs(self.config.barrel.autosave_interval_secs.max(1));
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let _guard = self.snapshot_lock.lock().await;
            self.set_state(NodeState::Snapshotting);

            let state = snapshot::BarrelState {
                inverted_index: self.inverted_index_snapshot(),
                backlinks: self.backlinks_snapshot(),
                page_info: self.page_info_snapshot(),
                bloom: self.bloom.read().unwrap().clone(),
            };

            let path = snapshot::primary_state_path(&self.config.data_dir);
            if let Err(e) = snapshot::save_barrel_state(&path, &state) {
                tracing::warn!(error = %e, "failed to persist barrel state (SnapshotIOFailure)");
            }

            self.set_state(NodeState::Ready);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BarrelAutosaveConfig, BarrelsConfig, BloomConfig};

    fn test_config() -> StorageConfig {
        StorageConfig {
            barrels: BarrelsConfig {
                count: 1,
                prefix: "barrel".to_string(),
                base_port: 9000,
                host: "127.0.0.1".to_string(),
            },
            bloom: BloomConfig {
                expected_elements: 1_000,
                false_positive_rate: 0.01,
            },
            barrel: BarrelAutosaveConfig {
                autosave_interval_secs: 60,
            },
            data_dir: ".".to_string(),
        }
    }

    fn terms(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn search_with_no_terms_is_empty() {
        let node = StorageNode::new(0, test_config());
        assert!(node.search(&[]).is_empty());
    }

    #[test]
    fn unindexed_term_short_circuits_on_the_bloom_filter() {
        let node = StorageNode::new(0, test_config());
        assert!(node.search(&["never-seen".to_string()]).is_empty());
    }

    #[test]
    fn index_then_search_single_result() {
        let node = StorageNode::new(0, test_config());
        node.update_index(
            "http://a".to_string(),
            "A".to_string(),
            "hello world".to_string(),
            terms(&["hello", "world"]),
            terms(&["http://b"]),
        );

        let results = node.search(&["hello".to_string()]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "http://a");
        assert_eq!(results[0].relevance, 0);
    }

    #[test]
    fn backlinks_drive_relevance() {
        let node = StorageNode::new(0, test_config());
        node.update_index(
            "http://a".to_string(),
            "A".to_string(),
            "hello world".to_string(),
            terms(&["hello", "world"]),
            HashSet::new(),
        );
        node.update_index(
            "http://c".to_string(),
            "C".to_string(),
            "hello planet".to_string(),
            terms(&["hello", "planet"]),
            terms(&["http://a"]),
        );

        let mut results = node.search(&["hello".to_string()]);
        results.sort_by(|a, b| b.relevance.cmp(&a.relevance));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "http://a");
        assert_eq!(results[0].relevance, 1);
        assert_eq!(results[1].url, "http://c");
        assert_eq!(results[1].relevance, 0);
    }

    #[test]
    fn conjunctive_and_excludes_partial_matches() {
        let node = StorageNode::new(0, test_config());
        node.update_index(
            "http://p1".to_string(),
            String::new(),
            String::new(),
            terms(&["x", "y"]),
            HashSet::new(),
        );
        node.update_index(
            "http://p2".to_string(),
            String::new(),
            String::new(),
            terms(&["x"]),
            HashSet::new(),
        );

        let results = node.search(&["x".to_string(), "y".to_string()]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "http://p1");
    }

    #[test]
    fn reindexing_is_idempotent_and_only_grows_state() {
        let node = StorageNode::new(0, test_config());
        let update = || {
            node.update_index(
                "http://a".to_string(),
                "A".to_string(),
                "hello world".to_string(),
                terms(&["hello", "world"]),
                terms(&["http://b"]),
            );
        };
        update();
        let words_before = node.inverted_index.len();
        update();
        assert_eq!(node.inverted_index.len(), words_before);
        assert_eq!(node.backlinks.get("http://b").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn queue_backup_and_restore_round_trips_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.data_dir = dir.path().to_string_lossy().to_string();
        let node = StorageNode::new(0, config);
        let snapshot = UrlQueueSnapshot {
            pending: vec!["http://a".to_string(), "http://b".to_string()],
            visited: ["http://a".to_string()].into_iter().collect(),
        };
        node.backup_queue(snapshot.clone()).await;
        let restored = node.restore_queue().await;
        assert_eq!(restored, snapshot);
    }
}

pub async fn run(index: usize, config: StorageConfig) -> anyhow::Result<()> {
    let addr = config.barrels.addr(index)?;
    let node = Arc::new(StorageNode::new(index, config));

    node.recover().await;

    tokio::spawn(Arc::clone(&node).run_autosave());

    let service = StorageService {
        node: Arc::clone(&node),
    };
    let server: Server<StorageService> = service.bind(addr).await?;

    tracing::info!(node = %node.name, %addr, "storage node ready to accept requests");

    loop {
        if let Err(e) = server.accept().await {
            tracing::error!("{e:?}");
        }
    }
}

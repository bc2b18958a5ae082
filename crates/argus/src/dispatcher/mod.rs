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

//! The Dispatcher: sole owner of the crawl queue, router of search and
//! backlink lookups across storage-node replicas, and aggregator of stats
//! pushed to subscribers.

pub mod callback;
pub mod service;
pub mod stats;

use std::{
    collections::{BTreeSet, VecDeque},
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
    time::{Duration, Instant},
};

use dashmap::{DashMap, DashSet};
use tokio::{io::AsyncWriteExt, sync::Mutex as AsyncMutex};

use crate::{
    config::DispatcherConfig,
    distributed::{retry_strategy::FixedRetries, sonic::service::Server, RemoteClient},
    model::{SearchResult, UrlQueueSnapshot},
    storage::service::StorageService,
    RpcError, RpcResult,
};

use self::callback::{CallbackRef, CallbackService, OnStatisticsUpdate};
use self::service::DispatcherService;
use self::stats::{DigestInput, ReplicaStatus};

const INDEXED_URLS_LOG: &str = "indexed_urls.log";

#[derive(Clone)]
struct Replica {
    name: String,
    client: Arc<RemoteClient<StorageService>>,
}

pub struct Dispatcher {
    config: DispatcherConfig,

    pending: Mutex<VecDeque<String>>,
    visited: DashSet<String>,

    replicas: RwLock<Vec<Replica>>,
    next_replica: AtomicUsize,

    top_searches: DashMap<String, u64>,
    resp_time_total: DashMap<String, u64>,
    resp_count: DashMap<String, u64>,

    callbacks: DashMap<String, CallbackRef>,
    last_stats_digest: RwLock<String>,
    stats_dirty: AtomicBool,

    log_lock: AsyncMutex<()>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            pending: Mutex::new(VecDeque::new()),
            visited: DashSet::new(),
            replicas: RwLock::new(Vec::new()),
            next_replica: AtomicUsize::new(0),
            top_searches: DashMap::new(),
            resp_time_total: DashMap::new(),
            resp_count: DashMap::new(),
            callbacks: DashMap::new(),
            last_stats_digest: RwLock::new(String::new()),
            stats_dirty: AtomicBool::new(false),
            log_lock: AsyncMutex::new(()),
        }
    }

    fn mark_dirty(&self) {
        self.stats_dirty.store(true, Ordering::Relaxed);
    }

    fn queue_snapshot(&self) -> UrlQueueSnapshot {
        UrlQueueSnapshot {
            pending: self.pending.lock().unwrap().iter().cloned().collect(),
            visited: self.visited.iter().map(|r| r.clone()).collect::<BTreeSet<_>>(),
        }
    }

    async fn append_log(&self, url: &str) {
        let _guard = self.log_lock.lock().await;
        let path = std::path::Path::new(&self.config.data_dir).join(INDEXED_URLS_LOG);
        match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                let line = format!("{url}\n");
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    tracing::warn!(error = %e, "failed to append indexed-url log (SnapshotIOFailure)");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to open indexed-url log (SnapshotIOFailure)"),
        }
    }

    /// `submitURL`: first submission wins; duplicates are a silent no-op.
    pub async fn submit_url(self: &Arc<Self>, url: String) {
        if !self.visited.insert(url.clone()) {
            return;
        }

        self.pending.lock().unwrap().push_back(url.clone());
        self.append_log(&url).await;
        self.mark_dirty();
        self.spawn_queue_fanout();
    }

    /// `nextURLToCrawl`: pop the queue head, or `None`.
    pub fn next_url_to_crawl(self: &Arc<Self>) -> Option<String> {
        let url = self.pending.lock().unwrap().pop_front();
        if url.is_some() {
            self.mark_dirty();
            self.spawn_queue_fanout();
        }
        url
    }

    fn spawn_queue_fanout(self: &Arc<Self>) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let snapshot = dispatcher.queue_snapshot();
            let replicas = dispatcher.replicas.read().unwrap().clone();
            for replica in replicas {
                let res = replica
                    .client
                    .send(crate::storage::service::BackupUrlQueue {
                        pending: snapshot.pending.clone(),
                        visited: snapshot.visited.clone(),
                    })
                    .await;
                if res.is_err() {
                    dispatcher.drop_replica(&replica.name);
                }
            }
        });
    }

    fn drop_replica(&self, name: &str) {
        let mut replicas = self.replicas.write().unwrap();
        let before = replicas.len();
        replicas.retain(|r| r.name != name);
        if replicas.len() != before {
            tracing::warn!(replica = name, "dropped unreachable replica");
        }
    }

    /// Re-resolves every configured name and replaces the live replica list.
    /// Returns `true` if at least one replica is now known.
    fn reconnect_replicas(&self) -> bool {
        let Ok(registry) = self.config.barrels.registry() else {
            return false;
        };

        let mut fresh = Vec::new();
        for (name, addr) in registry.entries() {
            match RemoteClient::<StorageService>::new(name.to_string(), addr) {
                Ok(client) => fresh.push(Replica {
                    name: name.to_string(),
                    client: Arc::new(client),
                }),
                Err(e) => tracing::warn!(replica = name, error = %e, "failed to build replica client"),
            }
        }

        let any = !fresh.is_empty();
        *self.replicas.write().unwrap() = fresh;
        any
    }

    /// Round-robin + failover over the replica list (spec §4.2). `n` is
    /// computed once at loop entry; the list may shrink mid-loop as
    /// failures drop replicas, which is an accepted tolerance per spec §9.
    /// If the list drains to empty mid-loop, a reconnect pass is attempted
    /// before giving up (spec §4.2: reconnect applies before *or* mid-loop).
    async fn with_replica<T, F, Fut>(&self, mut call: F) -> RpcResult<(String, T)>
    where
        F: FnMut(Arc<RemoteClient<StorageService>>) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        let mut n = self.replicas.read().unwrap().len();
        if n == 0 {
            if !self.reconnect_replicas() {
                return Err(RpcError::NoReplicas);
            }
            n = self.replicas.read().unwrap().len();
        }
        if n == 0 {
            return Err(RpcError::NoReplicas);
        }

        for _ in 0..n {
            let selected = {
                let replicas = self.replicas.read().unwrap();
                if replicas.is_empty() {
                    None
                } else {
                    let i = self.next_replica.fetch_add(1, Ordering::Relaxed) % replicas.len();
                    Some(replicas[i].clone())
                }
            };

            let replica = match selected {
                Some(replica) => replica,
                None => {
                    if !self.reconnect_replicas() {
                        return Err(RpcError::NoReplicas);
                    }
                    let replicas = self.replicas.read().unwrap();
                    if replicas.is_empty() {
                        return Err(RpcError::NoReplicas);
                    }
                    let i = self.next_replica.fetch_add(1, Ordering::Relaxed) % replicas.len();
                    replicas[i].clone()
                }
            };

            match call(Arc::clone(&replica.client)).await {
                Ok(value) => return Ok((replica.name, value)),
                Err(e) => {
                    tracing::warn!(replica = %replica.name, error = %e, "replica call failed");
                    self.drop_replica(&replica.name);
                }
            }
        }

        Err(RpcError::NoReplicas)
    }

    pub async fn search(&self, query: String) -> RpcResult<Vec<SearchResult>> {
        let lower = query.to_lowercase();
        *self.top_searches.entry(lower).or_insert(0) += 1;
        self.mark_dirty();

        let terms: Vec<String> = query.split_whitespace().map(|t| t.to_lowercase()).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let (name, mut results) = self
            .with_replica(|client| {
                let terms = terms.clone();
                async move { client.send(crate::storage::service::Search { terms }).await }
            })
            .await?;

        let units = (start.elapsed().as_nanos() / 100_000) as u64;
        *self.resp_time_total.entry(name.clone()).or_insert(0) += units;
        *self.resp_count.entry(name).or_insert(0) += 1;

        results.sort_by(|a, b| b.relevance.cmp(&a.relevance));
        Ok(results)
    }

    pub async fn get_backlinks(&self, url: String) -> RpcResult<Vec<String>> {
        let (_, backlinks) = self
            .with_replica(|client| {
                let url = url.clone();
                async move { client.send(crate::storage::service::GetBacklinks { url }).await }
            })
            .await?;
        Ok(backlinks)
    }

    pub async fn get_statistics(&self) -> String {
        build_digest(self).await
    }

    pub async fn subscribe_stats(self: &Arc<Self>, cb: CallbackRef) {
        self.callbacks.insert(cb.addr.clone(), cb.clone());
        self.mark_dirty();

        let digest = self.get_statistics().await;
        if deliver(&cb, &digest).await.is_err() {
            self.callbacks.remove(&cb.addr);
        }
    }

    pub fn unsubscribe_stats(&self, cb: CallbackRef) {
        self.callbacks.remove(&cb.addr);
    }

    /// Bounded-retry crash recovery of queue state (spec §4.2).
    pub async fn recover_queue(config: &DispatcherConfig) -> UrlQueueSnapshot {
        let Ok(registry) = config.barrels.registry() else {
            return UrlQueueSnapshot::default();
        };

        let mut best: Option<UrlQueueSnapshot> = None;
        for (name, addr) in registry.entries() {
            if let Some(snapshot) = fetch_restore_with_retry(name.to_string(), addr).await {
                let is_better = best.as_ref().is_none_or(|b| {
                    snapshot.pending.len() + snapshot.visited.len()
                        > b.pending.len() + b.visited.len()
                });
                if is_better {
                    best = Some(snapshot);
                }
            }
        }

        best.unwrap_or_default()
    }

    pub fn seed_queue(&self, snapshot: UrlQueueSnapshot) {
        *self.pending.lock().unwrap() = snapshot.pending.into_iter().collect();
        for url in snapshot.visited {
            self.visited.insert(url);
        }
    }

    /// Background tick: rebuilds the digest and pushes to subscribers only
    /// if it changed since the last tick (spec §4.2 push-update idempotence).
    pub async fn run_stats_monitor(self: Arc<Self>) {
        let interval = Duration::from_millis(self.config.statistics.monitor_interval_ms.max(1));
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if self.callbacks.is_empty() {
                continue;
            }

            if !self.stats_dirty.swap(false, Ordering::Relaxed) {
                continue;
            }

            let digest = self.get_statistics().await;
            let changed = { *self.last_stats_digest.read().unwrap() != digest };
            if !changed {
                continue;
            }
            *self.last_stats_digest.write().unwrap() = digest.clone();

            let subscribers: Vec<CallbackRef> =
                self.callbacks.iter().map(|r| r.value().clone()).collect();
            for cb in subscribers {
                if deliver(&cb, &digest).await.is_err() {
                    self.callbacks.remove(&cb.addr);
                }
            }
        }
    }
}

async fn deliver(cb: &CallbackRef, digest: &str) -> anyhow::Result<()> {
    let addr = cb.socket_addr()?;
    let client = RemoteClient::<CallbackService>::new(cb.addr.clone(), addr)?;
    client
        .send(OnStatisticsUpdate {
            digest: digest.to_string(),
        })
        .await?;
    Ok(())
}

/// Five attempts total, 2s between each, per spec §4.2 crash recovery.
async fn fetch_restore_with_retry(name: String, addr: SocketAddr) -> Option<UrlQueueSnapshot> {
    let mut delays = FixedRetries::new(4, Duration::from_secs(2));

    loop {
        if let Ok(client) = RemoteClient::<StorageService>::new(name.clone(), addr) {
            if let Ok(snapshot) = client.send(crate::storage::service::RestoreUrlQueue).await {
                return Some(snapshot);
            }
        }

        match delays.next() {
            Some(delay) => tokio::time::sleep(delay).await,
            None => return None,
        }
    }
}

/// Queries each live replica's `getBarrelStats`, dropping any that fail to
/// answer, then renders the full digest text.
async fn build_digest(dispatcher: &Dispatcher) -> String {
    let mut top_searches: Vec<(String, u64)> = dispatcher
        .top_searches
        .iter()
        .map(|r| (r.key().clone(), *r.value()))
        .collect();
    top_searches.sort_by(|a, b| b.1.cmp(&a.1));
    top_searches.truncate(10);

    let live: Vec<Replica> = dispatcher.replicas.read().unwrap().clone();
    let mut replica_rows = Vec::with_capacity(live.len());
    for replica in &live {
        match replica
            .client
            .send(crate::storage::service::GetBarrelStats)
            .await
        {
            Ok(stats) => replica_rows.push((replica.name.clone(), ReplicaStatus::Stats(stats))),
            Err(_) => {
                dispatcher.drop_replica(&replica.name);
                replica_rows.push((replica.name.clone(), ReplicaStatus::Inaccessible));
            }
        }
    }

    let registry_names: Vec<String> = dispatcher
        .config
        .barrels
        .registry()
        .map(|r| r.names().to_vec())
        .unwrap_or_default();

    let response_times = registry_names
        .into_iter()
        .map(|name| {
            let total = dispatcher
                .resp_time_total
                .get(&name)
                .map(|r| *r.value())
                .unwrap_or(0);
            let count = dispatcher
                .resp_count
                .get(&name)
                .map(|r| *r.value())
                .unwrap_or(0);
            (name, total, count)
        })
        .collect();

    stats::build(&DigestInput {
        top_searches,
        replicas: replica_rows,
        response_times,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BarrelsConfig, GatewayConfig, RegistryConfig, StatisticsConfig};

    fn test_config() -> DispatcherConfig {
        DispatcherConfig {
            rmi: RegistryConfig {
                host: "127.0.0.1".to_string(),
                port: 9500,
            },
            gateway: GatewayConfig {
                name: "test-gateway".to_string(),
            },
            barrels: BarrelsConfig {
                count: 0,
                prefix: "barrel".to_string(),
                base_port: 9000,
                host: "127.0.0.1".to_string(),
            },
            statistics: StatisticsConfig {
                monitor_interval_ms: 3_000,
            },
            data_dir: ".".to_string(),
        }
    }

    #[tokio::test]
    async fn submit_url_dedup_then_pop_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.data_dir = dir.path().to_string_lossy().to_string();
        let dispatcher = Arc::new(Dispatcher::new(config));

        dispatcher.submit_url("http://a".to_string()).await;
        dispatcher.submit_url("http://a".to_string()).await;

        assert_eq!(dispatcher.next_url_to_crawl(), Some("http://a".to_string()));
        assert_eq!(dispatcher.next_url_to_crawl(), None);
    }

    #[tokio::test]
    async fn search_with_no_replicas_fails_with_no_replicas() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.data_dir = dir.path().to_string_lossy().to_string();
        let dispatcher = Dispatcher::new(config);

        let result = dispatcher.search("anything".to_string()).await;
        assert_eq!(result, Err(RpcError::NoReplicas));
    }

    #[tokio::test]
    async fn whitespace_only_query_is_empty_without_touching_replicas() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.data_dir = dir.path().to_string_lossy().to_string();
        let dispatcher = Dispatcher::new(config);

        let result = dispatcher.search("   ".to_string()).await;
        assert_eq!(result, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn statistics_digest_is_built_even_with_no_replicas() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.data_dir = dir.path().to_string_lossy().to_string();
        let dispatcher = Dispatcher::new(config);

        let digest = dispatcher.get_statistics().await;
        assert!(digest.contains("== Statistics =="));
        assert!(digest.contains("-- Active Replicas --"));
    }
}

pub async fn run(config: DispatcherConfig) -> anyhow::Result<()> {
    let addr = config.rmi.addr()?;
    let dispatcher = Arc::new(Dispatcher::new(config));

    let recovered = Dispatcher::recover_queue(&dispatcher.config).await;
    dispatcher.seed_queue(recovered);
    dispatcher.reconnect_replicas();

    tokio::spawn(Arc::clone(&dispatcher).run_stats_monitor());

    let service = DispatcherService {
        dispatcher: Arc::clone(&dispatcher),
    };
    let server: Server<DispatcherService> = service.bind(addr).await?;

    tracing::info!(name = %dispatcher.config.gateway.name, %addr, "dispatcher ready to accept requests");

    loop {
        if let Err(e) = server.accept().await {
            tracing::error!("{e:?}");
        }
    }
}

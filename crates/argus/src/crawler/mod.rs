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

//! Crawler Workers: pull a URL from the Dispatcher, fetch and parse it, then
//! reliably multicast the extracted update to every known Storage Node.

pub mod fetch;

use std::{collections::HashSet, net::SocketAddr, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex as AsyncMutex, RwLock as AsyncRwLock};

use crate::{
    config::CrawlerConfig,
    dispatcher::service::{DispatcherService, NextUrlToCrawl, SubmitUrl},
    distributed::RemoteClient,
    model::build_snippet,
    storage::service::{StorageService, UpdateIndex},
};

use self::fetch::{Fetcher, ReqwestFetcher};

const SNIPPET_TOKEN_LIMIT: usize = 30;
const DISPATCHER_RECONNECT_SLEEP: Duration = Duration::from_secs(10);

/// An update a worker couldn't deliver to a specific storage node. Held
/// in-memory only; a crawler process has no durable state of its own.
#[derive(Debug, Clone)]
struct PendingUpdate {
    url: String,
    title: String,
    snippet: String,
    terms: HashSet<String>,
    outgoing_links: HashSet<String>,
}

pub struct CrawlerProcess {
    config: CrawlerConfig,
    dispatcher_addr: SocketAddr,
    dispatcher: AsyncRwLock<Option<Arc<RemoteClient<DispatcherService>>>>,
    storage_nodes: AsyncRwLock<Vec<(String, Arc<RemoteClient<StorageService>>)>>,
    pending_updates: DashMap<String, Arc<AsyncMutex<std::collections::VecDeque<PendingUpdate>>>>,
    fetcher: Arc<dyn Fetcher>,
}

impl CrawlerProcess {
    /// Resolves the Dispatcher and every configured Storage Node; exits (via
    /// an `Err`) if either is entirely unreachable at startup, per spec §4.3.
    pub async fn bootstrap(config: CrawlerConfig) -> anyhow::Result<Arc<Self>> {
        let dispatcher_addr = config.rmi.addr()?;
        RemoteClient::<DispatcherService>::connect_retrying(dispatcher_addr, Duration::from_secs(5), 0)
            .await
            .map_err(|e| anyhow::anyhow!("dispatcher unreachable at startup ({dispatcher_addr}): {e}"))?;
        let dispatcher = RemoteClient::<DispatcherService>::new("dispatcher".to_string(), dispatcher_addr)?;

        let registry = config.barrels.registry()?;
        let mut storage_nodes = Vec::new();
        for (name, addr) in registry.entries() {
            if RemoteClient::<StorageService>::connect_retrying(addr, Duration::from_secs(5), 0)
                .await
                .is_ok()
            {
                if let Ok(client) = RemoteClient::<StorageService>::new(name.to_string(), addr) {
                    storage_nodes.push((name.to_string(), Arc::new(client)));
                }
            }
        }

        if storage_nodes.is_empty() {
            anyhow::bail!("no reachable storage nodes at startup");
        }

        Ok(Arc::new(Self {
            config,
            dispatcher_addr,
            dispatcher: AsyncRwLock::new(Some(Arc::new(dispatcher))),
            storage_nodes: AsyncRwLock::new(storage_nodes),
            pending_updates: DashMap::new(),
            fetcher: Arc::new(ReqwestFetcher::new()?),
        }))
    }

    async fn reconnect_dispatcher(&self) -> bool {
        match RemoteClient::<DispatcherService>::new("dispatcher".to_string(), self.dispatcher_addr) {
            Ok(client) => {
                *self.dispatcher.write().await = Some(Arc::new(client));
                true
            }
            Err(_) => false,
        }
    }

    /// `None` means `nextURLToCrawl` returned `none` (`QueueEmpty`, not an
    /// error); transport failures reconnect once then sleep 10s.
    async fn next_url(&self) -> Option<String> {
        loop {
            let dispatcher = self.dispatcher.read().await.clone();
            let Some(dispatcher) = dispatcher else {
                if !self.reconnect_dispatcher().await {
                    tokio::time::sleep(DISPATCHER_RECONNECT_SLEEP).await;
                }
                continue;
            };

            match dispatcher.send(NextUrlToCrawl).await {
                Ok(Some(url)) => return Some(url),
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!(error = %e, "dispatcher unreachable, reconnecting");
                    *self.dispatcher.write().await = None;
                    if !self.reconnect_dispatcher().await {
                        tokio::time::sleep(DISPATCHER_RECONNECT_SLEEP).await;
                    }
                }
            }
        }
    }

    async fn submit_url(&self, url: String) {
        let dispatcher = self.dispatcher.read().await.clone();
        if let Some(dispatcher) = dispatcher {
            if let Err(e) = dispatcher.send(SubmitUrl { url }).await {
                tracing::warn!(error = %e, "submitURL failed, link dropped this pass");
            }
        }
    }

    async fn multicast_update(&self, update: PendingUpdate) {
        let nodes = self.storage_nodes.read().await.clone();
        for (name, client) in nodes {
            let res = client
                .send(UpdateIndex {
                    url: update.url.clone(),
                    title: update.title.clone(),
                    snippet: update.snippet.clone(),
                    terms: update.terms.clone(),
                    outgoing_links: update.outgoing_links.clone(),
                })
                .await;

            if res.is_err() {
                tracing::warn!(node = %name, url = %update.url, "updateIndex failed, spilling to pending queue");
                let queue = self
                    .pending_updates
                    .entry(name)
                    .or_insert_with(|| Arc::new(AsyncMutex::new(std::collections::VecDeque::new())))
                    .clone();
                queue.lock().await.push_back(update.clone());
            }
        }
    }

    /// Re-resolves every node carrying pending updates and drains its queue
    /// in FIFO order; a pass over a node stops at its first failure.
    async fn drain_pending_updates(&self) {
        let Ok(registry) = self.config.barrels.registry() else {
            return;
        };

        let names: Vec<String> = self
            .pending_updates
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for name in names {
            let Some(addr) = registry.resolve(&name) else {
                continue;
            };
            let Ok(client) = RemoteClient::<StorageService>::new(name.clone(), addr) else {
                continue;
            };
            let Some(queue) = self.pending_updates.get(&name).map(|r| r.clone()) else {
                continue;
            };

            let mut queue = queue.lock().await;
            while let Some(update) = queue.front().cloned() {
                let res = client
                    .send(UpdateIndex {
                        url: update.url.clone(),
                        title: update.title.clone(),
                        snippet: update.snippet.clone(),
                        terms: update.terms.clone(),
                        outgoing_links: update.outgoing_links.clone(),
                    })
                    .await;

                match res {
                    Ok(()) => {
                        queue.pop_front();
                    }
                    Err(_) => break,
                }
            }
        }
    }

    async fn run_worker(self: Arc<Self>, worker_id: usize) {
        loop {
            let Some(url) = self.next_url().await else {
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            };

            match tokio::time::timeout(Duration::from_secs(10), self.fetcher.fetch(&url)).await {
                Ok(Ok(page)) => {
                    let terms: HashSet<String> = page.tokens.iter().cloned().collect();
                    let snippet =
                        build_snippet(page.tokens.iter().map(|t| t.as_str()), SNIPPET_TOKEN_LIMIT);

                    for link in &page.outgoing_links {
                        self.submit_url(link.clone()).await;
                    }

                    self.multicast_update(PendingUpdate {
                        url,
                        title: page.title,
                        snippet,
                        terms,
                        outgoing_links: page.outgoing_links,
                    })
                    .await;
                }
                Ok(Err(e)) => {
                    tracing::warn!(worker_id, %url, error = %e, "fetch failed, url abandoned (FetchFailure)");
                }
                Err(_) => {
                    tracing::warn!(worker_id, %url, "fetch timed out, url abandoned (FetchFailure)");
                }
            }

            self.drain_pending_updates().await;
        }
    }
}

pub async fn run(config: CrawlerConfig) -> anyhow::Result<()> {
    let threads = config.downloader.threads.max(1);
    let process = CrawlerProcess::bootstrap(config).await?;

    tracing::info!(threads, "crawler ready");

    let mut handles = Vec::with_capacity(threads);
    for worker_id in 0..threads {
        handles.push(tokio::spawn(Arc::clone(&process).run_worker(worker_id)));
    }

    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

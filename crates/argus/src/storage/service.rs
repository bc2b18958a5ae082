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

//! The Storage Node RPC surface (spec §6 "Storage Node service").

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use crate::{
    distributed::sonic::{self, service::sonic_service},
    model::{PageRecord, SearchResult, UrlQueueSnapshot},
};

use super::StorageNode;

sonic_service!(
    StorageService,
    [
        Search,
        UpdateIndex,
        GetBacklinks,
        GetBarrelStats,
        GetInvertedIndex,
        GetBacklinksMap,
        GetPageInfoMap,
        BackupUrlQueue,
        RestoreUrlQueue,
    ]
);

pub struct StorageService {
    pub node: Arc<StorageNode>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct Search {
    pub terms: Vec<String>,
}

impl sonic::service::Message<StorageService> for Search {
    type Response = Vec<SearchResult>;

    async fn handle(self, server: &StorageService) -> Self::Response {
        server.node.search(&self.terms)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct UpdateIndex {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub terms: HashSet<String>,
    pub outgoing_links: HashSet<String>,
}

impl sonic::service::Message<StorageService> for UpdateIndex {
    type Response = ();

    async fn handle(self, server: &StorageService) -> Self::Response {
        server
            .node
            .update_index(self.url, self.title, self.snippet, self.terms, self.outgoing_links);
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetBacklinks {
    pub url: String,
}

impl sonic::service::Message<StorageService> for GetBacklinks {
    type Response = Vec<String>;

    async fn handle(self, server: &StorageService) -> Self::Response {
        server.node.backlinks(&self.url)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetBarrelStats;

impl sonic::service::Message<StorageService> for GetBarrelStats {
    type Response = String;

    async fn handle(self, server: &StorageService) -> Self::Response {
        server.node.barrel_stats()
    }
}

/// Full map exports, used only at peer sync.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetInvertedIndex;

impl sonic::service::Message<StorageService> for GetInvertedIndex {
    type Response = HashMap<String, HashSet<String>>;

    async fn handle(self, server: &StorageService) -> Self::Response {
        server.node.inverted_index_snapshot()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetBacklinksMap;

impl sonic::service::Message<StorageService> for GetBacklinksMap {
    type Response = HashMap<String, HashSet<String>>;

    async fn handle(self, server: &StorageService) -> Self::Response {
        server.node.backlinks_snapshot()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetPageInfoMap;

impl sonic::service::Message<StorageService> for GetPageInfoMap {
    type Response = HashMap<String, PageRecord>;

    async fn handle(self, server: &StorageService) -> Self::Response {
        server.node.page_info_snapshot()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct BackupUrlQueue {
    pub pending: Vec<String>,
    pub visited: BTreeSet<String>,
}

impl sonic::service::Message<StorageService> for BackupUrlQueue {
    type Response = ();

    async fn handle(self, server: &StorageService) -> Self::Response {
        server
            .node
            .backup_queue(UrlQueueSnapshot {
                pending: self.pending,
                visited: self.visited,
            })
            .await;
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct RestoreUrlQueue;

impl sonic::service::Message<StorageService> for RestoreUrlQueue {
    type Response = UrlQueueSnapshot;

    async fn handle(self, server: &StorageService) -> Self::Response {
        server.node.restore_queue().await
    }
}

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

//! The Dispatcher RPC surface (spec §6 "Dispatcher service").

use std::sync::Arc;

use crate::{
    distributed::sonic::{self, service::sonic_service},
    model::SearchResult,
    RpcResult,
};

use super::{callback::CallbackRef, Dispatcher};

sonic_service!(
    DispatcherService,
    [
        SubmitUrl,
        Search,
        GetBacklinks,
        GetStatistics,
        NextUrlToCrawl,
        SubscribeStats,
        UnsubscribeStats,
    ]
);

pub struct DispatcherService {
    pub dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct SubmitUrl {
    pub url: String,
}

impl sonic::service::Message<DispatcherService> for SubmitUrl {
    type Response = ();

    async fn handle(self, server: &DispatcherService) -> Self::Response {
        server.dispatcher.submit_url(self.url).await;
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct Search {
    pub query: String,
}

impl sonic::service::Message<DispatcherService> for Search {
    type Response = RpcResult<Vec<SearchResult>>;

    async fn handle(self, server: &DispatcherService) -> Self::Response {
        server.dispatcher.search(self.query).await
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetBacklinks {
    pub url: String,
}

impl sonic::service::Message<DispatcherService> for GetBacklinks {
    type Response = RpcResult<Vec<String>>;

    async fn handle(self, server: &DispatcherService) -> Self::Response {
        server.dispatcher.get_backlinks(self.url).await
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetStatistics;

impl sonic::service::Message<DispatcherService> for GetStatistics {
    type Response = String;

    async fn handle(self, server: &DispatcherService) -> Self::Response {
        server.dispatcher.get_statistics().await
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct NextUrlToCrawl;

impl sonic::service::Message<DispatcherService> for NextUrlToCrawl {
    type Response = Option<String>;

    async fn handle(self, server: &DispatcherService) -> Self::Response {
        server.dispatcher.next_url_to_crawl()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct SubscribeStats {
    pub callback: CallbackRef,
}

impl sonic::service::Message<DispatcherService> for SubscribeStats {
    type Response = ();

    async fn handle(self, server: &DispatcherService) -> Self::Response {
        server.dispatcher.subscribe_stats(self.callback).await;
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct UnsubscribeStats {
    pub callback: CallbackRef,
}

impl sonic::service::Message<DispatcherService> for UnsubscribeStats {
    type Response = ();

    async fn handle(self, server: &DispatcherService) -> Self::Response {
        server.dispatcher.unsubscribe_stats(self.callback);
    }
}

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

//! Core library for the distributed crawler, index, and search system.
//!
//! The system is split into three long-running components that talk to each
//! other over a small TCP RPC layer ([`distributed::sonic`]):
//!
//! - [`storage`]: a replicated inverted-index + backlink-graph node ("storage node").
//! - [`dispatcher`]: the central coordinator that owns the crawl queue, routes
//!   search requests to storage nodes, and aggregates statistics.
//! - [`crawler`]: pull-based workers that fetch pages and multicast updates to
//!   every storage node.

pub mod config;
pub mod crawler;
pub mod dispatcher;
pub mod distributed;
pub mod model;
pub mod storage;

use thiserror::Error;

/// Errors surfaced across RPC boundaries. Everything else (disk I/O failures,
/// fetch failures, duplicate submissions) is handled locally by the component
/// that encounters it and never reaches a caller as an `Err`.
#[derive(
    Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum RpcError {
    #[error("remote endpoint is unreachable")]
    Unreachable,

    #[error("no reachable storage node replicas")]
    NoReplicas,
}

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
pub type RpcResult<T> = std::result::Result<T, RpcError>;

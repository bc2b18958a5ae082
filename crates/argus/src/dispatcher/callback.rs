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

//! The subscriber side of the stats-push contract (spec §6 `CallbackRef`).
//!
//! A subscriber is any process exporting a tiny service with one method,
//! `onStatisticsUpdate`. The Dispatcher only ever acts as a *client* of this
//! service — [`CallbackService`] exists solely to give [`RemoteClient`] a
//! concrete type to call through; nothing in this crate binds it.

use std::net::SocketAddr;

use crate::distributed::sonic::{self, service::sonic_service};

/// A handle to a remote subscriber, addressed by the socket it exports its
/// callback service on. Plain data, not a live connection — treated as a
/// weak reference per spec §9: dropped on first delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct CallbackRef {
    pub addr: String,
}

impl CallbackRef {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid callback address '{}': {e}", self.addr))
    }
}

pub struct CallbackService;

sonic_service!(CallbackService, [OnStatisticsUpdate]);

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct OnStatisticsUpdate {
    pub digest: String,
}

impl sonic::service::Message<CallbackService> for OnStatisticsUpdate {
    type Response = ();

    async fn handle(self, _server: &CallbackService) -> Self::Response {
        unreachable!("the dispatcher never binds CallbackService locally; it only calls out to one")
    }
}

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

//! Everything needed to talk to another process over the wire: the framed
//! transport and typed service layer in [`sonic`], reconnect backoff in
//! [`retry_strategy`], the static name book in [`registry`], and
//! [`RemoteClient`], a pooled handle to a single named service endpoint.

pub mod registry;
pub mod retry_strategy;
pub mod sonic;

use std::{net::SocketAddr, time::Duration};

use sonic::service::{Connection, Service, Wrapper};

use self::retry_strategy::ExponentialBackoff;

/// A pooled connection to one remote service endpoint, identified by the name
/// it was registered under. Dispatcher replicas and crawler-to-storage links
/// are each one `RemoteClient`; round-robin and failover across several
/// endpoints is the caller's responsibility (see `dispatcher::replicas`).
pub struct RemoteClient<S: Service> {
    name: String,
    pool: sonic::ConnectionPool<S>,
}

impl<S: Service> RemoteClient<S> {
    pub fn new(name: impl Into<String>, addr: SocketAddr) -> anyhow::Result<Self> {
        Ok(Self {
            name: name.into(),
            pool: sonic::ConnectionPool::new(addr)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> SocketAddr {
        self.pool.addr()
    }

    pub async fn send<R: Wrapper<S>>(&self, request: R) -> anyhow::Result<R::Response> {
        let mut conn = self.pool.get().await?;
        Ok(conn.send(request).await?)
    }

    /// Connects directly, bypassing the pool, retrying with exponential
    /// backoff. Used on startup and during crash recovery, where a pooled
    /// connection wouldn't exist yet anyway.
    pub async fn connect_retrying(
        addr: SocketAddr,
        timeout: Duration,
        max_attempts: u32,
    ) -> anyhow::Result<Connection<S>> {
        let backoff = ExponentialBackoff::from_millis(200)
            .with_limit(Duration::from_secs(5))
            .take(max_attempts as usize);

        Ok(Connection::create_with_timeout_retry(addr, timeout, backoff).await?)
    }
}

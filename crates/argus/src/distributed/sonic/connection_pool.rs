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

//! A small `deadpool`-backed pool of [`super::service::Connection`]s, so a
//! [`super::replication::RemoteClient`] doesn't pay a TCP handshake per RPC.

use std::net::SocketAddr;

use deadpool::managed;

use super::service::{Connection, Service};

pub struct Manager<S> {
    addr: SocketAddr,
    _marker: std::marker::PhantomData<S>,
}

impl<S> Manager<S> {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<S> managed::Manager for Manager<S>
where
    S: Service,
{
    type Type = Connection<S>;
    type Error = anyhow::Error;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        Ok(Connection::create(self.addr).await?)
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> managed::RecycleResult<Self::Error> {
        if conn.is_closed().await {
            Err(managed::RecycleError::Message("connection is closed".into()))
        } else {
            Ok(())
        }
    }
}

pub struct ConnectionPool<S: Service> {
    addr: SocketAddr,
    pool: managed::Pool<Manager<S>>,
}

impl<S: Service> ConnectionPool<S> {
    pub fn new(addr: SocketAddr) -> anyhow::Result<Self> {
        let manager = Manager::new(addr);
        let pool = managed::Pool::builder(manager).build()?;
        Ok(Self { addr, pool })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn get(&self) -> anyhow::Result<managed::Object<Manager<S>>> {
        self.pool
            .get()
            .await
            .map_err(|_| anyhow::anyhow!("failed to get connection from pool"))
    }
}

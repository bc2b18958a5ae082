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

//! A minimal length-prefixed, bincode-framed RPC transport over TCP.
//!
//! This is the wire layer every service in this crate is built on top of:
//! [`service`] adds typed request/response enums and a macro for declaring a
//! service's message set; [`connection_pool`] adds pooled, reusable client
//! connections.

pub mod connection_pool;
pub mod service;

pub use connection_pool::ConnectionPool;

use std::{marker::PhantomData, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, ToSocketAddrs},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

const MAX_BODY_SIZE_BYTES: usize = 1024 * 1024 * 1024; // 1GB
const MAX_CONNECTION_TTL: Duration = Duration::from_secs(60);

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("connection timed out")]
    ConnectionTimeout,

    #[error("timed out waiting for a response")]
    RequestTimeout,

    #[error("could not obtain a connection from the pool")]
    PoolGet,

    #[error("body size ({body_size}) exceeds the maximum allowed ({max_size})")]
    BodyTooLarge { body_size: usize, max_size: usize },

    #[error("failed to encode/decode message: {0}")]
    Codec(String),
}

#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Header {
    body_size: u64,
}

pub struct Connection<Req, Res> {
    stream: TcpStream,
    created: std::time::Instant,
    marker: PhantomData<(Req, Res)>,
}

impl<Req, Res> Connection<Req, Res>
where
    Req: bincode::Encode,
    Res: bincode::Decode,
{
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::create_with_timeout(addr, Duration::from_secs(30)).await
    }

    pub async fn create_with_timeout(
        addr: impl ToSocketAddrs,
        timeout: Duration,
    ) -> Result<Self> {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                Ok(Self {
                    stream,
                    created: std::time::Instant::now(),
                    marker: PhantomData,
                })
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Err(Error::ConnectionTimeout),
        }
    }

    pub async fn create_with_timeout_retry(
        addr: impl ToSocketAddrs + Clone,
        timeout: Duration,
        retry: impl Iterator<Item = Duration>,
    ) -> Result<Self> {
        let mut last = Self::create_with_timeout(addr.clone(), timeout).await;

        for backoff in retry {
            if last.is_ok() {
                break;
            }
            tokio::time::sleep(backoff).await;
            last = Self::create_with_timeout(addr.clone(), timeout).await;
        }

        last
    }

    async fn send_without_timeout(&mut self, request: &Req) -> Result<Res> {
        let bytes = bincode::encode_to_vec(request, bincode::config::standard())
            .map_err(|e| Error::Codec(e.to_string()))?;

        let header = Header {
            body_size: bytes.len() as u64,
        };

        self.stream.write_all(bytemuck::bytes_of(&header)).await?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;

        let mut header_buf = [0u8; std::mem::size_of::<Header>()];
        self.stream.read_exact(&mut header_buf).await?;
        let header: Header = *bytemuck::from_bytes(&header_buf);

        if header.body_size as usize > MAX_BODY_SIZE_BYTES {
            return Err(Error::BodyTooLarge {
                body_size: header.body_size as usize,
                max_size: MAX_BODY_SIZE_BYTES,
            });
        }

        let mut buf = vec![0u8; header.body_size as usize];
        self.stream.read_exact(&mut buf).await?;

        let (res, _) = bincode::decode_from_slice(&buf, bincode::config::standard())
            .map_err(|e| Error::Codec(e.to_string()))?;

        Ok(res)
    }

    pub async fn send(&mut self, request: &Req) -> Result<Res> {
        self.send_with_timeout(request, Duration::from_secs(90))
            .await
    }

    pub async fn send_with_timeout(&mut self, request: &Req, timeout: Duration) -> Result<Res> {
        match tokio::time::timeout(timeout, self.send_without_timeout(request)).await {
            Ok(res) => res,
            Err(_) => {
                let _ = self.stream.shutdown().await;
                Err(Error::RequestTimeout)
            }
        }
    }

    pub async fn is_closed(&mut self) -> bool {
        if self.created.elapsed() > MAX_CONNECTION_TTL {
            let _ = self.stream.shutdown().await;
            return true;
        }

        !matches!(
            tokio::time::timeout(Duration::from_secs(1), self.stream.read_exact(&mut [])).await,
            Ok(Ok(_))
        )
    }
}

pub struct Server<Req, Res> {
    listener: TcpListener,
    marker: PhantomData<(Req, Res)>,
}

impl<Req, Res> Server<Req, Res>
where
    Req: bincode::Decode,
    Res: bincode::Encode,
{
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            marker: PhantomData,
        })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn accept(&self) -> Result<Request<Req, Res>> {
        let (stream, _) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Request::read(stream).await
    }
}

pub struct Request<Req, Res> {
    stream: TcpStream,
    body: Option<Req>,
    marker: PhantomData<Res>,
}

impl<Req, Res> Request<Req, Res>
where
    Req: bincode::Decode,
    Res: bincode::Encode,
{
    async fn read(mut stream: TcpStream) -> Result<Self> {
        let mut header_buf = [0u8; std::mem::size_of::<Header>()];
        stream.read_exact(&mut header_buf).await?;
        let header: Header = *bytemuck::from_bytes(&header_buf);

        if header.body_size as usize > MAX_BODY_SIZE_BYTES {
            return Err(Error::BodyTooLarge {
                body_size: header.body_size as usize,
                max_size: MAX_BODY_SIZE_BYTES,
            });
        }

        let mut buf = vec![0u8; header.body_size as usize];
        stream.read_exact(&mut buf).await?;

        let (body, _) = bincode::decode_from_slice(&buf, bincode::config::standard())
            .map_err(|e| Error::Codec(e.to_string()))?;

        Ok(Self {
            stream,
            body: Some(body),
            marker: PhantomData,
        })
    }

    pub fn take_body(&mut self) -> Req {
        self.body.take().expect("request body already taken")
    }

    pub async fn respond(mut self, response: Res) -> Result<()> {
        let bytes = bincode::encode_to_vec(&response, bincode::config::standard())
            .map_err(|e| Error::Codec(e.to_string()))?;

        let header = Header {
            body_size: bytes.len() as u64,
        };

        self.stream.write_all(bytemuck::bytes_of(&header)).await?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;

        Ok(())
    }
}

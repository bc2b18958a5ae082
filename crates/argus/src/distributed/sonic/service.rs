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

//! Typed request/response framing on top of the raw [`super`] transport.
//!
//! A "service" is a server-side struct plus a fixed set of message types; the
//! [`sonic_service!`] macro generates the request/response enum boilerplate so
//! call sites can send a concrete message type and get back its concrete
//! response type instead of matching on a enum by hand.

use std::{sync::Arc, time::Duration};

use tokio::net::ToSocketAddrs;

use super::Result;

pub trait Service: Sized + Send + Sync + 'static {
    type Request: bincode::Decode + Send + Sync;
    type RequestRef<'a>: bincode::Encode + Send + Sync;
    type Response: bincode::Encode + bincode::Decode + Send + Sync;

    fn handle(
        req: Self::Request,
        server: &Self,
    ) -> impl std::future::Future<Output = Self::Response> + Send + '_;
}

pub trait Message<S: Service>: Send {
    type Response;
    fn handle(self, server: &S) -> impl std::future::Future<Output = Self::Response> + Send;
}

pub trait Wrapper<S: Service>: Message<S> {
    fn wrap_request_ref(req: &Self) -> S::RequestRef<'_>;
    fn unwrap_response(res: S::Response) -> Option<Self::Response>;
}

pub struct Server<S: Service> {
    inner: super::Server<S::Request, S::Response>,
    service: Arc<S>,
}

impl<S: Service> Server<S> {
    pub async fn bind(service: S, addr: impl ToSocketAddrs) -> Result<Self> {
        Ok(Self {
            inner: super::Server::bind(addr).await?,
            service: Arc::new(service),
        })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.inner.local_addr()
    }

    /// Accept one connection and spawn a task to serve its single request.
    /// Callers typically loop `server.accept().await` forever.
    pub async fn accept(&self) -> Result<()> {
        let mut req = self.inner.accept().await?;
        let service = Arc::clone(&self.service);

        tokio::spawn(async move {
            let body = req.take_body();
            let res = S::handle(body, &service).await;

            if let Err(e) = req.respond(res).await {
                tracing::error!("failed to respond to request: {e}");
            }
        });

        Ok(())
    }
}

pub struct Connection<S: Service> {
    addr: std::net::SocketAddr,
    inner: super::Connection<S::Request, S::Response>,
}

impl<S: Service> Connection<S> {
    pub async fn create(addr: std::net::SocketAddr) -> Result<Self> {
        Ok(Self {
            addr,
            inner: super::Connection::connect(addr).await?,
        })
    }

    pub async fn create_with_timeout_retry(
        addr: std::net::SocketAddr,
        timeout: Duration,
        retry: impl Iterator<Item = Duration>,
    ) -> Result<Self> {
        Ok(Self {
            addr,
            inner: super::Connection::create_with_timeout_retry(addr, timeout, retry).await?,
        })
    }

    pub fn addr(&self) -> std::net::SocketAddr {
        self.addr
    }

    pub async fn send<R: Wrapper<S>>(&mut self, request: R) -> Result<R::Response> {
        self.send_with_timeout(request, Duration::from_secs(90))
            .await
    }

    pub async fn send_with_timeout<R: Wrapper<S>>(
        &mut self,
        request: R,
        timeout: Duration,
    ) -> Result<R::Response> {
        let req_ref = R::wrap_request_ref(&request);
        let raw = self.inner.send_with_timeout(&req_ref, timeout).await?;
        Ok(R::unwrap_response(raw).expect("response variant mismatch"))
    }

    pub async fn is_closed(&mut self) -> bool {
        self.inner.is_closed().await
    }
}

/// Declares the request/response enum pair for `$service` over the listed
/// message types, and implements [`Service`] for `$service` by dispatching on
/// the generated request enum.
macro_rules! sonic_service {
    ($service:ident, [$($req:ident),*$(,)?]) => {
        mod service_impl__ {
            #![allow(dead_code)]

            use super::{$service, $($req),*};
            use $crate::distributed::sonic;

            #[derive(Debug, Clone, ::bincode::Decode)]
            pub enum Request {
                $($req(Box<$req>),)*
            }
            #[derive(Debug, Clone, ::bincode::Encode)]
            pub enum RequestRef<'a> {
                $($req(&'a $req),)*
            }
            #[derive(::bincode::Encode, ::bincode::Decode)]
            pub enum Response {
                $($req(Box<<$req as sonic::service::Message<$service>>::Response>),)*
            }

            $(
                impl sonic::service::Wrapper<$service> for $req {
                    fn wrap_request_ref(req: &Self) -> RequestRef {
                        RequestRef::$req(req)
                    }
                    fn unwrap_response(res: <$service as sonic::service::Service>::Response) -> Option<Self::Response> {
                        #[allow(irrefutable_let_patterns)]
                        if let Response::$req(value) = res {
                            Some(*value)
                        } else {
                            None
                        }
                    }
                }
            )*

            impl sonic::service::Service for $service {
                type Request = Request;
                type RequestRef<'a> = RequestRef<'a>;
                type Response = Response;

                #[allow(clippy::manual_async_fn)]
                fn handle(req: Request, server: &Self) -> impl std::future::Future<Output = Self::Response> + Send + '_ {
                    async move {
                        match req {
                            $(
                                Request::$req(value) => Response::$req(Box::new(sonic::service::Message::handle(*value, server).await)),
                            )*
                        }
                    }
                }
            }

            impl $service {
                pub async fn bind(self, addr: impl ::tokio::net::ToSocketAddrs) -> sonic::Result<sonic::service::Server<Self>> {
                    sonic::service::Server::bind(self, addr).await
                }
            }
        }
    };
}

pub(crate) use sonic_service;

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    struct CounterService {
        counter: AtomicI64,
    }

    sonic_service!(CounterService, [Add, Reset]);

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
    struct Add {
        amount: i64,
    }

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
    struct Reset;

    impl Message<CounterService> for Add {
        type Response = i64;

        async fn handle(self, server: &CounterService) -> Self::Response {
            server.counter.fetch_add(self.amount, Ordering::SeqCst) + self.amount
        }
    }

    impl Message<CounterService> for Reset {
        type Response = ();

        async fn handle(self, server: &CounterService) -> Self::Response {
            server.counter.store(0, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn roundtrip_through_tcp() {
        let server = CounterService {
            counter: AtomicI64::new(0),
        }
        .bind(("127.0.0.1", 0))
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                if server.accept().await.is_err() {
                    break;
                }
            }
        });

        let mut conn = Connection::<CounterService>::create(addr).await.unwrap();
        let v = conn.send(Add { amount: 10 }).await.unwrap();
        assert_eq!(v, 10);
        let v = conn.send(Add { amount: 5 }).await.unwrap();
        assert_eq!(v, 15);
        conn.send(Reset).await.unwrap();
        let v = conn.send(Add { amount: 1 }).await.unwrap();
        assert_eq!(v, 1);
    }
}

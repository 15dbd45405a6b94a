//! HTTP front end.
//!
//! Each accepted connection is served on its own task. Requests share
//! nothing but the read-only [`Router`], so there is no locking and no
//! ordering between concurrent requests.

mod router;

pub use router::Router;

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::store::ModuleSource;
use crate::zip::ZipPackager;

/// Module proxy server bound to a [`ModuleSource`].
pub struct ProxyServer<S> {
    router: Arc<Router<S>>,
}

impl<S> Clone for ProxyServer<S> {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
        }
    }
}

impl<S: ModuleSource + 'static> ProxyServer<S> {
    pub fn new(source: S, packager: ZipPackager) -> Self {
        Self {
            router: Arc::new(Router::new(source, packager)),
        }
    }

    pub fn router(&self) -> &Router<S> {
        &self.router
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Failures on individual connections are logged and never stop the
    /// server. Connections already accepted keep running after shutdown.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => self.spawn_connection(stream, peer),
                Err(err) => warn!(%err, "accept failed"),
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let router = Arc::clone(&self.router);
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let router = Arc::clone(&router);
                async move {
                    let (parts, _) = req.into_parts();
                    let response = router.respond(&parts.method, parts.uri.path()).await;
                    debug!(
                        %peer,
                        method = %parts.method,
                        path = parts.uri.path(),
                        status = response.status().as_u16(),
                        "request"
                    );
                    Ok::<_, Infallible>(response)
                }
            });

            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(%peer, %err, "connection closed with error");
            }
        });
    }
}

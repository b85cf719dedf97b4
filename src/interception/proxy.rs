// src/interception/proxy.rs
//! Redirecting forward proxy
//!
//! The interception hook. Every plain HTTP request is reassembled into an
//! absolute URL and, when it matches the watch list, handed to the engine.
//! A `Redirect` verdict is answered with a 307 pointing at the target;
//! anything else is forwarded upstream untouched. HTTPS traffic arrives as
//! CONNECT and is tunneled opaquely, so TLS requests can only be evaluated
//! by deployments that terminate TLS in front of this listener.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use metrics::counter;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::engine::policy::Verdict;
use crate::engine::redirector::RedirectEngine;
use crate::interception::watch_list::WatchList;
use crate::utils::config::ServerConfig;
use crate::utils::errors::{RedirectorError, Result};

/// Headers that belong to a single hop and must not be relayed
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Redirecting forward proxy
pub struct RedirectProxy {
    config: ServerConfig,
    watch_list: Arc<WatchList>,
    engine: Arc<RedirectEngine>,
    http_client: hyper_util::client::legacy::Client<
        hyper_util::client::legacy::connect::HttpConnector,
        Full<Bytes>,
    >,

    /// Requests handled
    request_count: AtomicU64,

    /// Redirects issued
    redirect_count: AtomicU64,

    /// CONNECT tunnels opened
    tunnel_count: AtomicU64,
}

impl RedirectProxy {
    /// Create a new proxy
    pub fn new(
        config: ServerConfig,
        watch_list: Arc<WatchList>,
        engine: Arc<RedirectEngine>,
    ) -> Self {
        let http_client = hyper_util::client::legacy::Client::builder(
            hyper_util::rt::TokioExecutor::new(),
        )
        .build_http();

        Self {
            config,
            watch_list,
            engine,
            http_client,
            request_count: AtomicU64::new(0),
            redirect_count: AtomicU64::new(0),
            tunnel_count: AtomicU64::new(0),
        }
    }

    /// Bind the configured address and serve until the task is aborted
    pub async fn start(self: Arc<Self>) -> Result<()> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            RedirectorError::InterceptionFailed(format!("Failed to bind proxy on {}: {}", addr, e))
        })?;

        info!("Redirect proxy listening on {}", addr);
        self.run(listener).await
    }

    /// Serve connections from an already-bound listener
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let proxy = Arc::clone(&self);

                    tokio::spawn(async move {
                        debug!("Accepted connection from {}", addr);

                        let io = TokioIo::new(stream);

                        let service = service_fn(move |req| {
                            let proxy = Arc::clone(&proxy);
                            async move { proxy.handle_request(req).await }
                        });

                        if let Err(e) = http1::Builder::new()
                            .serve_connection(io, service)
                            .with_upgrades()
                            .await
                        {
                            error!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Handle one incoming request
    async fn handle_request(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        counter!("redirector_requests_total").increment(1);

        if req.method() == Method::CONNECT {
            return self.handle_connect(req);
        }

        let url_string = match request_url(&req) {
            Some(url) => url,
            None => {
                warn!(
                    "Could not determine request URL for {} {}",
                    req.method(),
                    req.uri()
                );
                return Ok(error_response(StatusCode::BAD_REQUEST, "Malformed request"));
            }
        };

        debug!("Intercepted request: {} {}", req.method(), url_string);

        let watched = match Url::parse(&url_string) {
            Ok(candidate) => self.watch_list.matches(&candidate),
            Err(e) => {
                warn!("Unparseable request URL {}: {}", url_string, e);
                false
            }
        };

        if watched {
            if let Verdict::Redirect { target } = self.engine.evaluate(&url_string, Instant::now())
            {
                self.redirect_count.fetch_add(1, Ordering::Relaxed);
                counter!("redirector_redirects_total").increment(1);
                info!("Redirecting {} -> {}", url_string, target);
                return Ok(redirect_response(&target));
            }
        }

        match self.forward_upstream(req, &url_string).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!("Failed to forward request: {}", e);
                Ok(error_response(
                    StatusCode::BAD_GATEWAY,
                    "Failed to reach upstream",
                ))
            }
        }
    }

    /// Open an opaque tunnel for a CONNECT request. Watched hosts pass
    /// through here without evaluation; the payload is TLS.
    fn handle_connect(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>> {
        let authority = match req.uri().authority() {
            Some(authority) => authority.to_string(),
            None => {
                warn!("CONNECT without an authority");
                return Ok(error_response(
                    StatusCode::BAD_REQUEST,
                    "CONNECT requires an authority",
                ));
            }
        };

        let host = authority
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| authority.clone());
        if self.watch_list.matches_host(&host) {
            debug!("Watched host {} tunneled opaquely", host);
        }

        self.tunnel_count.fetch_add(1, Ordering::Relaxed);
        counter!("redirector_tunnels_total").increment(1);

        tokio::spawn(async move {
            match hyper::upgrade::on(req).await {
                Ok(upgraded) => {
                    let mut client = TokioIo::new(upgraded);
                    match TcpStream::connect(&authority).await {
                        Ok(mut server) => {
                            if let Err(e) =
                                tokio::io::copy_bidirectional(&mut client, &mut server).await
                            {
                                debug!("Tunnel to {} closed: {}", authority, e);
                            }
                        }
                        Err(e) => warn!("CONNECT to {} failed: {}", authority, e),
                    }
                }
                Err(e) => warn!("CONNECT upgrade failed: {}", e),
            }
        });

        Ok(Response::new(Full::new(Bytes::new())))
    }

    /// Forward a request upstream and buffer the response back
    async fn forward_upstream(
        &self,
        req: Request<Incoming>,
        target_uri: &str,
    ) -> Result<Response<Full<Bytes>>> {
        let (parts, body) = req.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map_err(|e| RedirectorError::InterceptionFailed(format!("Body read error: {}", e)))?
            .to_bytes();

        let mut upstream_req = Request::builder()
            .method(parts.method)
            .uri(target_uri)
            .body(Full::new(body_bytes))
            .map_err(|e| {
                RedirectorError::InterceptionFailed(format!("Request build error: {}", e))
            })?;
        *upstream_req.headers_mut() = parts.headers;
        for name in HOP_BY_HOP_HEADERS {
            upstream_req.headers_mut().remove(*name);
        }

        let response = self.http_client.request(upstream_req).await.map_err(|e| {
            RedirectorError::InterceptionFailed(format!("Upstream request failed: {}", e))
        })?;

        let (mut parts, body) = response.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map_err(|e| {
                RedirectorError::InterceptionFailed(format!("Response body error: {}", e))
            })?
            .to_bytes();
        for name in HOP_BY_HOP_HEADERS {
            parts.headers.remove(*name);
        }

        Ok(Response::from_parts(parts, Full::new(body_bytes)))
    }

    /// Get proxy statistics
    pub fn stats(&self) -> ProxyStats {
        ProxyStats {
            request_count: self.request_count.load(Ordering::Relaxed),
            redirect_count: self.redirect_count.load(Ordering::Relaxed),
            tunnel_count: self.tunnel_count.load(Ordering::Relaxed),
        }
    }
}

/// Proxy statistics
#[derive(Debug, Clone)]
pub struct ProxyStats {
    /// Requests handled
    pub request_count: u64,

    /// Redirects issued
    pub redirect_count: u64,

    /// CONNECT tunnels opened
    pub tunnel_count: u64,
}

/// Reassemble the absolute URL of a request. Absolute-form URIs are used
/// as-is; origin-form requests are rebuilt from the Host header, which on
/// a plain listener means an `http` scheme.
fn request_url<B>(req: &Request<B>) -> Option<String> {
    let uri = req.uri();
    if uri.scheme().is_some() && uri.host().is_some() {
        return Some(uri.to_string());
    }

    let host = req.headers().get(header::HOST)?.to_str().ok()?;
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Some(format!("http://{}{}", host, path_and_query))
}

/// Build the redirect answer for a target URL
fn redirect_response(target: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header(header::LOCATION, target)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Build a plain-text error response
fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(message.to_string())))
        .unwrap()
}

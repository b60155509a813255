//! Application assembly and the HTTP server

use crate::api::{self, AppState};
use crate::config::CorsConfig;
use crate::error::ZangliError;
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode, Uri, header, request::Parts};
use regex::RegexSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Origins accepted in addition to the configured list when local network access is on
const LOCAL_NETWORK_ORIGINS: [&str; 5] = [
    r"^http://localhost:\d+$",
    r"^http://127\.0\.0\.1:\d+$",
    r"^http://192\.168\.\d+\.\d+:\d+$",
    r"^http://10\.\d+\.\d+\.\d+:\d+$",
    r"^http://172\.(1[6-9]|2[0-9]|3[0-1])\.\d+\.\d+:\d+$",
];

/// Decides which browser origins may call the API
#[derive(Debug, Clone)]
pub struct OriginMatcher {
    exact: Vec<String>,
    patterns: Option<RegexSet>,
    any: bool,
}

impl OriginMatcher {
    pub fn new(config: &CorsConfig) -> Result<Self> {
        let any = config.origins.iter().any(|o| o.trim() == "*");
        let exact = config
            .origins
            .iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty() && o != "*")
            .collect();
        let patterns = if config.allow_local_network {
            Some(RegexSet::new(LOCAL_NETWORK_ORIGINS).context("Invalid local network origin pattern")?)
        } else {
            None
        };
        Ok(Self {
            exact,
            patterns,
            any,
        })
    }

    #[must_use]
    pub fn matches(&self, origin: &str) -> bool {
        self.any
            || self.exact.iter().any(|o| o == origin)
            || self.patterns.as_ref().is_some_and(|set| set.is_match(origin))
    }
}

pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let matcher = OriginMatcher::new(config)?;
    let allow_origin = if matcher.any {
        AllowOrigin::any()
    } else {
        let matcher = Arc::new(matcher);
        AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
            origin.to_str().is_ok_and(|o| matcher.matches(o))
        })
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

async fn not_found(uri: Uri) -> ZangliError {
    ZangliError::NotFound {
        path: uri.path().to_string(),
    }
}

/// The complete application: `/api` routes, JSON 404s and the middleware stack
pub fn app(state: AppState) -> Result<Router> {
    let server = &state.config.server;
    let timeout = Duration::from_secs(server.request_timeout_seconds);
    let body_limit = server.max_body_bytes;
    let cors = cors_layer(&state.config.cors)?;

    Ok(Router::new()
        .nest("/api", api::router())
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)),
        ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("No address found for {host}:{port}"))
}

/// Bind the configured address and serve until a shutdown signal arrives
pub async fn serve(state: AppState) -> Result<()> {
    let server = state.config.server.clone();
    let addr = resolve(&server.host, server.port).await?;
    let app = app(state)?;

    #[cfg(feature = "tls")]
    {
        if let (Some(cert), Some(key)) = (&server.tls_cert_path, &server.tls_key_path) {
            return serve_tls(app, addr, cert, key).await;
        }
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server running at http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

#[cfg(feature = "tls")]
async fn serve_tls(app: Router, addr: SocketAddr, cert: &str, key: &str) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {cert} and key {key}"))?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    info!("Web server running at https://{addr}");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("HTTPS server failed")
}

//! Liveness endpoint for hosting platforms.
//!
//! `GET /` and `GET /health` answer 200 while the gateway is connected and 503
//! otherwise. Everything else is a 404.

use std::{
    future::Future,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::base::types::{Res, Void};

pub const HEALTHY_BODY: &str = "healthy";
pub const NOT_READY_BODY: &str = "not ready";
pub const NOT_FOUND_BODY: &str = "not found";

/// Gateway connection flag.
///
/// Written by the gateway event handler (`ready`, `resume`, and shard stage
/// updates set it; shutdown clears it) and read by the liveness endpoint.
#[derive(Clone, Default, Debug)]
pub struct Liveness {
    connected: Arc<AtomicBool>,
}

impl Liveness {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Build the liveness router.
pub fn router(liveness: Liveness) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(liveness)
}

async fn health(State(liveness): State<Liveness>) -> (StatusCode, &'static str) {
    if liveness.is_connected() {
        (StatusCode::OK, HEALTHY_BODY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, NOT_READY_BODY)
    }
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// A bound, not yet serving, liveness listener.
pub struct HealthServer {
    listener: TcpListener,
    liveness: Liveness,
}

impl HealthServer {
    /// Bind `0.0.0.0:port`.
    #[instrument(name = "HealthServer::bind", skip(liveness))]
    pub async fn bind(port: u16, liveness: Liveness) -> Res<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| anyhow::anyhow!("Failed to bind liveness port {port}: {e}"))?;

        info!("Liveness endpoint listening on {}.", listener.local_addr()?);

        Ok(Self { listener, liveness })
    }

    pub fn local_addr(&self) -> Res<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Void
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, router(self.liveness)).with_graceful_shutdown(shutdown).await?;

        info!("Liveness endpoint stopped.");

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use tower::ServiceExt;

    use super::*;

    async fn get(liveness: &Liveness, path: &str) -> (StatusCode, String) {
        let response = router(liveness.clone()).oneshot(Request::builder().uri(path).body(Body::empty()).unwrap()).await.unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), 1024).await.unwrap();

        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_not_ready_until_connected() {
        let liveness = Liveness::default();

        assert_eq!(get(&liveness, "/health").await, (StatusCode::SERVICE_UNAVAILABLE, NOT_READY_BODY.to_string()));
        assert_eq!(get(&liveness, "/").await, (StatusCode::SERVICE_UNAVAILABLE, NOT_READY_BODY.to_string()));
    }

    #[tokio::test]
    async fn test_healthy_when_connected() {
        let liveness = Liveness::default();
        liveness.set_connected(true);

        assert_eq!(get(&liveness, "/health").await, (StatusCode::OK, HEALTHY_BODY.to_string()));
        assert_eq!(get(&liveness, "/").await, (StatusCode::OK, HEALTHY_BODY.to_string()));

        liveness.set_connected(false);
        assert_eq!(get(&liveness, "/health").await.0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let liveness = Liveness::default();
        liveness.set_connected(true);

        assert_eq!(get(&liveness, "/metrics").await, (StatusCode::NOT_FOUND, NOT_FOUND_BODY.to_string()));
    }

    #[tokio::test]
    async fn test_bind_and_shutdown() {
        let server = HealthServer::bind(0, Liveness::default()).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);

        server.serve(async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_conflict_fails() {
        let first = HealthServer::bind(0, Liveness::default()).await.unwrap();
        let port = first.local_addr().unwrap().port();

        assert!(HealthServer::bind(port, Liveness::default()).await.is_err());
    }
}

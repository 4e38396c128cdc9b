use std::net::SocketAddr;

use axum::routing::{get, MethodRouter};
use axum::Json;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::error::GatewayError;

/// `GET /health` answering `{status:"healthy", service}`
pub fn health(service: &'static str) -> MethodRouter {
    get(move || async move { Json(json!({ "status": "healthy", "service": service })) })
}

/// Layers every service carries: request tracing and panic-to-500 conversion
pub fn with_common_layers(app: axum::Router) -> axum::Router {
    app.layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// A server running on a background task
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the server actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for clients on this host
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections and wait for in-flight requests to finish
    pub async fn shutdown(mut self) -> Result<(), GatewayError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // receiver gone means the server already stopped
            let _ = tx.send(());
        }

        match self.handle.take() {
            Some(handle) => handle.await.map_err(|e| {
                GatewayError::InternalError(format!("Error while shutting down server: {}", e))
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Bind `addr` (port 0 picks a free port) and serve `app` on a background task
pub async fn spawn_server(app: axum::Router, addr: &str) -> Result<ServerHandle, GatewayError> {
    let listener = std::net::TcpListener::bind(addr)?;
    let local_addr = listener.local_addr()?;

    let server = axum::Server::from_tcp(listener)
        .map_err(|e| GatewayError::InternalError(format!("Failed to start server on {}: {}", addr, e)))?
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let graceful = server.with_graceful_shutdown(async {
        shutdown_rx.await.ok();
        tracing::info!("Shutdown signal received, starting graceful shutdown");
    });

    let handle = tokio::spawn(async move {
        if let Err(e) = graceful.await {
            tracing::error!(error = %e, "Server error");
        }
        tracing::info!(addr = %local_addr, "Server has been shut down");
    });

    tracing::info!(addr = %local_addr, "Server listening");

    Ok(ServerHandle {
        addr: local_addr,
        shutdown_tx: Some(shutdown_tx),
        handle: Some(handle),
    })
}

/// Serve `app` until Ctrl+C, then shut down gracefully
pub async fn serve_until_ctrl_c(app: axum::Router, addr: &str) -> Result<(), GatewayError> {
    let server = spawn_server(app, addr).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl+C received, stopping");

    server.shutdown().await
}

//! Axum-based RPC server.

use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::routing::{get, post};
use axum::Router;
use starreg_node::tracing_spans::rpc_span;
use starreg_node::StarRegistry;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::RpcError;
use crate::handlers::{self, AppState};

pub struct RpcServer {
    registry: Arc<StarRegistry>,
    cors: bool,
}

impl RpcServer {
    pub fn new(registry: Arc<StarRegistry>, cors: bool) -> Self {
        Self { registry, cors }
    }

    /// Build the router with every route and layer attached.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
        };
        let router = Router::new()
            .route("/requestValidation", post(handlers::request_validation))
            .route(
                "/message-signature/validate",
                post(handlers::validate_signature),
            )
            .route("/block", post(handlers::register_star))
            .route("/block/:height", get(handlers::block_by_height))
            .route("/stars/hash/:hash", get(handlers::block_by_hash))
            .route("/stars/address/:address", get(handlers::blocks_by_address))
            .route("/chain/height", get(handlers::chain_height))
            .route("/chain/validate", get(handlers::validate_chain))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
                rpc_span(req.method().as_str(), req.uri().path())
            }));
        if self.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Serve on `listener` until `shutdown` completes, then drain
    /// in-flight requests.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, cors = self.cors, "rpc server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("rpc server stopped");
        Ok(())
    }
}

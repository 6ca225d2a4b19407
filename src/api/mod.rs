mod callback;
mod healthcheck;
mod sse;

use std::task::{Context as TaskContext, Poll};

use axum::Router;
use axum::body::Body;
use axum::routing::{get, post};
use http::Request;
use tower::{Layer, Service};

use crate::context::AppState;

/// Layer that logs every inbound request at `info`, mirroring
/// `turn-server::api::LogLayer`.
#[derive(Default, Clone)]
struct LogLayer;

impl<S> Layer<S> for LogLayer {
    type Service = LogService<S>;

    fn layer(&self, service: S) -> Self::Service {
        LogService { service }
    }
}

#[derive(Clone)]
struct LogService<S> {
    service: S,
}

impl<S> Service<Request<Body>> for LogService<S>
where
    S: Service<Request<Body>>,
{
    type Error = S::Error;
    type Future = S::Future;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        log::info!("{} {}", req.method(), req.uri());
        self.service.call(req)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/nsi/callback/", post(callback::handle))
        .route("/api/reservations/{id}/log/sse", get(sse::handle))
        .route("/api/healthcheck/", get(healthcheck::handle))
        .layer(LogLayer)
        .with_state(state)
}

/// Bind and serve the router, axum 0.8-style: an explicit
/// `tokio::net::TcpListener` handed to `axum::serve`, rather than the
/// `axum::Server::bind` entry point of older axum releases.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("http api listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

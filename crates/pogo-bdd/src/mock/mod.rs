//! Deterministic in-memory stand-in for the OCR HTTP service.
//!
//! Serves the same routes and result shapes as the real server so the
//! verification layer runs unchanged against either.

mod handlers;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use log::{info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ServerError;

pub use handlers::UPLOAD_FIELDS;

#[derive(Clone)]
pub(crate) struct MockState {
    max_upload_bytes: usize,
    requests: Arc<AtomicUsize>,
}

pub fn router(max_upload_bytes: usize) -> (Router, Arc<AtomicUsize>) {
    let requests = Arc::new(AtomicUsize::new(0));
    let state = MockState {
        max_upload_bytes,
        requests: Arc::clone(&requests),
    };

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/models", get(handlers::models))
        .route("/ocr/image", post(handlers::ocr_image))
        .fallback(handlers::not_found)
        // Size limits are the handler's decision, not the extractor's.
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::track_and_allow_origin,
        ))
        .with_state(state);

    (app, requests)
}

/// A running mock service. Dropping it requests shutdown.
#[derive(Debug)]
pub struct MockService {
    addr: SocketAddr,
    base_url: String,
    requests: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MockService {
    /// Binds an ephemeral port on 127.0.0.1 and starts serving.
    pub async fn start(max_upload_bytes: usize) -> Result<Self, ServerError> {
        let (app, requests) = router(max_upload_bytes);

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .map_err(|e| ServerError::Mock(format!("failed to bind: {}", e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Mock(format!("failed to read bound address: {}", e)))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                warn!("Mock service stopped with error: {}", e);
            }
        });

        info!("Mock service listening on {}", addr);
        Ok(Self {
            addr,
            base_url: format!("http://{}", addr),
            requests,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signals shutdown and waits for in-flight requests to finish.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Mock service task failed: {}", e);
            }
        }
        info!("Mock service on {} stopped", self.addr);
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

//! HTTP surface: upload a workbook, fetch its outcomes, download the export.
//!
//! | Route | |
//! |-------|-|
//! | `POST /upload[?session=<id>]` | multipart field `file` (`.xlsx`), returns the session id and outcomes |
//! | `GET /export?session=<id>` | processed workbook `<stem>_processada.xlsx` |
//! | `GET /status_data?session=<id>` | outcomes as JSON (`[]` for unknown sessions) |
//!
//! Processing runs on the blocking pool; the service calls themselves are
//! blocking HTTP.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{UploadResponse, validate_upload_name};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;

use crate::core::Settings;
use crate::session::SessionStore;
use crate::webservice::Transport;

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<SessionStore>,
    pub transport: Arc<dyn Transport + Send + Sync>,
}

impl AppState {
    pub fn new(settings: Settings, transport: Arc<dyn Transport + Send + Sync>) -> Self {
        Self {
            settings: Arc::new(settings),
            sessions: Arc::new(SessionStore::new()),
            transport,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/export", get(handlers::export))
        .route("/status_data", get(handlers::status_data))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.settings.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, endpoint = %state.settings.endpoint, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for shutdown signal");
            }
        })
        .await?;
    Ok(())
}

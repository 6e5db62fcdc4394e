//! Adaptive Trail Backend
//!
//! - Axum HTTP + WebSocket API
//! - Slot-based mission generation over a subject/topic catalog
//! - Optional remote question bank and content service (via environment)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT          : u16 (default 3000)
//!   CATALOG_CONFIG_PATH : path to TOML catalog (subjects, topics, engine settings)
//!   QUESTION_BANK_URL   : enables the remote question bank if present
//!   CONTENT_SERVICE_URL : enables lesson content status lookups if present
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod errors;
mod domain;
mod config;
mod seeds;
mod slots;
mod generator;
mod missions;
mod massification;
mod rewards;
mod progress;
mod store;
mod questions;
mod content;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (catalog, row store, collaborator clients).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "trail_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}

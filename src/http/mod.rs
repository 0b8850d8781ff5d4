// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! HTTP surface exposed on top of the RCON core: JSON status/info routes,
//! a Prometheus-text `/metrics` endpoint, and a small HTML exporter
//! index.

pub mod handlers;
pub mod templates;

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};

use crate::{cfg::config::SharedConfig, mapcache::MapCache};

/// Shared, cheaply-cloneable state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SharedConfig>,
    pub maps: Arc<MapCache>,
    pub query_retries: u32,
    pub query_timeout: Duration,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/servers", get(handlers::list_servers))
        .route("/servers/:name", get(handlers::server_all))
        .route("/servers/:name/status", get(handlers::server_status))
        .route("/servers/:name/info", get(handlers::server_info))
        .route("/maps", get(handlers::list_maps))
        .route("/records", get(handlers::records))
        .route("/metrics", get(handlers::metrics))
        .route("/exporters", get(handlers::exporters))
        .with_state(state)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Route handlers. Every JSON response carries an `ETag` header computed
//! as the hex-encoded MD5 digest of the serialized body, matching the
//! original implementation's cache-validation contract.

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    Json,
};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use super::{templates, AppState};
use crate::rcon::{
    orchestrator::{query_info_once, query_server_metrics, query_status_once, query_with_retries},
    ServerInfo, ServerStatus,
};

/// Wraps `body` in a `200 OK` JSON response carrying an `ETag` header set
/// to the hex MD5 digest of the serialized payload.
fn json_with_etag<T: Serialize>(body: &T) -> Response {
    let payload = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    };
    let digest = hex::encode(Md5::digest(&payload));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(&digest) {
        headers.insert(header::ETAG, value);
    }
    (StatusCode::OK, headers, payload).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    #[derive(Serialize)]
    struct ErrorBody<'a> {
        error: &'a str,
    }
    (status, Json(ErrorBody { error: message })).into_response()
}

fn not_found(name: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, &format!("unknown server {name:?}"))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn list_servers(State(state): State<AppState>) -> Response {
    let config = state.config.load();
    let mut names: Vec<&String> = config.servers.keys().collect();
    names.sort();
    json_with_etag(&names)
}

pub async fn server_status(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let config = state.config.load();
    let Some(server) = config.servers.get(&name) else {
        return not_found(&name);
    };
    let endpoint = server.to_endpoint();

    let result: crate::rcon::Result<ServerStatus> =
        query_with_retries(state.query_retries, state.query_timeout, |deadline| {
            query_status_once(&endpoint, deadline)
        })
        .await;

    match result {
        Ok(status) => json_with_etag(&status),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

pub async fn server_info(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let config = state.config.load();
    let Some(server) = config.servers.get(&name) else {
        return not_found(&name);
    };
    let endpoint = server.to_endpoint();

    let result: crate::rcon::Result<ServerInfo> =
        query_with_retries(state.query_retries, state.query_timeout, |deadline| {
            query_info_once(&endpoint, deadline)
        })
        .await;

    match result {
        Ok(info) => json_with_etag(&info),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

/// Mirrors the original's anonymous `struct { *ServerStatus; Info
/// *ServerInfo }`: the status fields flatten into the top-level object,
/// `info` nests beside them.
#[derive(Serialize)]
struct ServerAll<'a> {
    #[serde(flatten)]
    status: &'a ServerStatus,
    info: &'a ServerInfo,
}

pub async fn server_all(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let config = state.config.load();
    let Some(server) = config.servers.get(&name) else {
        return not_found(&name);
    };
    let endpoint = server.to_endpoint();

    let status_fut = query_with_retries(state.query_retries, state.query_timeout, |deadline| {
        query_status_once(&endpoint, deadline)
    });
    let info_fut = query_with_retries(state.query_retries, state.query_timeout, |deadline| {
        query_info_once(&endpoint, deadline)
    });
    let (status_res, info_res): (crate::rcon::Result<ServerStatus>, crate::rcon::Result<ServerInfo>) =
        tokio::join!(status_fut, info_fut);

    match (status_res, info_res) {
        (Ok(status), Ok(info)) => json_with_etag(&ServerAll { status: &status, info: &info }),
        (Err(err), _) | (_, Err(err)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        },
    }
}

pub async fn list_maps(State(state): State<AppState>) -> Response {
    let config = state.config.load();
    let maps = state.maps.list_maps(&config.gamedir);
    json_with_etag(&maps)
}

pub async fn records(State(state): State<AppState>) -> Response {
    let config = state.config.load();
    let known_maps: HashSet<String> = state.maps.list_maps(&config.gamedir).into_iter().collect();

    match crate::recorddb::read_captime_records(&config.gamedb) {
        Ok(records) => {
            let filtered = crate::recorddb::filter_known_maps(records, &known_maps);
            json_with_etag(&filtered)
        },
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    target: Option<String>,
}

pub async fn metrics(State(state): State<AppState>, Query(query): Query<MetricsQuery>) -> Response {
    let Some(name) = query.target else {
        return error_response(StatusCode::BAD_REQUEST, "missing required query parameter: target");
    };

    let config = state.config.load();
    let Some(server) = config.servers.get(&name) else {
        return not_found(&name);
    };
    let endpoint = server.to_endpoint();

    let (metrics, outcome) =
        query_server_metrics(&endpoint, state.query_retries, state.query_timeout).await;
    if let Err(err) = outcome {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
    }

    let hostname = metrics
        .status
        .as_ref()
        .map(|s| s.host.as_str())
        .unwrap_or(&name)
        .to_string();
    let body = templates::render_metrics(&name, &hostname, &metrics);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    (StatusCode::OK, headers, body).into_response()
}

pub async fn exporters(State(state): State<AppState>) -> Response {
    let config = state.config.load();
    let mut names: Vec<String> = config.servers.keys().cloned().collect();
    names.sort();

    let body = templates::render_exporters_index(&names);
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    (StatusCode::OK, headers, body).into_response()
}

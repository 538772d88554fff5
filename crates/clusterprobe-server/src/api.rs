//! REST API over the probe registry.

use crate::persist::RegistrationStore;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use clusterprobe::{Location, Partition, ProbeRegistry};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ProbeRegistry>,
    pub store: Arc<RegistrationStore>,
    pub metrics: Arc<Registry>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healths/:namespace", get(namespace_healths))
        .route(
            "/healths/:namespace/:partition/:datacenter/:service",
            get(one_health),
        )
        .route("/cluster/from-uris", post(register_uris))
        .route(
            "/cluster/:namespace/:partition/:datacenter/:service",
            delete(delete_probe),
        )
        .route("/metrics", get(metrics_text))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct NamespaceQuery {
    #[serde(rename = "partition-contains")]
    partition_contains: Option<String>,

    #[serde(rename = "error-rate")]
    error_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    uris: Option<Vec<String>>,
}

async fn namespace_healths(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> Response {
    info!(namespace, "GET /healths");

    if !state.registry.exists_namespace(&namespace) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let healths = state.registry.list_namespace(
        &namespace,
        query.partition_contains.as_deref(),
        query.error_rate,
    );
    Json(healths).into_response()
}

async fn one_health(
    State(state): State<AppState>,
    Path(path): Path<(String, String, String, String)>,
) -> Response {
    let location = location_from_path(path);
    info!(namespace = location.partition().namespace(), "GET /healths point lookup");

    match state.registry.lookup(&location) {
        Some(health) => Json(health).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn register_uris(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    let Some(uris) = request.uris else {
        return bad_request("missing uris");
    };
    info!(count = uris.len(), "POST /cluster/from-uris");

    for uri in &uris {
        if let Err(err) = state.registry.register(uri) {
            warn!(uri = %uri, error = %err, "rejected registration");
            return bad_request(&err.to_string());
        }
        state.store.insert(uri);
    }

    StatusCode::CREATED.into_response()
}

async fn delete_probe(
    State(state): State<AppState>,
    Path(path): Path<(String, String, String, String)>,
) -> Response {
    let location = location_from_path(path);
    info!(namespace = location.partition().namespace(), "DELETE /cluster");

    let Some(health) = state.registry.lookup(&location) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    state.registry.unregister(&location);
    state.store.remove(&health.cluster);

    StatusCode::NO_CONTENT.into_response()
}

async fn metrics_text(State(state): State<AppState>) -> Response {
    let mut buffer = String::new();
    if let Err(err) = encode(&mut buffer, &state.metrics) {
        warn!(error = %err, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}

/// Clients may address the datacenter with its regional suffix
/// (`eastus-prod`); identity stops at the first `-`.
fn location_from_path(
    (namespace, partition, datacenter, service): (String, String, String, String),
) -> Location {
    let datacenter = datacenter.split('-').next().unwrap_or("").to_string();
    Location::new(Partition::new(namespace, partition), datacenter, service)
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

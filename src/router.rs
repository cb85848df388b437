use axum::{
    Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::catalog::MemoryCatalog;
use crate::error::{RemoteError, status};
use crate::query::{QueryPage, QueryRequest};
use crate::types::{AdminRequest, HealthResponse, StatusResponse};

#[derive(Clone)]
struct RouterState {
    catalog: MemoryCatalog,
    api_key: Option<String>,
}

/// Status code and message to report for a failed request
fn reply_status(err: &RemoteError) -> (i32, String) {
    match err {
        RemoteError::Status { code, message } => (*code, message.clone()),
        other => (status::CAT_INVALID_ARGUMENT, other.to_string()),
    }
}

async fn require_api_key(State(state): State<RouterState>, request: Request, next: Next) -> Response {
    let Some(expected) = &state.api_key else {
        return next.run(request).await;
    };
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if presented == Some(expected.as_str()) {
        next.run(request).await
    } else {
        warn!("Rejected request to {} with missing or wrong API key", request.uri());
        (
            StatusCode::UNAUTHORIZED,
            Json(StatusResponse::failed(
                status::CAT_INSUFFICIENT_PRIVILEGE_LEVEL,
                "invalid API key",
            )),
        )
            .into_response()
    }
}

async fn health_handler(State(state): State<RouterState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        zone: state.catalog.home_zone().to_string(),
    })
}

async fn admin_handler(
    State(state): State<RouterState>,
    Json(request): Json<AdminRequest>,
) -> Json<StatusResponse> {
    match state.catalog.handle_admin(&request) {
        Ok(()) => Json(StatusResponse::ok(format!(
            "{} {} succeeded",
            request.action, request.target
        ))),
        Err(e) => {
            let (code, message) = reply_status(&e);
            Json(StatusResponse::failed(code, message))
        }
    }
}

async fn query_handler(
    State(state): State<RouterState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryPage>, (StatusCode, Json<StatusResponse>)> {
    state.catalog.handle_query(&request).map(Json).map_err(|e| {
        let (code, message) = reply_status(&e);
        (StatusCode::BAD_REQUEST, Json(StatusResponse::failed(code, message)))
    })
}

async fn disconnect_handler(State(state): State<RouterState>) -> Json<StatusResponse> {
    state.catalog.note_disconnect();
    Json(StatusResponse::ok("disconnected"))
}

/// Create the HTTP router serving `catalog`. When `api_key` is set every
/// route requires it as a bearer token.
pub fn create_http_router(catalog: MemoryCatalog, api_key: Option<String>) -> Router {
    let state = RouterState { catalog, api_key };
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/admin", post(admin_handler))
        .route("/api/query", post(query_handler))
        .route("/api/disconnect", post(disconnect_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(
    address: &str,
    catalog: MemoryCatalog,
    api_key: Option<String>,
) -> Result<(), eyre::Error> {
    let router = create_http_router(catalog, api_key);

    let listener = TcpListener::bind(address).await?;
    info!("HTTP server listening on {}", address);

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|e| eyre::eyre!(e))?;

    Ok(())
}

//! Request handlers. Entity CRUD is generic over the path's entity
//! token; mutations require a bearer session token, reads and the
//! session endpoints do not.

use super::envelope::{ApiError, Result};
use crate::auth::Identity;
use crate::core::error::EngineError;
use crate::engine::{
    BackOffice, DeleteOutcome, FormPayload, ListFilter, LoginOutcome, LoginRequest,
};
use crate::features::BureauRequest;
use axum::Json;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

pub type AppState = Arc<BackOffice>;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn require_identity(state: &BackOffice, headers: &HeaderMap) -> Result<Identity> {
    let token = bearer_token(headers).ok_or_else(|| {
        ApiError(EngineError::Unauthorized(
            "Missing or invalid session token".into(),
        ))
    })?;
    Ok(state.authenticate_token(token).await?)
}

/// Throttle key address: first `X-Forwarded-For` hop when present,
/// otherwise the socket peer.
fn client_addr(headers: &HeaderMap, connect: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }
    connect
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn flag(params: &HashMap<String, String>, key: &str) -> bool {
    params
        .get(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

// ============================================================================
// Entity CRUD
// ============================================================================

pub async fn list_entity(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>> {
    let filter = ListFilter {
        active_only: flag(&params, "active_only"),
        hide_deleted: flag(&params, "hide_deleted"),
    };
    let page = state.list(&entity, filter).await?;
    Ok(Json(json!({
        "success": true,
        "entity": page.entity,
        "pretty_entity": page.pretty,
        "records": page.records,
        "column_fields": page.column_fields,
    })))
}

fn form_json(payload: FormPayload) -> Value {
    let mut body = json!({
        "success": true,
        "html": payload.html,
        "entity": payload.entity,
        "mode": payload.mode,
    });
    if let Some(warning) = payload.warning {
        body["warning"] = Value::String(warning);
    }
    body
}

pub async fn create_form(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> Result<Json<Value>> {
    let payload = state.form(&entity, None).await?;
    Ok(Json(form_json(payload)))
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, u64)>,
) -> Result<Json<Value>> {
    let payload = state.form(&entity, Some(id)).await?;
    Ok(Json(form_json(payload)))
}

fn body_object(payload: Value) -> Result<serde_json::Map<String, Value>> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError(EngineError::invalid(
            "body",
            "Request body must be a JSON object.",
        ))),
    }
}

pub async fn create_record(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<Value>> {
    require_identity(&state, &headers).await?;
    let object = body_object(payload)?;
    let created = state.create(&entity, &object).await?;
    let mut body = json!({ "success": true, "id": created.id });
    if let Some(code) = created.code {
        body["code"] = Value::String(code);
    }
    Ok(Json(body))
}

pub async fn update_record(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, u64)>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<Value>> {
    require_identity(&state, &headers).await?;
    let object = body_object(payload)?;
    state.update(&entity, id, &object).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, u64)>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let identity = require_identity(&state, &headers).await?;
    let body = match state.delete(&entity, id, &identity).await? {
        DeleteOutcome::SoftDeleted | DeleteOutcome::Flagged => {
            json!({ "success": true, "soft_deleted": true })
        }
        DeleteOutcome::HardDeleted => json!({ "success": true, "hard_deleted": true }),
        // degraded outcome, served as 200 so legacy clients surface the note
        DeleteOutcome::MigrationsNeeded { note } => {
            json!({ "success": false, "error": note })
        }
    };
    Ok(Json(body))
}

// ============================================================================
// Sessions
// ============================================================================

fn login_response(outcome: LoginOutcome) -> Response {
    match outcome {
        LoginOutcome::Success(success) => Json(json!({
            "success": true,
            "token": success.token,
            "username": success.username,
            "redirect": success.redirect,
        }))
        .into_response(),
        LoginOutcome::OtpRequired => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "otp_required": true,
                "error": "A one-time code is required.",
            })),
        )
            .into_response(),
    }
}

pub async fn login(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response> {
    let client = client_addr(&headers, connect.as_ref());
    let outcome = state.login(&client, &request).await?;
    Ok(login_response(outcome))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    if let Some(token) = bearer_token(&headers) {
        state.logout(token).await;
    }
    Json(json!({ "success": true }))
}

pub async fn switch_account(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response> {
    let client = client_addr(&headers, connect.as_ref());
    let current = bearer_token(&headers);
    let outcome = state.switch_account(&client, current, &request).await?;
    Ok(login_response(outcome))
}

// ============================================================================
// Feature endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NextCodeRequest {
    pub entity: String,
}

pub async fn next_code(
    State(state): State<AppState>,
    Json(request): Json<NextCodeRequest>,
) -> Result<Json<Value>> {
    let code = state.next_code(&request.entity).await?;
    Ok(Json(json!({ "success": true, "code": code })))
}

pub async fn search_client_aadhaar(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>> {
    let query = params.get("q").map(String::as_str).unwrap_or("");
    let results = state.search_clients_by_aadhaar(query).await?;
    Ok(Json(json!({ "success": true, "results": results })))
}

pub async fn permission_groups(State(state): State<AppState>) -> Json<Value> {
    let groups = state.permission_groups().await;
    Json(json!({ "success": true, "groups": groups }))
}

pub async fn bureau_pull(
    State(state): State<AppState>,
    Json(request): Json<BureauRequest>,
) -> Json<Value> {
    let report = state.bureau_pull(&request).await;
    Json(json!({
        "success": true,
        "enabled": report.enabled,
        "ok": report.ok,
        "score": report.score,
        "provider": report.provider,
        "message": report.message,
    }))
}

pub async fn npa_summary(State(state): State<AppState>) -> Result<Json<Value>> {
    let summary = state.npa_summary().await?;
    Ok(Json(json!({
        "success": true,
        "enabled": summary.enabled,
        "buckets": summary.buckets,
        "total": summary.total,
    })))
}

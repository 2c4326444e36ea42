// Admin back-office endpoints.
//
// /admin/data  — generic row CRUD over any hosted table
// /admin/users — user record CRUD
//
// Callers present a platform bearer token whose decoded email must be
// in the fixed allow-list: missing or invalid token → 401, valid token
// outside the list → 403.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::context::FunctionsContext;
use crate::store::StoreError;
use crate::{require_admin, EndpointError};

const USERS_TABLE: &str = "users";

#[derive(Debug, Deserialize)]
pub struct TableQuery {
    pub table: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InsertRowRequest {
    pub table: String,
    pub row: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRowRequest {
    pub table: String,
    pub id: String,
    pub patch: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub id: String,
    pub patch: serde_json::Value,
}

// ── /admin/data ─────────────────────────────────────────────────────

pub async fn handle_list_data(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
    Query(query): Query<TableQuery>,
) -> Result<Json<Vec<serde_json::Value>>, EndpointError> {
    require_admin(&ctx, &headers)?;
    let rows = ctx.store.list_rows(&query.table).await?;
    Ok(Json(rows))
}

pub async fn handle_insert_data(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
    Json(body): Json<InsertRowRequest>,
) -> Result<Json<serde_json::Value>, EndpointError> {
    require_admin(&ctx, &headers)?;
    let row = ctx.store.insert_row(&body.table, body.row).await?;
    Ok(Json(row))
}

pub async fn handle_update_data(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
    Json(body): Json<UpdateRowRequest>,
) -> Result<Json<serde_json::Value>, EndpointError> {
    require_admin(&ctx, &headers)?;
    let row = ctx.store.update_row(&body.table, &body.id, body.patch).await?;
    Ok(Json(row))
}

pub async fn handle_delete_data(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
    Query(query): Query<TableQuery>,
) -> Result<Json<serde_json::Value>, EndpointError> {
    require_admin(&ctx, &headers)?;
    let id = query.id.ok_or_else(|| {
        EndpointError::bad_request(
            bankcheck_core::error::ErrorCode::CouldNotParseBody,
            "Missing row id",
        )
    })?;
    ctx.store.delete_row(&query.table, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ── /admin/users ────────────────────────────────────────────────────

pub async fn handle_list_users(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
) -> Result<Json<Vec<serde_json::Value>>, EndpointError> {
    require_admin(&ctx, &headers)?;
    let users = ctx.store.list_rows(USERS_TABLE).await?;
    Ok(Json(users))
}

pub async fn handle_create_user(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
    Json(row): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, EndpointError> {
    require_admin(&ctx, &headers)?;
    let user = ctx.store.insert_row(USERS_TABLE, row).await?;
    Ok(Json(user))
}

pub async fn handle_update_user(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<serde_json::Value>, EndpointError> {
    require_admin(&ctx, &headers)?;
    let user = ctx
        .store
        .update_row(USERS_TABLE, &body.id, body.patch)
        .await?;
    Ok(Json(user))
}

pub async fn handle_delete_user(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<Json<serde_json::Value>, EndpointError> {
    require_admin(&ctx, &headers)?;
    match ctx.store.delete_row(USERS_TABLE, &query.id).await {
        Ok(()) => Ok(Json(serde_json::json!({ "deleted": true }))),
        Err(StoreError::NotFound) => Err(EndpointError::not_found("User not found")),
        Err(err) => Err(err.into()),
    }
}

//! Group resource handlers, including PATCH (§6, §4.8).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::extractors::ScimJson;
use crate::http::envelope::{list_response_json, ListQuery};
use crate::http::AppState;
use crate::model::PatchOp;
use crate::patch::apply_patch;
use crate::store::ResourceKind;

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let params = query.into_search_params()?;
    let page = state.store.search(ResourceKind::Group, &params).await?;
    Ok(Json(list_response_json(page, &params)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let resource = state
        .store
        .get_by_id(ResourceKind::Group, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group '{}' not found", id)))?;
    Ok(Json(resource))
}

pub async fn create(
    State(state): State<AppState>,
    ScimJson(body): ScimJson<Value>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let created = state.store.create(ResourceKind::Group, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ScimJson(body): ScimJson<Value>,
) -> AppResult<Json<Value>> {
    let updated = state.store.update(ResourceKind::Group, &id, body).await?;
    Ok(Json(updated))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ScimJson(body): ScimJson<PatchOp>,
) -> AppResult<Json<Value>> {
    let updated = apply_patch(state.store.as_ref(), &id, &body).await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.store.delete(ResourceKind::Group, &id).await?;
    Ok(StatusCode::OK)
}

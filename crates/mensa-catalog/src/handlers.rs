//! Catalog handlers.
//!
//! Authorization is done by the guard + policy layers before any of these
//! run; handlers only consume the established principal where they need the
//! caller's identity (favorites) or want it in the log (admin writes).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{info, instrument};

use mensa_auth::{CurrentUser, RequireAdmin};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Cafeteria, CreateCafeteriaRequest, CreateStallRequest, Favorite, Stall,
    UpdateCafeteriaRequest,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn list_cafeterias(State(state): State<AppState>) -> ApiResult<Json<Vec<Cafeteria>>> {
    Ok(Json(state.store.list_cafeterias().await?))
}

pub async fn get_cafeteria(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Cafeteria>> {
    state
        .store
        .get_cafeteria(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[instrument(skip(state, admin, request), fields(name = %request.name, user = %admin.0.username()))]
pub async fn create_cafeteria(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Json(request): Json<CreateCafeteriaRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    let cafeteria = state.store.create_cafeteria(request).await?;
    info!(id = cafeteria.id, "cafeteria created");
    Ok((StatusCode::CREATED, Json(cafeteria)))
}

#[instrument(skip(state, _admin, request))]
pub async fn update_cafeteria(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCafeteriaRequest>,
) -> ApiResult<Json<Cafeteria>> {
    state
        .store
        .update_cafeteria(id, request)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[instrument(skip(state, _admin))]
pub async fn delete_cafeteria(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.store.delete_cafeteria(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

pub async fn list_stalls(
    State(state): State<AppState>,
    Path(cafeteria_id): Path<i64>,
) -> ApiResult<Json<Vec<Stall>>> {
    if state.store.get_cafeteria(cafeteria_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(state.store.list_stalls(cafeteria_id).await?))
}

#[instrument(skip(state, _admin, request), fields(name = %request.name))]
pub async fn create_stall(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(cafeteria_id): Path<i64>,
    Json(request): Json<CreateStallRequest>,
) -> ApiResult<impl IntoResponse> {
    if state.store.get_cafeteria(cafeteria_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    let stall = state.store.create_stall(cafeteria_id, request).await?;
    Ok((StatusCode::CREATED, Json(stall)))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Favorite>>> {
    Ok(Json(state.store.list_favorites(user.user_id()).await?))
}

#[instrument(skip(state, user))]
pub async fn add_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(cafeteria_id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.store.get_cafeteria(cafeteria_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    state.store.add_favorite(user.user_id(), cafeteria_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, user))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(cafeteria_id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state
        .store
        .remove_favorite(user.user_id(), cafeteria_id)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

//! User account endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::{NewUser, User};
use crate::error::{BookstoreError, Result};
use crate::AppState;

/// GET /api/v1/users
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.store.list_users().await?))
}

/// GET /api/v1/users/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<User>> {
    let user = state
        .store
        .user_by_id(id)
        .await?
        .ok_or(BookstoreError::NotFound("user"))?;
    Ok(Json(user))
}

/// GET /api/v1/users/email/:email
pub async fn get_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<User>> {
    let user = state
        .store
        .user_by_email(&email)
        .await?
        .ok_or(BookstoreError::NotFound("user"))?;
    Ok(Json(user))
}

/// POST /api/v1/users. Registers an account; emails are unique.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    req.validate()?;
    let user = state.store.create_user(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/v1/users/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<NewUser>,
) -> Result<Json<User>> {
    req.validate()?;
    let user = state.store.update_user(id, req).await?;
    Ok(Json(user))
}

/// DELETE /api/v1/users/:id. Removes the account and its cart lines,
/// orders and reviews.
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.store.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

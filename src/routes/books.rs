//! Catalog endpoints: browsing, search, recommendations and admin CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::{Book, NewBook};
use crate::error::{BookstoreError, Result};
use crate::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    pub limit: Option<i64>,
}

// -- Handlers --

/// GET /api/v1/books. Full catalog, or a substring search with `?q=`.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Book>>> {
    let books = match params.q.as_deref() {
        Some(q) => state.store.search_books(q).await?,
        None => state.store.list_books().await?,
    };
    Ok(Json(books))
}

/// GET /api/v1/books/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Book>> {
    let book = state
        .store
        .book_by_id(id)
        .await?
        .ok_or(BookstoreError::NotFound("book"))?;
    Ok(Json(book))
}

/// GET /api/v1/recommendations/:id. Top-of-catalog picks; the user id is
/// accepted for a future personalized ranking and currently unused.
pub async fn recommendations(
    State(state): State<AppState>,
    Path(_user_id): Path<Uuid>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<Vec<Book>>> {
    let limit = params.limit.unwrap_or(8).clamp(1, 50);
    let books = state.store.recommended_books(limit).await?;
    Ok(Json(books))
}

/// POST /api/v1/books. Adds a catalog entry.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>)> {
    req.validate()?;
    let book = state.store.create_book(req).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /api/v1/books/:id. Overwrites a catalog entry, price included.
/// Existing order lines keep their snapshot prices.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<NewBook>,
) -> Result<Json<Book>> {
    req.validate()?;
    let book = state.store.update_book(id, req).await?;
    Ok(Json(book))
}

/// DELETE /api/v1/books/:id. Removes a book; cart lines pointing at it are
/// left in place and surface at checkout as an inconsistency.
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.store.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

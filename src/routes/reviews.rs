//! Review endpoints and per-book rating statistics.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::{NewReview, Review, ReviewStats};
use crate::error::{BookstoreError, Result};
use crate::AppState;

// -- Request types --

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    pub user_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub user_id: Uuid,
}

// -- Handlers --

/// POST /api/v1/reviews. One review per user and book, enforced by the
/// store's uniqueness constraint.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    req.validate()?;
    state
        .store
        .user_by_id(req.user_id)
        .await?
        .ok_or(BookstoreError::NotFound("user"))?;
    state
        .store
        .book_by_id(req.book_id)
        .await?
        .ok_or(BookstoreError::NotFound("book"))?;
    let review = state.store.insert_review(req).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// PUT /api/v1/reviews/:id. Overwrites rating and comment; refreshes
/// `updated_at`.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<Json<Review>> {
    req.validate()?;
    let review = state
        .store
        .review_by_id(id)
        .await?
        .ok_or(BookstoreError::NotFound("review"))?;
    if review.user_id != req.user_id {
        return Err(BookstoreError::Forbidden("review"));
    }
    let review = state.store.update_review(id, req.rating, req.comment).await?;
    Ok(Json(review))
}

/// DELETE /api/v1/reviews/:id. The `user_id` query parameter must name the
/// review's owner.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode> {
    let review = state
        .store
        .review_by_id(id)
        .await?
        .ok_or(BookstoreError::NotFound("review"))?;
    if review.user_id != params.user_id {
        return Err(BookstoreError::Forbidden("review"));
    }
    state.store.delete_review(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/reviews/book/:book_id. Oldest first.
pub async fn list_for_book(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.store.reviews_for_book(book_id).await?))
}

/// GET /api/v1/reviews/book/:book_id/stats. Average and count computed
/// from the live rows on every call; an unreviewed book reports 0 / 0.
pub async fn stats(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<ReviewStats>> {
    Ok(Json(state.store.review_stats(book_id).await?))
}

/// GET /api/v1/reviews/user/:user_id
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.store.reviews_for_user(user_id).await?))
}

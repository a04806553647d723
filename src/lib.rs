//! Bookstore Storefront Backend
//!
//! Catalog, per-user carts, checkout and reviews over a relational store.
//!
//! ## Features
//! - Book catalog with search and recommendations
//! - Shopping carts with atomic add-or-increment merging
//! - Checkout converting a whole cart into an order with price snapshots
//! - Reviews with on-demand per-book rating statistics

pub mod domain;
pub mod error;
pub mod routes;
pub mod seed;
pub mod store;

pub use error::{BookstoreError, Result};

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub nats: Option<async_nats::Client>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "bookstore-backend"})) }))
        .route("/api/v1/books", get(routes::books::list).post(routes::books::create))
        .route("/api/v1/books/:id", get(routes::books::get).put(routes::books::update).delete(routes::books::delete))
        .route("/api/v1/recommendations/:id", get(routes::books::recommendations))
        .route("/api/v1/users", get(routes::users::list).post(routes::users::create))
        .route("/api/v1/users/:id", get(routes::users::get).put(routes::users::update).delete(routes::users::delete))
        .route("/api/v1/users/email/:email", get(routes::users::get_by_email))
        .route("/api/v1/cart/:user_id", get(routes::cart::list).post(routes::cart::add).delete(routes::cart::clear))
        .route("/api/v1/cart/:user_id/:line_id", put(routes::cart::set_quantity).delete(routes::cart::remove))
        .route("/api/v1/orders/:id/checkout", post(routes::orders::checkout))
        .route("/api/v1/orders/:id", get(routes::orders::get))
        .route("/api/v1/orders/user/:user_id", get(routes::orders::list_for_user))
        .route("/api/v1/reviews", post(routes::reviews::create))
        .route("/api/v1/reviews/:id", put(routes::reviews::update).delete(routes::reviews::delete))
        .route("/api/v1/reviews/book/:book_id", get(routes::reviews::list_for_book))
        .route("/api/v1/reviews/book/:book_id/stats", get(routes::reviews::stats))
        .route("/api/v1/reviews/user/:user_id", get(routes::reviews::list_for_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

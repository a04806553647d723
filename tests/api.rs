//! Integration tests driving the full router against the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tower::ServiceExt;

use bookstore_backend::domain::models::{Book, NewBook, NewUser, User};
use bookstore_backend::store::{InMemoryStore, Store};
use bookstore_backend::{create_app, AppState};

fn setup() -> (axum::Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let shared: Arc<dyn Store> = store.clone();
    let app = create_app(AppState {
        store: shared,
        nats: None,
    });
    (app, store)
}

/// Sends one request through a clone of the router and decodes the JSON
/// body; empty bodies (204 responses) come back as `Null`.
async fn request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn fixture_user(store: &InMemoryStore, email: &str) -> User {
    store
        .create_user(NewUser {
            name: "Test Reader".into(),
            email: email.into(),
            phone: None,
            address: None,
        })
        .await
        .unwrap()
}

async fn fixture_book(store: &InMemoryStore, title: &str, cents: i64) -> Book {
    store
        .create_book(NewBook {
            title: title.into(),
            author: "Test Author".into(),
            category: "Fiction".into(),
            price: Decimal::new(cents, 2),
            description: None,
            image_url: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, json) = request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "bookstore-backend");
}

#[tokio::test]
async fn test_add_to_cart_merges_lines() {
    let (app, store) = setup();
    let user = fixture_user(&store, "merge@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    let uri = format!("/api/v1/cart/{}", user.id);

    let (status, _) = request(
        &app,
        "POST",
        &uri,
        Some(serde_json::json!({"book_id": book.id, "quantity": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, line) = request(
        &app,
        "POST",
        &uri,
        Some(serde_json::json!({"book_id": book.id, "quantity": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(line["quantity"], 3);

    let (status, cart) = request(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let lines = cart.as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 3);
    assert_eq!(lines[0]["title"], "Gatsby");
    assert_eq!(lines[0]["line_total"], "38.97");
}

#[tokio::test]
async fn test_add_unknown_book() {
    let (app, store) = setup();
    let user = fixture_user(&store, "nobook@example.com").await;
    let (status, json) = request(
        &app,
        "POST",
        &format!("/api/v1/cart/{}", user.id),
        Some(serde_json::json!({"book_id": uuid::Uuid::new_v4(), "quantity": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "book not found");
}

#[tokio::test]
async fn test_add_zero_quantity() {
    let (app, store) = setup();
    let user = fixture_user(&store, "zero@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/cart/{}", user.id),
        Some(serde_json::json!({"book_id": book.id, "quantity": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_quantity_checks_ownership() {
    let (app, store) = setup();
    let owner = fixture_user(&store, "owner@example.com").await;
    let other = fixture_user(&store, "other@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    let line = store.upsert_cart_line(owner.id, book.id, 1).await.unwrap();

    // someone else's line
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/api/v1/cart/{}/{}", other.id, line.id),
        Some(serde_json::json!({"quantity": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // a line that does not exist
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/api/v1/cart/{}/{}", owner.id, uuid::Uuid::new_v4()),
        Some(serde_json::json!({"quantity": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the owner may update
    let (status, updated) = request(
        &app,
        "PUT",
        &format!("/api/v1/cart/{}/{}", owner.id, line.id),
        Some(serde_json::json!({"quantity": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["quantity"], 5);
}

#[tokio::test]
async fn test_remove_line_checks_ownership() {
    let (app, store) = setup();
    let owner = fixture_user(&store, "rm-owner@example.com").await;
    let other = fixture_user(&store, "rm-other@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    let line = store.upsert_cart_line(owner.id, book.id, 1).await.unwrap();

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/v1/cart/{}/{}", other.id, line.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/v1/cart/{}/{}", owner.id, line.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.cart_for_user(owner.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_totals_and_clears_cart() {
    let (app, store) = setup();
    let user = fixture_user(&store, "buyer@example.com").await;
    let gatsby = fixture_book(&store, "Gatsby", 1299).await;
    let flies = fixture_book(&store, "Lord of the Flies", 550).await;
    store.upsert_cart_line(user.id, gatsby.id, 2).await.unwrap();
    store.upsert_cart_line(user.id, flies.id, 1).await.unwrap();

    let (status, receipt) = request(
        &app,
        "POST",
        &format!("/api/v1/orders/{}/checkout", user.id),
        Some(serde_json::json!({"shipping_address": "123 Main St"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["status"], "CONFIRMED");
    assert_eq!(receipt["total_amount"], "31.48");

    let order_id = receipt["order_id"].as_str().unwrap();
    let (status, order) = request(&app, "GET", &format!("/api/v1/orders/{}", order_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "CONFIRMED");
    assert_eq!(order["shipping_address"], "123 Main St");
    assert_eq!(order["total_amount"], "31.48");
    assert_eq!(order["lines"].as_array().unwrap().len(), 2);

    let (_, cart) = request(&app, "GET", &format!("/api/v1/cart/{}", user.id), None).await;
    assert!(cart.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_order_lines_keep_snapshot_prices() {
    let (app, store) = setup();
    let user = fixture_user(&store, "snapshot@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    store.upsert_cart_line(user.id, book.id, 2).await.unwrap();

    let (_, receipt) = request(
        &app,
        "POST",
        &format!("/api/v1/orders/{}/checkout", user.id),
        Some(serde_json::json!({"shipping_address": "123 Main St"})),
    )
    .await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();

    store
        .update_book(
            book.id,
            NewBook {
                title: book.title.clone(),
                author: book.author.clone(),
                category: book.category.clone(),
                price: Decimal::new(9999, 2),
                description: None,
                image_url: None,
            },
        )
        .await
        .unwrap();

    let (_, order) = request(&app, "GET", &format!("/api/v1/orders/{}", order_id), None).await;
    assert_eq!(order["total_amount"], "25.98");
    let lines = order["lines"].as_array().unwrap();
    assert_eq!(lines[0]["unit_price"], "12.99");
    assert_eq!(lines[0]["line_total"], "25.98");
}

#[tokio::test]
async fn test_cart_view_tracks_live_prices() {
    let (app, store) = setup();
    let user = fixture_user(&store, "live@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    store.upsert_cart_line(user.id, book.id, 2).await.unwrap();
    let uri = format!("/api/v1/cart/{}", user.id);

    let (_, cart) = request(&app, "GET", &uri, None).await;
    assert_eq!(cart[0]["line_total"], "25.98");

    store
        .update_book(
            book.id,
            NewBook {
                title: book.title.clone(),
                author: book.author.clone(),
                category: book.category.clone(),
                price: Decimal::new(999, 2),
                description: None,
                image_url: None,
            },
        )
        .await
        .unwrap();

    let (_, cart) = request(&app, "GET", &uri, None).await;
    assert_eq!(cart[0]["price"], "9.99");
    assert_eq!(cart[0]["line_total"], "19.98");
}

#[tokio::test]
async fn test_checkout_empty_cart() {
    let (app, store) = setup();
    let user = fixture_user(&store, "empty@example.com").await;

    let (status, json) = request(
        &app,
        "POST",
        &format!("/api/v1/orders/{}/checkout", user.id),
        Some(serde_json::json!({"shipping_address": "123 Main St"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "cart is empty");
    assert!(store.orders_for_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_unknown_user() {
    let (app, _) = setup();
    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/orders/{}/checkout", uuid::Uuid::new_v4()),
        Some(serde_json::json!({"shipping_address": "123 Main St"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_after_book_deleted() {
    let (app, store) = setup();
    let user = fixture_user(&store, "stranded@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    store.upsert_cart_line(user.id, book.id, 1).await.unwrap();
    store.delete_book(book.id).await.unwrap();

    let (status, json) = request(
        &app,
        "POST",
        &format!("/api/v1/orders/{}/checkout", user.id),
        Some(serde_json::json!({"shipping_address": "123 Main St"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("no longer exists"));
    assert!(store.orders_for_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_payment_method_classification() {
    let (app, store) = setup();
    let cases = [
        (Some("upi"), "UPI Payment", "UPI-"),
        (Some("cod"), "Cash on Delivery", "COD-"),
        (Some("wallet"), "MockPay", "MP-"),
        (Some(""), "MockPay", "MP-"),
        (None, "MockPay", "MP-"),
    ];

    let mut references = Vec::new();
    for (n, (tag, provider, prefix)) in cases.into_iter().enumerate() {
        let user = fixture_user(&store, &format!("payer{}@example.com", n)).await;
        let book = fixture_book(&store, "Gatsby", 1299).await;
        store.upsert_cart_line(user.id, book.id, 1).await.unwrap();

        let mut body = serde_json::json!({"shipping_address": "123 Main St"});
        if let Some(tag) = tag {
            body["payment_method"] = serde_json::json!(tag);
        }
        let (status, receipt) = request(
            &app,
            "POST",
            &format!("/api/v1/orders/{}/checkout", user.id),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["payment_provider"], provider);
        let reference = receipt["payment_reference"].as_str().unwrap().to_string();
        assert!(reference.starts_with(prefix));
        references.push(reference);
    }

    references.sort();
    references.dedup();
    assert_eq!(references.len(), cases.len());
}

#[tokio::test]
async fn test_concurrent_checkout_single_winner() {
    let (app, store) = setup();
    let user = fixture_user(&store, "racer@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    store.upsert_cart_line(user.id, book.id, 1).await.unwrap();

    let uri = format!("/api/v1/orders/{}/checkout", user.id);
    let body = serde_json::json!({"shipping_address": "123 Main St"});
    let (first, second) = tokio::join!(
        request(&app, "POST", &uri, Some(body.clone())),
        request(&app, "POST", &uri, Some(body)),
    );

    let statuses = [first.0, second.0];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::BAD_REQUEST)
            .count(),
        1
    );
    assert_eq!(store.orders_for_user(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_review_conflict() {
    let (app, store) = setup();
    let user = fixture_user(&store, "critic@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    let body = serde_json::json!({
        "user_id": user.id, "book_id": book.id, "rating": 5, "comment": "superb"
    });

    let (status, _) = request(&app, "POST", "/api/v1/reviews", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = request(&app, "POST", "/api/v1/reviews", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "review already exists");

    let (_, stats) = request(
        &app,
        "GET",
        &format!("/api/v1/reviews/book/{}/stats", book.id),
        None,
    )
    .await;
    assert_eq!(stats["review_count"], 1);
}

#[tokio::test]
async fn test_review_stats_average() {
    let (app, store) = setup();
    let book = fixture_book(&store, "Gatsby", 1299).await;

    let (_, stats) = request(
        &app,
        "GET",
        &format!("/api/v1/reviews/book/{}/stats", book.id),
        None,
    )
    .await;
    assert_eq!(stats["average_rating"], 0.0);
    assert_eq!(stats["review_count"], 0);

    for (n, rating) in [4, 5, 3].into_iter().enumerate() {
        let user = fixture_user(&store, &format!("rater{}@example.com", n)).await;
        let (status, _) = request(
            &app,
            "POST",
            "/api/v1/reviews",
            Some(serde_json::json!({
                "user_id": user.id, "book_id": book.id, "rating": rating
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, stats) = request(
        &app,
        "GET",
        &format!("/api/v1/reviews/book/{}/stats", book.id),
        None,
    )
    .await;
    assert_eq!(stats["average_rating"], 4.0);
    assert_eq!(stats["review_count"], 3);
}

#[tokio::test]
async fn test_review_rating_out_of_range() {
    let (app, store) = setup();
    let user = fixture_user(&store, "sixstars@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/reviews",
        Some(serde_json::json!({
            "user_id": user.id, "book_id": book.id, "rating": 6
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_update_and_delete_check_ownership() {
    let (app, store) = setup();
    let owner = fixture_user(&store, "rv-owner@example.com").await;
    let other = fixture_user(&store, "rv-other@example.com").await;
    let book = fixture_book(&store, "Gatsby", 1299).await;
    let (_, review) = request(
        &app,
        "POST",
        "/api/v1/reviews",
        Some(serde_json::json!({
            "user_id": owner.id, "book_id": book.id, "rating": 4, "comment": "fine"
        })),
    )
    .await;
    let review_id = review["id"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        "PUT",
        &format!("/api/v1/reviews/{}", review_id),
        Some(serde_json::json!({"user_id": other.id, "rating": 1, "comment": "sabotage"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = request(
        &app,
        "PUT",
        &format!("/api/v1/reviews/{}", review_id),
        Some(serde_json::json!({"user_id": owner.id, "rating": 2, "comment": "rereading changed my mind"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rating"], 2);
    assert_eq!(updated["comment"], "rereading changed my mind");
    let created: DateTime<Utc> = updated["created_at"].as_str().unwrap().parse().unwrap();
    let refreshed: DateTime<Utc> = updated["updated_at"].as_str().unwrap().parse().unwrap();
    assert!(refreshed > created);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/v1/reviews/{}?user_id={}", review_id, other.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/v1/reviews/{}?user_id={}", review_id, owner.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.reviews_for_book(book.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_user_duplicate_email() {
    let (app, _) = setup();
    let body = serde_json::json!({"name": "Ada", "email": "ada@example.com"});

    let (status, _) = request(&app, "POST", "/api/v1/users", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = request(&app, "POST", "/api/v1/users", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "user already exists");
}

#[tokio::test]
async fn test_search_seeded_catalog() {
    let (app, store) = setup();
    bookstore_backend::seed::run(store.as_ref()).await.unwrap();

    let (status, books) = request(&app, "GET", "/api/v1/books?q=gatsby", None).await;
    assert_eq!(status, StatusCode::OK);
    let hits = books.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["title"], "The Great Gatsby");
    assert_eq!(hits[0]["price"], "12.99");

    let (_, books) = request(&app, "GET", "/api/v1/books", None).await;
    assert_eq!(books.as_array().unwrap().len(), 10);

    let user_id = store.list_users().await.unwrap()[0].id;
    let (status, picks) = request(
        &app,
        "GET",
        &format!("/api/v1/recommendations/{}?limit=4", user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(picks.as_array().unwrap().len(), 4);
}

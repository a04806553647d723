//! Persistence seam.
//!
//! Every storage primitive the service needs lives behind [`Store`], so the
//! HTTP layer is written once and runs against either backend:
//! [`PostgresStore`] in production, [`InMemoryStore`] in tests.
//!
//! Uniqueness rules (one cart line and one review per user/book pair, unique
//! user emails) are enforced here, at the storage level, not by application
//! existence checks. Lookups return `Ok(None)` for absent rows; targeted
//! mutations report `NotFound` themselves.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::{
    Book, CartLine, CartLineView, NewBook, NewReview, NewUser, Order, OrderLine, Review,
    ReviewStats, User,
};
use crate::error::Result;

#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, new: NewUser) -> Result<User>;
    async fn update_user(&self, id: Uuid, new: NewUser) -> Result<User>;
    async fn delete_user(&self, id: Uuid) -> Result<()>;

    // catalog
    async fn list_books(&self) -> Result<Vec<Book>>;
    /// Case-insensitive substring match over title, author and category.
    async fn search_books(&self, query: &str) -> Result<Vec<Book>>;
    async fn book_by_id(&self, id: Uuid) -> Result<Option<Book>>;
    /// Top-of-catalog placeholder until a real recommender exists.
    async fn recommended_books(&self, limit: i64) -> Result<Vec<Book>>;
    async fn create_book(&self, new: NewBook) -> Result<Book>;
    async fn update_book(&self, id: Uuid, new: NewBook) -> Result<Book>;
    async fn delete_book(&self, id: Uuid) -> Result<()>;

    // cart
    /// Lines joined against the live catalog, oldest first. Lines whose book
    /// was deleted from the catalog are omitted from the view.
    async fn cart_for_user(&self, user_id: Uuid) -> Result<Vec<CartLineView>>;
    /// Atomic add-or-increment on the (user, book) pair. Callers resolve the
    /// user and book before calling.
    async fn upsert_cart_line(&self, user_id: Uuid, book_id: Uuid, quantity: i32)
        -> Result<CartLine>;
    async fn cart_line_by_id(&self, line_id: Uuid) -> Result<Option<CartLine>>;
    async fn set_cart_line_quantity(&self, line_id: Uuid, quantity: i32) -> Result<CartLine>;
    async fn delete_cart_line(&self, line_id: Uuid) -> Result<()>;
    /// Returns the number of lines removed; clearing an empty cart is a no-op.
    async fn clear_cart(&self, user_id: Uuid) -> Result<u64>;

    // orders
    /// The checkout unit of work: snapshots current prices into order lines,
    /// writes the order and clears the cart, all-or-nothing. Fails with
    /// `EmptyCart` when there is nothing to convert and `Inconsistent` when a
    /// cart line references a vanished book.
    async fn place_order(&self, user_id: Uuid, shipping_address: &str) -> Result<Order>;
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>>;
    async fn lines_for_order(&self, order_id: Uuid) -> Result<Vec<OrderLine>>;

    // reviews
    /// Fails with `Conflict` when the user already reviewed the book.
    async fn insert_review(&self, new: NewReview) -> Result<Review>;
    async fn review_by_id(&self, id: Uuid) -> Result<Option<Review>>;
    async fn update_review(&self, id: Uuid, rating: i32, comment: Option<String>)
        -> Result<Review>;
    async fn delete_review(&self, id: Uuid) -> Result<()>;
    async fn reviews_for_book(&self, book_id: Uuid) -> Result<Vec<Review>>;
    async fn reviews_for_user(&self, user_id: Uuid) -> Result<Vec<Review>>;
    /// Recomputed from the live rows on every call; an unreviewed book
    /// reports an average of 0, not an error.
    async fn review_stats(&self, book_id: Uuid) -> Result<ReviewStats>;
}

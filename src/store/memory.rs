//! In-memory [`Store`] used by the test suite.
//!
//! Plain vectors behind one `tokio::sync::RwLock`; every mutating operation
//! holds the write lock for its whole duration, which gives the same
//! observable atomicity as the Postgres transactions. Range and uniqueness
//! rules enforced by schema constraints in Postgres are re-checked explicitly
//! here so both backends fail with the same error kinds.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::checkout::price_cart;
use crate::domain::models::{
    Book, CartLine, CartLineView, NewBook, NewReview, NewUser, Order, OrderLine, OrderStatus,
    Review, ReviewStats, User,
};
use crate::error::{BookstoreError, Result};
use crate::store::Store;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    books: Vec<Book>,
    cart_lines: Vec<CartLine>,
    orders: Vec<Order>,
    order_lines: Vec<OrderLine>,
    reviews: Vec<Review>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(books: &mut [Book]) {
    books.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

fn check_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(BookstoreError::InvalidArgument(
            "quantity must be at least 1".into(),
        ));
    }
    Ok(())
}

fn check_rating(rating: i32) -> Result<()> {
    if !(1..=5).contains(&rating) {
        return Err(BookstoreError::InvalidArgument(
            "rating must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

fn check_price(price: Decimal) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(BookstoreError::InvalidArgument(
            "price must not be negative".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|user| user.email == new.email) {
            return Err(BookstoreError::Conflict("user"));
        }
        let user = User {
            id: Uuid::now_v7(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, new: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|user| user.email == new.email && user.id != id)
        {
            return Err(BookstoreError::Conflict("user"));
        }
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(BookstoreError::NotFound("user"))?;
        user.name = new.name;
        user.email = new.email;
        user.phone = new.phone;
        user.address = new.address;
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        let position = tables
            .users
            .iter()
            .position(|user| user.id == id)
            .ok_or(BookstoreError::NotFound("user"))?;
        tables.users.remove(position);
        // mirror the schema's ON DELETE CASCADE
        tables.cart_lines.retain(|line| line.user_id != id);
        tables.reviews.retain(|review| review.user_id != id);
        let removed: Vec<Uuid> = tables
            .orders
            .iter()
            .filter(|order| order.user_id == id)
            .map(|order| order.id)
            .collect();
        tables.orders.retain(|order| order.user_id != id);
        tables
            .order_lines
            .retain(|line| !removed.contains(&line.order_id));
        Ok(())
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        let mut books = self.tables.read().await.books.clone();
        newest_first(&mut books);
        Ok(books)
    }

    async fn search_books(&self, query: &str) -> Result<Vec<Book>> {
        let needle = query.to_lowercase();
        let mut books: Vec<Book> = self
            .tables
            .read()
            .await
            .books
            .iter()
            .filter(|book| {
                book.title.to_lowercase().contains(&needle)
                    || book.author.to_lowercase().contains(&needle)
                    || book.category.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        newest_first(&mut books);
        Ok(books)
    }

    async fn book_by_id(&self, id: Uuid) -> Result<Option<Book>> {
        Ok(self
            .tables
            .read()
            .await
            .books
            .iter()
            .find(|book| book.id == id)
            .cloned())
    }

    async fn recommended_books(&self, limit: i64) -> Result<Vec<Book>> {
        let mut books = self.tables.read().await.books.clone();
        newest_first(&mut books);
        books.truncate(limit.max(0) as usize);
        Ok(books)
    }

    async fn create_book(&self, new: NewBook) -> Result<Book> {
        check_price(new.price)?;
        let mut tables = self.tables.write().await;
        let book = Book {
            id: Uuid::now_v7(),
            title: new.title,
            author: new.author,
            category: new.category,
            price: new.price,
            description: new.description.unwrap_or_default(),
            image_url: new.image_url,
            created_at: Utc::now(),
        };
        tables.books.push(book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: Uuid, new: NewBook) -> Result<Book> {
        check_price(new.price)?;
        let mut tables = self.tables.write().await;
        let book = tables
            .books
            .iter_mut()
            .find(|book| book.id == id)
            .ok_or(BookstoreError::NotFound("book"))?;
        book.title = new.title;
        book.author = new.author;
        book.category = new.category;
        book.price = new.price;
        book.description = new.description.unwrap_or_default();
        book.image_url = new.image_url;
        Ok(book.clone())
    }

    async fn delete_book(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        let position = tables
            .books
            .iter()
            .position(|book| book.id == id)
            .ok_or(BookstoreError::NotFound("book"))?;
        tables.books.remove(position);
        // cart lines referencing the book stay behind, as in the schema
        Ok(())
    }

    async fn cart_for_user(&self, user_id: Uuid) -> Result<Vec<CartLineView>> {
        let tables = self.tables.read().await;
        let mut views = Vec::new();
        for line in tables.cart_lines.iter().filter(|l| l.user_id == user_id) {
            if let Some(book) = tables.books.iter().find(|b| b.id == line.book_id) {
                views.push(CartLineView {
                    id: line.id,
                    user_id: line.user_id,
                    book_id: line.book_id,
                    quantity: line.quantity,
                    added_at: line.added_at,
                    title: book.title.clone(),
                    author: book.author.clone(),
                    price: book.price,
                    image_url: book.image_url.clone(),
                    line_total: book.price * Decimal::from(line.quantity),
                });
            }
        }
        Ok(views)
    }

    async fn upsert_cart_line(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine> {
        check_quantity(quantity)?;
        let mut tables = self.tables.write().await;
        if let Some(line) = tables
            .cart_lines
            .iter_mut()
            .find(|line| line.user_id == user_id && line.book_id == book_id)
        {
            // merged adds must not wrap; the line is left as it was on failure
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| BookstoreError::InvalidArgument("quantity too large".into()))?;
            return Ok(line.clone());
        }
        let line = CartLine {
            id: Uuid::now_v7(),
            user_id,
            book_id,
            quantity,
            added_at: Utc::now(),
        };
        tables.cart_lines.push(line.clone());
        Ok(line)
    }

    async fn cart_line_by_id(&self, line_id: Uuid) -> Result<Option<CartLine>> {
        Ok(self
            .tables
            .read()
            .await
            .cart_lines
            .iter()
            .find(|line| line.id == line_id)
            .cloned())
    }

    async fn set_cart_line_quantity(&self, line_id: Uuid, quantity: i32) -> Result<CartLine> {
        check_quantity(quantity)?;
        let mut tables = self.tables.write().await;
        let line = tables
            .cart_lines
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or(BookstoreError::NotFound("cart line"))?;
        line.quantity = quantity;
        Ok(line.clone())
    }

    async fn delete_cart_line(&self, line_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        let position = tables
            .cart_lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or(BookstoreError::NotFound("cart line"))?;
        tables.cart_lines.remove(position);
        Ok(())
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_lines.len();
        tables.cart_lines.retain(|line| line.user_id != user_id);
        Ok((before - tables.cart_lines.len()) as u64)
    }

    async fn place_order(&self, user_id: Uuid, shipping_address: &str) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let lines: Vec<CartLine> = tables
            .cart_lines
            .iter()
            .filter(|line| line.user_id == user_id)
            .cloned()
            .collect();
        let books: HashMap<Uuid, Book> = tables
            .books
            .iter()
            .map(|book| (book.id, book.clone()))
            .collect();

        // All failure checks happen before the first mutation, so a failed
        // checkout leaves the tables untouched.
        let pricing = price_cart(&lines, &books)?;

        let order = Order {
            id: Uuid::now_v7(),
            user_id,
            total_amount: pricing.total_amount,
            status: OrderStatus::Confirmed,
            shipping_address: shipping_address.to_string(),
            created_at: Utc::now(),
        };
        for priced in &pricing.lines {
            tables.order_lines.push(OrderLine {
                id: Uuid::now_v7(),
                order_id: order.id,
                book_id: priced.book_id,
                quantity: priced.quantity,
                unit_price: priced.unit_price,
                line_total: priced.line_total,
            });
        }
        tables.orders.push(order.clone());
        tables.cart_lines.retain(|line| line.user_id != user_id);
        Ok(order)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .tables
            .read()
            .await
            .orders
            .iter()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(orders)
    }

    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self
            .tables
            .read()
            .await
            .orders
            .iter()
            .find(|order| order.id == id)
            .cloned())
    }

    async fn lines_for_order(&self, order_id: Uuid) -> Result<Vec<OrderLine>> {
        Ok(self
            .tables
            .read()
            .await
            .order_lines
            .iter()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_review(&self, new: NewReview) -> Result<Review> {
        check_rating(new.rating)?;
        let mut tables = self.tables.write().await;
        if tables
            .reviews
            .iter()
            .any(|review| review.user_id == new.user_id && review.book_id == new.book_id)
        {
            return Err(BookstoreError::Conflict("review"));
        }
        let now = Utc::now();
        let review = Review {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            book_id: new.book_id,
            rating: new.rating,
            comment: new.comment.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        tables.reviews.push(review.clone());
        Ok(review)
    }

    async fn review_by_id(&self, id: Uuid) -> Result<Option<Review>> {
        Ok(self
            .tables
            .read()
            .await
            .reviews
            .iter()
            .find(|review| review.id == id)
            .cloned())
    }

    async fn update_review(&self, id: Uuid, rating: i32, comment: Option<String>) -> Result<Review> {
        check_rating(rating)?;
        let mut tables = self.tables.write().await;
        let review = tables
            .reviews
            .iter_mut()
            .find(|review| review.id == id)
            .ok_or(BookstoreError::NotFound("review"))?;
        review.rating = rating;
        review.comment = comment.unwrap_or_default();
        review.updated_at = Utc::now();
        Ok(review.clone())
    }

    async fn delete_review(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        let position = tables
            .reviews
            .iter()
            .position(|review| review.id == id)
            .ok_or(BookstoreError::NotFound("review"))?;
        tables.reviews.remove(position);
        Ok(())
    }

    async fn reviews_for_book(&self, book_id: Uuid) -> Result<Vec<Review>> {
        Ok(self
            .tables
            .read()
            .await
            .reviews
            .iter()
            .filter(|review| review.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn reviews_for_user(&self, user_id: Uuid) -> Result<Vec<Review>> {
        Ok(self
            .tables
            .read()
            .await
            .reviews
            .iter()
            .filter(|review| review.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn review_stats(&self, book_id: Uuid) -> Result<ReviewStats> {
        let tables = self.tables.read().await;
        let ratings: Vec<i32> = tables
            .reviews
            .iter()
            .filter(|review| review.book_id == book_id)
            .map(|review| review.rating)
            .collect();
        let review_count = ratings.len() as i64;
        let average_rating = if ratings.is_empty() {
            0.0
        } else {
            f64::from(ratings.iter().sum::<i32>()) / review_count as f64
        };
        Ok(ReviewStats {
            average_rating,
            review_count,
        })
    }
}

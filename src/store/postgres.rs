//! Postgres-backed [`Store`].
//!
//! Runtime string queries throughout; the schema constraints in
//! `migrations/` are the authoritative guard for uniqueness and range rules,
//! and their violations are translated into the crate error taxonomy here.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::checkout::price_cart;
use crate::domain::models::{
    Book, CartLine, CartLineView, NewBook, NewReview, NewUser, Order, OrderLine, OrderStatus,
    Review, ReviewStats, User,
};
use crate::error::{BookstoreError, Result};
use crate::store::Store;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps constraint violations onto the error taxonomy: unique violations
/// become `Conflict` on the given entity, check violations become
/// `InvalidArgument` with the database's message.
fn map_violation(entity: &'static str) -> impl Fn(sqlx::Error) -> BookstoreError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => BookstoreError::Conflict(entity),
        sqlx::Error::Database(db) if db.is_check_violation() => {
            BookstoreError::InvalidArgument(db.message().to_string())
        }
        _ => BookstoreError::Database(err),
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, new: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, phone, address) VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.address)
        .fetch_one(&self.pool)
        .await
        .map_err(map_violation("user"))?;
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, new: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET name = $2, email = $3, phone = $4, address = $5 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.address)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_violation("user"))?
        .ok_or(BookstoreError::NotFound("user"))
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BookstoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        let books =
            sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(books)
    }

    async fn search_books(&self, query: &str) -> Result<Vec<Book>> {
        let pattern = format!("%{}%", query);
        let books = sqlx::query_as::<_, Book>(
            "SELECT * FROM books WHERE title ILIKE $1 OR author ILIKE $1 OR category ILIKE $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn book_by_id(&self, id: Uuid) -> Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn recommended_books(&self, limit: i64) -> Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT * FROM books ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn create_book(&self, new: NewBook) -> Result<Book> {
        let book = sqlx::query_as::<_, Book>(
            "INSERT INTO books (id, title, author, category, price, description, image_url) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&new.title)
        .bind(&new.author)
        .bind(&new.category)
        .bind(new.price)
        .bind(new.description.unwrap_or_default())
        .bind(&new.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_violation("book"))?;
        Ok(book)
    }

    async fn update_book(&self, id: Uuid, new: NewBook) -> Result<Book> {
        sqlx::query_as::<_, Book>(
            "UPDATE books SET title = $2, author = $3, category = $4, price = $5, description = $6, image_url = $7 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&new.title)
        .bind(&new.author)
        .bind(&new.category)
        .bind(new.price)
        .bind(new.description.unwrap_or_default())
        .bind(&new.image_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_violation("book"))?
        .ok_or(BookstoreError::NotFound("book"))
    }

    async fn delete_book(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BookstoreError::NotFound("book"));
        }
        Ok(())
    }

    async fn cart_for_user(&self, user_id: Uuid) -> Result<Vec<CartLineView>> {
        let views = sqlx::query_as::<_, CartLineView>(
            "SELECT c.id, c.user_id, c.book_id, c.quantity, c.added_at, \
                    b.title, b.author, b.price, b.image_url, \
                    (b.price * c.quantity) AS line_total \
             FROM cart_lines c JOIN books b ON b.id = c.book_id \
             WHERE c.user_id = $1 ORDER BY c.added_at, c.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(views)
    }

    async fn upsert_cart_line(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine> {
        let line = sqlx::query_as::<_, CartLine>(
            "INSERT INTO cart_lines (id, user_id, book_id, quantity) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, book_id) DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity \
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(book_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(map_violation("cart line"))?;
        Ok(line)
    }

    async fn cart_line_by_id(&self, line_id: Uuid) -> Result<Option<CartLine>> {
        let line = sqlx::query_as::<_, CartLine>("SELECT * FROM cart_lines WHERE id = $1")
            .bind(line_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(line)
    }

    async fn set_cart_line_quantity(&self, line_id: Uuid, quantity: i32) -> Result<CartLine> {
        sqlx::query_as::<_, CartLine>(
            "UPDATE cart_lines SET quantity = $2 WHERE id = $1 RETURNING *",
        )
        .bind(line_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_violation("cart line"))?
        .ok_or(BookstoreError::NotFound("cart line"))
    }

    async fn delete_cart_line(&self, line_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE id = $1")
            .bind(line_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BookstoreError::NotFound("cart line"));
        }
        Ok(())
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn place_order(&self, user_id: Uuid, shipping_address: &str) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Row locks on the cart make concurrent checkouts for the same user
        // serialize; the loser re-reads an empty cart and gets EmptyCart.
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT * FROM cart_lines WHERE user_id = $1 ORDER BY added_at, id FOR UPDATE",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let book_ids: Vec<Uuid> = lines.iter().map(|line| line.book_id).collect();
        let books: HashMap<Uuid, Book> =
            sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ANY($1)")
                .bind(&book_ids)
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .map(|book| (book.id, book))
                .collect();

        // Any pricing failure propagates here and drops the transaction.
        let pricing = price_cart(&lines, &books)?;

        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (id, user_id, total_amount, status, shipping_address) VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(pricing.total_amount)
        .bind(OrderStatus::Confirmed)
        .bind(shipping_address)
        .fetch_one(&mut *tx)
        .await?;

        for priced in &pricing.lines {
            sqlx::query(
                "INSERT INTO order_lines (id, order_id, book_id, quantity, unit_price, line_total) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::now_v7())
            .bind(order.id)
            .bind(priced.book_id)
            .bind(priced.quantity)
            .bind(priced.unit_price)
            .bind(priced.line_total)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn lines_for_order(&self, order_id: Uuid) -> Result<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            "SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    async fn insert_review(&self, new: NewReview) -> Result<Review> {
        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (id, user_id, book_id, rating, comment) VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(new.user_id)
        .bind(new.book_id)
        .bind(new.rating)
        .bind(new.comment.unwrap_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(map_violation("review"))?;
        Ok(review)
    }

    async fn review_by_id(&self, id: Uuid) -> Result<Option<Review>> {
        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn update_review(&self, id: Uuid, rating: i32, comment: Option<String>) -> Result<Review> {
        sqlx::query_as::<_, Review>(
            "UPDATE reviews SET rating = $2, comment = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(rating)
        .bind(comment.unwrap_or_default())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_violation("review"))?
        .ok_or(BookstoreError::NotFound("review"))
    }

    async fn delete_review(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BookstoreError::NotFound("review"));
        }
        Ok(())
    }

    async fn reviews_for_book(&self, book_id: Uuid) -> Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE book_id = $1 ORDER BY created_at, id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn reviews_for_user(&self, user_id: Uuid) -> Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn review_stats(&self, book_id: Uuid) -> Result<ReviewStats> {
        let stats = sqlx::query_as::<_, ReviewStats>(
            "SELECT COALESCE(AVG(rating)::float8, 0) AS average_rating, COUNT(*) AS review_count \
             FROM reviews WHERE book_id = $1",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

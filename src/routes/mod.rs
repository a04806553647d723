//! HTTP handlers, one module per resource.
pub mod books;
pub mod cart;
pub mod orders;
pub mod reviews;
pub mod users;

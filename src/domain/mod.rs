//! Domain types and checkout logic
pub mod checkout;
pub mod events;
pub mod models;

pub use checkout::{price_cart, CartPricing, PaymentMethod, PricedLine};
pub use events::OrderConfirmed;
pub use models::{
    Book, CartLine, CartLineView, NewBook, NewReview, NewUser, Order, OrderLine, OrderStatus,
    OrderView, Review, ReviewStats, User,
};

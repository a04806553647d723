//! Checkout pricing and mock payment handling.
//!
//! `price_cart` is the single code path that turns live cart lines into
//! snapshot order lines; both storage backends call it from inside their
//! checkout transaction so the total and the per-line snapshots can never
//! disagree.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::models::{Book, CartLine};
use crate::error::{BookstoreError, Result};

/// A cart line priced at checkout time. `unit_price` is the catalog price
/// read inside the transaction and becomes the immutable order-line snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub book_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone)]
pub struct CartPricing {
    pub total_amount: Decimal,
    pub lines: Vec<PricedLine>,
}

/// Prices a cart against the current catalog. Fails with `EmptyCart` when
/// there is nothing to price and with `Inconsistent` when a line references
/// a book missing from `books`.
pub fn price_cart(lines: &[CartLine], books: &HashMap<Uuid, Book>) -> Result<CartPricing> {
    if lines.is_empty() {
        return Err(BookstoreError::EmptyCart);
    }
    let mut total_amount = Decimal::ZERO;
    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        let book = books
            .get(&line.book_id)
            .ok_or(BookstoreError::Inconsistent(line.book_id))?;
        let line_total = book.price * Decimal::from(line.quantity);
        total_amount += line_total;
        priced.push(PricedLine {
            book_id: line.book_id,
            quantity: line.quantity,
            unit_price: book.price,
            line_total,
        });
    }
    Ok(CartPricing {
        total_amount,
        lines: priced,
    })
}

/// Payment methods the storefront recognizes. Tags are matched exactly;
/// anything else falls through to the mock provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Upi,
    CashOnDelivery,
    MockPay,
}

impl PaymentMethod {
    pub fn classify(tag: Option<&str>) -> Self {
        match tag {
            Some("upi") => Self::Upi,
            Some("cod") => Self::CashOnDelivery,
            _ => Self::MockPay,
        }
    }

    pub fn provider(self) -> &'static str {
        match self {
            Self::Upi => "UPI Payment",
            Self::CashOnDelivery => "Cash on Delivery",
            Self::MockPay => "MockPay",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::Upi => "UPI",
            Self::CashOnDelivery => "COD",
            Self::MockPay => "MP",
        }
    }

    /// Opaque, call-unique payment reference. Nothing downstream parses it.
    pub fn issue_reference(self) -> String {
        format!("{}-{}", self.prefix(), Uuid::now_v7().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn book(price: Decimal) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: "Some Book".into(),
            author: "Some Author".into(),
            category: "Fiction".into(),
            price,
            description: String::new(),
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn line(user_id: Uuid, book: &Book, quantity: i32) -> CartLine {
        CartLine {
            id: Uuid::now_v7(),
            user_id,
            book_id: book.id,
            quantity,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_cart_totals() {
        let user = Uuid::new_v4();
        let a = book(Decimal::new(1299, 2));
        let b = book(Decimal::new(550, 2));
        let lines = vec![line(user, &a, 2), line(user, &b, 1)];
        let books = HashMap::from([(a.id, a.clone()), (b.id, b)]);

        let pricing = price_cart(&lines, &books).unwrap();
        assert_eq!(pricing.total_amount, Decimal::new(3148, 2));
        assert_eq!(pricing.lines.len(), 2);
        assert_eq!(pricing.lines[0].unit_price, a.price);
        assert_eq!(pricing.lines[0].line_total, Decimal::new(2598, 2));
    }

    #[test]
    fn test_price_cart_empty() {
        assert!(matches!(
            price_cart(&[], &HashMap::new()),
            Err(BookstoreError::EmptyCart)
        ));
    }

    #[test]
    fn test_price_cart_missing_book() {
        let user = Uuid::new_v4();
        let a = book(Decimal::new(1000, 2));
        let lines = vec![line(user, &a, 1)];
        let err = price_cart(&lines, &HashMap::new()).unwrap_err();
        assert!(matches!(err, BookstoreError::Inconsistent(id) if id == a.id));
    }

    #[test]
    fn test_classify_tags() {
        assert_eq!(PaymentMethod::classify(Some("upi")), PaymentMethod::Upi);
        assert_eq!(
            PaymentMethod::classify(Some("cod")),
            PaymentMethod::CashOnDelivery
        );
        assert_eq!(
            PaymentMethod::classify(Some("wallet")),
            PaymentMethod::MockPay
        );
        assert_eq!(PaymentMethod::classify(Some("")), PaymentMethod::MockPay);
        assert_eq!(PaymentMethod::classify(None), PaymentMethod::MockPay);
        // exact match only
        assert_eq!(PaymentMethod::classify(Some("UPI")), PaymentMethod::MockPay);
    }

    #[test]
    fn test_provider_labels() {
        assert_eq!(PaymentMethod::Upi.provider(), "UPI Payment");
        assert_eq!(PaymentMethod::CashOnDelivery.provider(), "Cash on Delivery");
        assert_eq!(PaymentMethod::MockPay.provider(), "MockPay");
    }

    #[test]
    fn test_references_are_prefixed_and_unique() {
        let first = PaymentMethod::Upi.issue_reference();
        let second = PaymentMethod::Upi.issue_reference();
        assert!(first.starts_with("UPI-"));
        assert!(PaymentMethod::CashOnDelivery.issue_reference().starts_with("COD-"));
        assert!(PaymentMethod::MockPay.issue_reference().starts_with("MP-"));
        assert_ne!(first, second);
    }

    proptest! {
        #[test]
        fn price_cart_total_is_sum_of_line_totals(
            entries in proptest::collection::vec((1u32..1_000_000, 1i32..100), 1..8)
        ) {
            let user = Uuid::new_v4();
            let mut books = HashMap::new();
            let mut lines = Vec::new();
            let mut expected = Decimal::ZERO;
            for (cents, quantity) in entries {
                let b = book(Decimal::new(i64::from(cents), 2));
                lines.push(line(user, &b, quantity));
                expected += b.price * Decimal::from(quantity);
                books.insert(b.id, b);
            }

            let pricing = price_cart(&lines, &books).unwrap();
            prop_assert_eq!(pricing.total_amount, expected);
            for priced in &pricing.lines {
                prop_assert_eq!(
                    priced.line_total,
                    priced.unit_price * Decimal::from(priced.quantity)
                );
            }
        }
    }
}

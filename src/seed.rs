//! Demo dataset loaded at startup.
//!
//! Users and books are seeded independently, each only when its table is
//! empty, so restarting against an existing database changes nothing.

use rust_decimal::Decimal;

use crate::domain::models::{NewBook, NewUser};
use crate::error::Result;
use crate::store::Store;

const USERS: [(&str, &str, &str, &str); 3] = [
    (
        "John Doe",
        "john.doe@example.com",
        "+1-555-0123",
        "123 Main St, Anytown, USA",
    ),
    (
        "Jane Smith",
        "jane.smith@example.com",
        "+1-555-0456",
        "456 Oak Ave, Somewhere, USA",
    ),
    (
        "Bob Johnson",
        "bob.johnson@example.com",
        "+1-555-0789",
        "789 Pine Rd, Elsewhere, USA",
    ),
];

// (title, author, category, price in cents, description, image url)
const BOOKS: [(&str, &str, &str, i64, &str, &str); 10] = [
    (
        "The Great Gatsby",
        "F. Scott Fitzgerald",
        "Fiction",
        1299,
        "A classic American novel",
        "https://images.unsplash.com/photo-1544947950-fa07a98d237f?w=300&h=400&fit=crop",
    ),
    (
        "To Kill a Mockingbird",
        "Harper Lee",
        "Fiction",
        1499,
        "A gripping tale of racial injustice",
        "https://images.unsplash.com/photo-1481627834876-b7833e8f5570?w=300&h=400&fit=crop",
    ),
    (
        "1984",
        "George Orwell",
        "Dystopian",
        1399,
        "A dystopian social science fiction novel",
        "https://images.unsplash.com/photo-1495640388908-05fa85288e61?w=300&h=400&fit=crop",
    ),
    (
        "Pride and Prejudice",
        "Jane Austen",
        "Romance",
        1199,
        "A romantic novel of manners",
        "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=300&h=400&fit=crop",
    ),
    (
        "The Catcher in the Rye",
        "J.D. Salinger",
        "Fiction",
        1249,
        "A controversial coming-of-age story",
        "https://images.unsplash.com/photo-1512820790803-83ca734da794?w=300&h=400&fit=crop",
    ),
    (
        "Lord of the Flies",
        "William Golding",
        "Fiction",
        1099,
        "A novel about the dark side of human nature",
        "https://images.unsplash.com/photo-1519904981063-b0cf448d479e?w=300&h=400&fit=crop",
    ),
    (
        "The Hobbit",
        "J.R.R. Tolkien",
        "Fantasy",
        1599,
        "A fantasy adventure novel",
        "https://images.unsplash.com/photo-1578662996442-48f60103fc96?w=300&h=400&fit=crop",
    ),
    (
        "Harry Potter and the Sorcerer's Stone",
        "J.K. Rowling",
        "Fantasy",
        1699,
        "The first book in the Harry Potter series",
        "https://images.unsplash.com/photo-1621351183012-e2f9972dd9bf?w=300&h=400&fit=crop",
    ),
    (
        "The Da Vinci Code",
        "Dan Brown",
        "Thriller",
        1449,
        "A mystery thriller novel",
        "https://images.unsplash.com/photo-1543002588-bfa74002ed7e?w=300&h=400&fit=crop",
    ),
    (
        "The Alchemist",
        "Paulo Coelho",
        "Philosophy",
        1349,
        "A philosophical novel about following your dreams",
        "https://images.unsplash.com/photo-1589829085413-56de8ae18c73?w=300&h=400&fit=crop",
    ),
];

pub async fn run(store: &dyn Store) -> Result<()> {
    if store.list_users().await?.is_empty() {
        for (name, email, phone, address) in USERS {
            store
                .create_user(NewUser {
                    name: name.into(),
                    email: email.into(),
                    phone: Some(phone.into()),
                    address: Some(address.into()),
                })
                .await?;
        }
        tracing::info!("seeded {} demo users", USERS.len());
    }

    if store.list_books().await?.is_empty() {
        for (title, author, category, cents, description, image_url) in BOOKS {
            store
                .create_book(NewBook {
                    title: title.into(),
                    author: author.into(),
                    category: category.into(),
                    price: Decimal::new(cents, 2),
                    description: Some(description.into()),
                    image_url: Some(image_url.into()),
                })
                .await?;
        }
        tracing::info!("seeded {} demo books", BOOKS.len());
    }

    Ok(())
}

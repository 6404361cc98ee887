//! Data models for Libraria

pub mod book;
pub mod genre;
pub mod issuance;
pub mod user;

pub use book::Book;
pub use genre::Genre;
pub use issuance::Issuance;
pub use user::{Role, User, UserClaims};

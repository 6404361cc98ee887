//! Book (catalog entry) model and ISBN validation

use std::borrow::Cow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

pub const ISBN_MAX_LEN: usize = 13;
const ISBN_MESSAGE: &str = "ISBN must be a numeric string with at most 13 digits.";

/// An ISBN is stored as a plain digit string of 1 to 13 characters
pub fn is_valid_isbn(isbn: &str) -> bool {
    !isbn.is_empty() && isbn.len() <= ISBN_MAX_LEN && isbn.bytes().all(|b| b.is_ascii_digit())
}

fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    if is_valid_isbn(isbn) {
        return Ok(());
    }
    let mut err = ValidationError::new("isbn");
    err.message = Some(Cow::Borrowed(ISBN_MESSAGE));
    Err(err)
}

/// Book with its genre name resolved
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    /// Genre ID
    #[sqlx(rename = "genre_id")]
    pub genre: Option<i32>,
    pub genre_name: Option<String>,
    pub publication_date: NaiveDate,
    pub isbn: String,
    pub available: bool,
}

/// Book list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Filter by genre ID
    pub genre: Option<i32>,
    /// Filter by availability
    pub available: Option<bool>,
    /// Case-insensitive match on title or author
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Ensure this field has between 1 and 200 characters."))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Ensure this field has between 1 and 100 characters."))]
    pub author: String,
    pub genre: Option<i32>,
    pub publication_date: NaiveDate,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: String,
    pub available: Option<bool>,
}

/// Partial book update; `genre: null` clears the genre
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "Ensure this field has between 1 and 200 characters."))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Ensure this field has between 1 and 100 characters."))]
    pub author: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub genre: Option<Option<i32>>,
    pub publication_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
    pub available: Option<bool>,
}

impl Book {
    /// Overlay the fields present in `update`
    pub fn apply(&mut self, update: UpdateBook) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(genre) = update.genre {
            self.genre = genre;
        }
        if let Some(date) = update.publication_date {
            self.publication_date = date;
        }
        if let Some(isbn) = update.isbn {
            self.isbn = isbn;
        }
        if let Some(available) = update.available {
            self.available = available;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(isbn: &str) -> CreateBook {
        CreateBook {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre: None,
            publication_date: NaiveDate::from_ymd_opt(1965, 8, 1).unwrap(),
            isbn: isbn.into(),
            available: None,
        }
    }

    #[test]
    fn isbn_accepts_digit_strings_up_to_13() {
        assert!(is_valid_isbn("9780441013593"));
        assert!(is_valid_isbn("0441013597"));
        assert!(is_valid_isbn("1"));
    }

    #[test]
    fn isbn_rejects_non_digits() {
        assert!(!is_valid_isbn("978-0441013593"));
        assert!(!is_valid_isbn("044101359X"));
        assert!(!is_valid_isbn(" 0441013597"));
        assert!(!is_valid_isbn(""));
    }

    #[test]
    fn isbn_rejects_more_than_13_chars() {
        assert!(!is_valid_isbn("97804410135930"));
    }

    #[test]
    fn create_validation_reports_isbn_field() {
        assert!(create("9780441013593").validate().is_ok());

        let errors = create("abc").validate().unwrap_err();
        let fields = errors.field_errors();
        let isbn = fields.get("isbn").expect("isbn error");
        assert_eq!(isbn[0].message.as_deref(), Some(ISBN_MESSAGE));
    }

    #[test]
    fn update_validates_isbn_only_when_present() {
        assert!(UpdateBook::default().validate().is_ok());

        let update = UpdateBook {
            isbn: Some("12345678901234".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn update_distinguishes_null_genre_from_missing() {
        let cleared: UpdateBook = serde_json::from_str(r#"{"genre": null}"#).unwrap();
        assert_eq!(cleared.genre, Some(None));

        let untouched: UpdateBook = serde_json::from_str(r#"{"title": "Dune Messiah"}"#).unwrap();
        assert_eq!(untouched.genre, None);
    }

    #[test]
    fn apply_overlays_present_fields() {
        let mut book = Book {
            id: 1,
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre: Some(4),
            genre_name: Some("Science Fiction".into()),
            publication_date: NaiveDate::from_ymd_opt(1965, 8, 1).unwrap(),
            isbn: "9780441013593".into(),
            available: true,
        };

        book.apply(UpdateBook {
            genre: Some(None),
            available: Some(false),
            ..Default::default()
        });

        assert_eq!(book.genre, None);
        assert!(!book.available);
        assert_eq!(book.title, "Dune");
    }
}

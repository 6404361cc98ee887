//! Books repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook},
};

use super::{like_pattern, limit_offset};

const ISBN_TAKEN: &str = "book with this isbn already exists.";

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author, b.genre_id, g.name AS genre_name,
           b.publication_date, b.isbn, b.available
    FROM books b
    LEFT JOIN genres g ON g.id = b.genre_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    builder.push(" WHERE TRUE");
    if let Some(genre) = query.genre {
        builder.push(" AND b.genre_id = ").push_bind(genre);
    }
    if let Some(available) = query.available {
        builder.push(" AND b.available = ").push_bind(available);
    }
    if let Some(ref search) = query.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (LOWER(b.title) LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR LOWER(b.author) LIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Check if an ISBN is already catalogued
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search books with filters and pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (limit, offset) = limit_offset(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        push_filters(&mut select, query);
        select
            .push(" ORDER BY b.title, b.id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let books = select.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (title, author, genre_id, publication_date, isbn, available)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.genre)
        .bind(book.publication_date)
        .bind(&book.isbn)
        .bind(book.available.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "isbn", ISBN_TAKEN))?;

        self.get_by_id(id).await
    }

    /// Write every column of `book`
    pub async fn update(&self, book: &Book) -> AppResult<Book> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3, genre_id = $4, publication_date = $5,
                isbn = $6, available = $7
            WHERE id = $1
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.genre)
        .bind(book.publication_date)
        .bind(&book.isbn)
        .bind(book.available)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "isbn", ISBN_TAKEN))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", book.id)));
        }
        self.get_by_id(book.id).await
    }

    /// Delete a book together with its issuances
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}

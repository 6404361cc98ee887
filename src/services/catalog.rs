//! Catalog management service (books and genres)

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        genre::Genre,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a book; the payload is expected to be validated already
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        if let Some(genre) = book.genre {
            self.check_genre(genre).await?;
        }
        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::field("isbn", "book with this isbn already exists."));
        }

        let created = self.repository.books.create(&book).await?;
        tracing::info!("Book {} created (isbn {})", created.id, created.isbn);
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        let mut book = self.repository.books.get_by_id(id).await?;

        if let Some(Some(genre)) = update.genre {
            self.check_genre(genre).await?;
        }
        if let Some(ref isbn) = update.isbn {
            if self.repository.books.isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::field("isbn", "book with this isbn already exists."));
            }
        }

        book.apply(update);
        let updated = self.repository.books.update(&book).await?;
        tracing::info!("Book {} updated", id);
        Ok(updated)
    }

    /// Delete a book and every issuance of it
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<Genre> {
        self.repository.genres.get_by_id(id).await
    }

    pub async fn create_genre(&self, name: &str) -> AppResult<Genre> {
        let genre = self.repository.genres.create(name).await?;
        tracing::info!("Genre {} created ({})", genre.id, genre.name);
        Ok(genre)
    }

    pub async fn rename_genre(&self, id: i32, name: &str) -> AppResult<Genre> {
        self.repository.genres.rename(id, name).await
    }

    /// Delete a genre, leaving its books without one
    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        self.repository.genres.delete(id).await?;
        tracing::info!("Genre {} deleted", id);
        Ok(())
    }

    async fn check_genre(&self, id: i32) -> AppResult<()> {
        if !self.repository.genres.exists(id).await? {
            return Err(AppError::missing_reference("genre", id));
        }
        Ok(())
    }
}

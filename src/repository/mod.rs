//! Repository layer for database operations

pub mod books;
pub mod genres;
pub mod issuances;
pub mod users;

use sqlx::{Pool, Postgres};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 200;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub genres: genres::GenresRepository,
    pub books: books::BooksRepository,
    pub issuances: issuances::IssuancesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            genres: genres::GenresRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            issuances: issuances::IssuancesRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Normalized (page, per_page) pair: page starts at 1, per_page within 1..=MAX_PER_PAGE
pub fn page_params(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// (LIMIT, OFFSET) for a page request; the offset saturates instead of overflowing
pub fn limit_offset(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let (page, per_page) = page_params(page, per_page);
    (per_page, (page - 1).saturating_mul(per_page))
}

/// Case-insensitive substring pattern for `LIKE ... ESCAPE '\'`
pub fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page() {
        assert_eq!(page_params(None, None), (1, DEFAULT_PER_PAGE));
        assert_eq!(limit_offset(None, None), (DEFAULT_PER_PAGE, 0));
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(page_params(Some(0), Some(0)), (1, 1));
        assert_eq!(page_params(Some(-3), Some(10_000)), (1, MAX_PER_PAGE));
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(limit_offset(Some(3), Some(10)), (10, 20));
    }

    #[test]
    fn huge_page_saturates() {
        assert_eq!(limit_offset(Some(i64::MAX), Some(MAX_PER_PAGE)), (MAX_PER_PAGE, i64::MAX));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Dune"), "%dune%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }
}

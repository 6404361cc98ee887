//! Issuances repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::issuance::{IssuanceQuery, IssuanceRow, NewIssuance},
};

use super::limit_offset;

const ISSUANCE_SELECT: &str = r#"
    SELECT i.id, i.book_id, i.user_id, i.issue_date, i.due_date, i.return_date,
           b.title AS book_title, u.username AS user_name
    FROM issuances i
    JOIN books b ON b.id = i.book_id
    JOIN users u ON u.id = i.user_id
"#;

#[derive(Clone)]
pub struct IssuancesRepository {
    pool: Pool<Postgres>,
}

/// `borrower` restricts rows to one user; `None` means every row is visible.
/// `active` and `overdue` select the matching rows when true and the complement when false.
fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    borrower: Option<i32>,
    query: &IssuanceQuery,
    now: DateTime<Utc>,
) {
    builder.push(" WHERE TRUE");
    if let Some(user_id) = borrower {
        builder.push(" AND i.user_id = ").push_bind(user_id);
    }
    match query.active {
        Some(true) => {
            builder.push(" AND i.return_date IS NULL");
        }
        Some(false) => {
            builder.push(" AND i.return_date IS NOT NULL");
        }
        None => {}
    }
    if let Some(overdue) = query.overdue {
        builder.push(if overdue { " AND " } else { " AND NOT " });
        builder
            .push("((i.return_date IS NOT NULL AND i.return_date > i.due_date)")
            .push(" OR (i.return_date IS NULL AND i.due_date < ")
            .push_bind(now)
            .push("))");
    }
}

impl IssuancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fetch one issuance, restricted to `borrower` when given
    pub async fn get_visible(&self, id: i32, borrower: Option<i32>) -> AppResult<IssuanceRow> {
        sqlx::query_as::<_, IssuanceRow>(&format!(
            "{} WHERE i.id = $1 AND ($2::INTEGER IS NULL OR i.user_id = $2)",
            ISSUANCE_SELECT
        ))
        .bind(id)
        .bind(borrower)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Issuance with id {} not found", id)))
    }

    /// List issuances, most recent first
    pub async fn search(
        &self,
        borrower: Option<i32>,
        query: &IssuanceQuery,
        now: DateTime<Utc>,
    ) -> AppResult<(Vec<IssuanceRow>, i64)> {
        let (limit, offset) = limit_offset(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM issuances i");
        push_filters(&mut count, borrower, query, now);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(ISSUANCE_SELECT);
        push_filters(&mut select, borrower, query, now);
        select
            .push(" ORDER BY i.issue_date DESC, i.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = select
            .build_query_as::<IssuanceRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn create(&self, issuance: &NewIssuance) -> AppResult<IssuanceRow> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO issuances (book_id, user_id, issue_date, due_date, return_date)
            VALUES ($1, $2, NOW(), $3, $4)
            RETURNING id
            "#,
        )
        .bind(issuance.book_id)
        .bind(issuance.user_id)
        .bind(issuance.due_date)
        .bind(issuance.return_date)
        .fetch_one(&self.pool)
        .await?;

        self.get_visible(id, None).await
    }

    /// Write the mutable columns of `row`
    pub async fn update(&self, row: &IssuanceRow) -> AppResult<IssuanceRow> {
        let result = sqlx::query(
            r#"
            UPDATE issuances
            SET book_id = $2, user_id = $3, due_date = $4, return_date = $5
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(row.book_id)
        .bind(row.user_id)
        .bind(row.due_date)
        .bind(row.return_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Issuance with id {} not found", row.id)));
        }
        self.get_visible(row.id, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_sql(borrower: Option<i32>, query: IssuanceQuery) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM issuances i");
        push_filters(&mut builder, borrower, &query, Utc::now());
        builder.sql().to_string()
    }

    #[test]
    fn member_rows_are_scoped_to_borrower() {
        let sql = filter_sql(Some(12), IssuanceQuery::default());
        assert!(sql.ends_with(" WHERE TRUE AND i.user_id = $1"), "{sql}");

        let sql = filter_sql(None, IssuanceQuery::default());
        assert!(!sql.contains("user_id"), "{sql}");
    }

    #[test]
    fn false_flags_select_the_complement() {
        let sql = filter_sql(
            None,
            IssuanceQuery {
                active: Some(false),
                overdue: Some(false),
                ..Default::default()
            },
        );
        assert!(sql.contains("AND i.return_date IS NOT NULL AND NOT ((i.return_date"), "{sql}");

        let sql = filter_sql(
            None,
            IssuanceQuery {
                active: Some(true),
                overdue: Some(true),
                ..Default::default()
            },
        );
        assert!(sql.contains("AND i.return_date IS NULL AND ((i.return_date"), "{sql}");
        assert!(sql.contains("i.due_date < $1"), "{sql}");
    }
}

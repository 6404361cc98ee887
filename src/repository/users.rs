//! Users repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::user::{CreateUser, User, UserQuery},
};

use super::{like_pattern, limit_offset};

const USERNAME_TAKEN: &str = "A user with that username already exists.";

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, role, phone, address, is_active, date_joined";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    builder.push(" WHERE TRUE");
    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role);
    }
    if let Some(ref search) = query.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (LOWER(username) LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR LOWER(first_name) LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR LOWER(last_name) LIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Check if username already exists; usernames are case-sensitive, like the UNIQUE constraint
    pub async fn username_exists(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let (limit, offset) = limit_offset(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY username LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let users = select.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Create a new user
    pub async fn create(&self, user: &CreateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, role, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(user.email.as_deref().unwrap_or_default())
        .bind(user.first_name.as_deref().unwrap_or_default())
        .bind(user.last_name.as_deref().unwrap_or_default())
        .bind(user.role.unwrap_or_default())
        .bind(user.phone.as_deref().unwrap_or_default())
        .bind(user.address.as_deref().unwrap_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "username", USERNAME_TAKEN))
    }

    /// Write every mutable column of `user`
    pub async fn update(&self, user: &User) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $2, email = $3, first_name = $4, last_name = $5,
                role = $6, phone = $7, address = $8, is_active = $9
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "username", USERNAME_TAKEN))?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user.id)))
    }

    /// Delete a user; their issuances go with them
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}

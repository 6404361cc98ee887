//! User management service

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User, UserQuery},
    repository::Repository,
};

const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Overlay the fields present in `update`
pub fn apply_update(user: &mut User, update: UpdateUser) {
    if let Some(username) = update.username {
        user.username = username;
    }
    if let Some(email) = update.email {
        user.email = email;
    }
    if let Some(first_name) = update.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = update.last_name {
        user.last_name = last_name;
    }
    if let Some(role) = update.role {
        user.role = role;
    }
    if let Some(phone) = update.phone {
        user.phone = phone;
    }
    if let Some(address) = update.address {
        user.address = address;
    }
    if let Some(is_active) = update.is_active {
        user.is_active = is_active;
    }
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.search(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        if self.repository.users.username_exists(&user.username, None).await? {
            return Err(AppError::field("username", USERNAME_TAKEN));
        }

        let created = self.repository.users.create(&user).await?;
        tracing::info!("User {} created ({}, {})", created.id, created.username, created.role);
        Ok(created)
    }

    pub async fn update_user(&self, id: i32, update: UpdateUser) -> AppResult<User> {
        let mut user = self.repository.users.get_by_id(id).await?;

        if let Some(ref username) = update.username {
            if self.repository.users.username_exists(username, Some(id)).await? {
                return Err(AppError::field("username", USERNAME_TAKEN));
            }
        }

        let previous_role = user.role;
        apply_update(&mut user, update);
        let updated = self.repository.users.update(&user).await?;

        if updated.role != previous_role {
            tracing::info!("User {} role changed: {} -> {}", id, previous_role, updated.role);
        }
        Ok(updated)
    }

    /// Delete a user together with their issuances
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!("User {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: 5,
            username: "reader".into(),
            email: "reader@example.org".into(),
            first_name: "Ada".into(),
            last_name: "Byron".into(),
            role: Role::Member,
            phone: String::new(),
            address: String::new(),
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn update_changes_role_and_keeps_other_fields() {
        let mut target = user();
        apply_update(
            &mut target,
            UpdateUser {
                role: Some(Role::Librarian),
                phone: Some("0123456789".into()),
                ..Default::default()
            },
        );

        assert_eq!(target.role, Role::Librarian);
        assert_eq!(target.phone, "0123456789");
        assert_eq!(target.username, "reader");
        assert_eq!(target.email, "reader@example.org");
    }
}

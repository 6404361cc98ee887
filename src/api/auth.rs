//! Current-user endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::user::User};

use super::AuthenticatedUser;

/// Get the authenticated user's own record
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Token refers to a deleted user")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    Ok(Json(user))
}

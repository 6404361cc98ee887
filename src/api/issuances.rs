//! Issuance endpoints
//!
//! Staff see and edit every issuance. Members only ever see their own, and
//! anything they create or edit is recorded against themselves.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::issuance::{CreateIssuanceRequest, Issuance, IssuanceQuery, UpdateIssuanceRequest},
};

use super::{AuthenticatedUser, IssuancePage, PaginatedResponse};

/// List issuances visible to the caller
#[utoipa::path(
    get,
    path = "/issuances",
    tag = "issuances",
    security(("bearer_auth" = [])),
    params(IssuanceQuery),
    responses(
        (status = 200, description = "Issuances, most recent first", body = IssuancePage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_issuances(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<IssuanceQuery>,
) -> AppResult<Json<PaginatedResponse<Issuance>>> {
    let (issuances, total) = state.services.issuances.list(&claims, &query).await?;
    Ok(Json(PaginatedResponse::new(issuances, total, query.page, query.per_page)))
}

#[utoipa::path(
    get,
    path = "/issuances/{id}",
    tag = "issuances",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Issuance ID")
    ),
    responses(
        (status = 200, description = "Issuance", body = Issuance),
        (status = 404, description = "Issuance not found or not visible")
    )
)]
pub async fn get_issuance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Issuance>> {
    let issuance = state.services.issuances.get(&claims, id).await?;
    Ok(Json(issuance))
}

/// Issue a book
#[utoipa::path(
    post,
    path = "/issuances",
    tag = "issuances",
    security(("bearer_auth" = [])),
    request_body = CreateIssuanceRequest,
    responses(
        (status = 201, description = "Issuance created", body = Issuance),
        (status = 400, description = "Missing borrower or unknown book/user", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_issuance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<CreateIssuanceRequest>, AppError>,
) -> AppResult<(StatusCode, Json<Issuance>)> {
    let issuance = state.services.issuances.create(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(issuance)))
}

/// Update an issuance, typically to record its return
#[utoipa::path(
    put,
    path = "/issuances/{id}",
    tag = "issuances",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Issuance ID")
    ),
    request_body = UpdateIssuanceRequest,
    responses(
        (status = 200, description = "Issuance updated", body = Issuance),
        (status = 400, description = "Unknown book/user", body = crate::error::ErrorResponse),
        (status = 404, description = "Issuance not found or not visible")
    )
)]
pub async fn update_issuance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(update), _): WithRejection<Json<UpdateIssuanceRequest>, AppError>,
) -> AppResult<Json<Issuance>> {
    let issuance = state.services.issuances.update(&claims, id, update).await?;
    Ok(Json(issuance))
}

/// Partially update an issuance; same rules as PUT
#[utoipa::path(
    patch,
    path = "/issuances/{id}",
    tag = "issuances",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Issuance ID")
    ),
    request_body = UpdateIssuanceRequest,
    responses(
        (status = 200, description = "Issuance updated", body = Issuance),
        (status = 400, description = "Unknown book/user", body = crate::error::ErrorResponse),
        (status = 404, description = "Issuance not found or not visible")
    )
)]
pub async fn patch_issuance(
    state: State<crate::AppState>,
    user: AuthenticatedUser,
    id: WithRejection<Path<i32>, AppError>,
    update: WithRejection<Json<UpdateIssuanceRequest>, AppError>,
) -> AppResult<Json<Issuance>> {
    update_issuance(state, user, id, update).await
}

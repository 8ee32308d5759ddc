//! User API handlers
//!
//! Thin wrappers: decode, delegate to `UserService`, encode.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::dto::{
    CreateUserRequest, LoginRequest, LoginResponse, UpdateUserRequest, UserProfileResponse,
    UserSummary, UsersResponse,
};
use crate::application::UserService;
use crate::interfaces::http::common::{ApiError, ErrorResponse, StatusResponse, ValidatedJson};

#[derive(Clone)]
pub struct UserHandlerState {
    pub user_service: Arc<UserService>,
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = StatusResponse),
        (status = 409, description = "Username taken", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<UserHandlerState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .user_service
        .create_user(&request.username, &request.password)
        .await?;
    Ok(Json(StatusResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<UserHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = state
        .user_service
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(LoginResponse {
        token,
        status: "Ok".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User with activity", body = UserProfileResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 502, description = "Peer service failed", body = ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let profile = state.user_service.get_user(&id).await?;
    Ok(Json(profile.into()))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = UsersResponse)
    )
)]
pub async fn list_users(
    State(state): State<UserHandlerState>,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = state.user_service.get_users().await?;
    Ok(Json(UsersResponse {
        users: users.into_iter().map(UserSummary::from).collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = StatusResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Username taken", body = ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .user_service
        .update_user(&id, &request.username, request.password.as_deref())
        .await?;
    Ok(Json(StatusResponse::ok()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = StatusResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.user_service.delete_user(&id).await?;
    Ok(Json(StatusResponse::ok()))
}

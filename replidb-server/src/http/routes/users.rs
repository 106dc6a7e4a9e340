//! User endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::http::error::ApiError;
use crate::http::extractors::ValidUserId;
use crate::http::server::AppState;
use crate::models::{CreateUserRequest, NewUser, User};

/// GET /users - every user, newest first
async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, ApiError> {
    let cancel = state.shutdown.child_token();
    let users = state.users.list(&cancel).await?;
    Ok(Json(users))
}

/// POST /users - create one user
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = NewUser::try_from(req)?;
    let cancel = state.shutdown.child_token();
    let created = state.users.create(&cancel, user).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /users/batch - create several users in one transaction
async fn create_users(
    State(state): State<Arc<AppState>>,
    Json(reqs): Json<Vec<CreateUserRequest>>,
) -> Result<(StatusCode, Json<Vec<User>>), ApiError> {
    let users = reqs
        .into_iter()
        .map(NewUser::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let cancel = state.shutdown.child_token();
    let created = state.users.create_batch(&cancel, users).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /users/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    ValidUserId(id): ValidUserId,
) -> Result<Json<User>, ApiError> {
    let cancel = state.shutdown.child_token();
    let user = state.users.get(&cancel, id).await?;
    Ok(Json(user))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/batch", post(create_users))
        .route("/users/{id}", get(get_user))
}

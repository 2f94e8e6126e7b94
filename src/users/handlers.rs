use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    error::UserError,
    extract::{AppJson, AppPath, AppQuery},
    response::ApiResponse,
    state::AppState,
    users::{
        dto::{DeletedUser, Pagination, PasswordCheck, VerifyPassword},
        model::{User, UserInput},
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/verify-password", post(verify_password))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserInput>,
) -> Result<(StatusCode, HeaderMap, Json<ApiResponse<User>>), UserError> {
    let user = services::create_user(state.users.as_ref(), payload).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/users/{}", user.id))
        .map_err(|e| UserError::Internal(e.to_string()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(ApiResponse::ok(user))))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(page): AppQuery<Pagination>,
) -> Result<Json<ApiResponse<Vec<User>>>, UserError> {
    let users = services::list_users(state.users.as_ref(), page).await?;
    Ok(Json(ApiResponse::ok(users)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<User>>, UserError> {
    let user = services::get_user(state.users.as_ref(), id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UserInput>,
) -> Result<Json<ApiResponse<User>>, UserError> {
    let user = services::update_user(state.users.as_ref(), id, payload).await?;
    Ok(Json(ApiResponse::ok(user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<DeletedUser>>, UserError> {
    services::delete_user(state.users.as_ref(), id).await?;
    Ok(Json(ApiResponse::with_message(
        DeletedUser { id },
        "user deleted",
    )))
}

#[instrument(skip(state, payload))]
pub async fn verify_password(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<VerifyPassword>,
) -> Result<Json<ApiResponse<PasswordCheck>>, UserError> {
    let matches = services::verify_user_password(state.users.as_ref(), id, payload.password).await?;
    Ok(Json(ApiResponse::ok(PasswordCheck { matches })))
}

//! Wrappers around axum's `Json`, `Path` and `Query` whose rejections render
//! through [`UserError`], so malformed requests still get the JSON error envelope.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::UserError;

pub struct AppJson<T>(pub T);

pub struct AppPath<T>(pub T);

pub struct AppQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> UserError {
    let message = match &rejection {
        JsonRejection::JsonDataError(err) => format!("invalid JSON data: {}", err.body_text()),
        JsonRejection::JsonSyntaxError(err) => format!("invalid JSON syntax: {}", err.body_text()),
        JsonRejection::MissingJsonContentType(_) => {
            "missing Content-Type header, expected application/json".to_string()
        }
        other => other.body_text(),
    };
    UserError::BadRequest {
        status: rejection.status(),
        message,
    }
}

fn path_rejection(rejection: PathRejection) -> UserError {
    UserError::BadRequest {
        status: rejection.status(),
        message: rejection.body_text(),
    }
}

fn query_rejection(rejection: QueryRejection) -> UserError {
    UserError::BadRequest {
        status: rejection.status(),
        message: rejection.body_text(),
    }
}

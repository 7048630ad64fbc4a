//! Extractor wrappers whose rejections go through `AppError`, so malformed
//! ids, queries and bodies get the same `{"error":{"kind",...}}` envelope as
//! every other failure.

use axum::{
    async_trait,
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

/// The `:id` segment of a resource route. An id that is not a UUID cannot
/// name any stored resource, so it is `NotFound` rather than a bad request.
pub struct ResourceId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<Uuid>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(ResourceId(id)),
            Err(rejection) => {
                debug!("Unparseable resource id in {}: {}", parts.uri.path(), rejection.body_text());
                Err(AppError::NotFound(format!(
                    "No resource found at {}",
                    parts.uri.path()
                )))
            }
        }
    }
}

/// JSON body extractor.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    debug!("Rejected JSON body: {}", rejection.body_text());
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::validation("Expected a JSON body with Content-Type: application/json")
        }
        JsonRejection::JsonDataError(_) => {
            AppError::validation("Request body does not have the expected fields")
        }
        _ => AppError::validation("Request body is not valid JSON"),
    }
}

/// Query-string extractor.
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(AppQuery(value)),
            Err(rejection) => {
                debug!("Rejected query string: {}", rejection.body_text());
                Err(AppError::validation("Invalid query parameters"))
            }
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        debug!("Rejected multipart body: {}", rejection.body_text());
        AppError::validation("Expected a multipart/form-data body with a 'file' field")
    }
}

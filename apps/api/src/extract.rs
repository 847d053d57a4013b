//! Request extractors whose rejections render as `AppError`.

use axum::extract::{FromRequest, FromRequestParts, Query};
use axum::Json;

use crate::errors::AppError;

/// `Json<T>` with body errors reported in the service's error envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Query<T>` with query-string errors reported in the service's error envelope.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

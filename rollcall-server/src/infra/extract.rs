//! Request extractors whose rejections use the `ApiResponse` envelope.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query},
};

use crate::infra::errors::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

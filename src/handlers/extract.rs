// JSON extractor whose rejections render through ApiError
use axum::extract::FromRequest;

use crate::utils::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

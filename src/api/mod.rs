//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.

mod anon_flashcards;
mod generate;

pub use anon_flashcards::*;
pub use generate::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// JSON success response with an explicit status code.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub status: StatusCode,
    pub data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.data)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a 200 response.
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse {
        status: StatusCode::OK,
        data,
    })
}

/// Create a 201 response.
pub fn created<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse {
        status: StatusCode::CREATED,
        data,
    })
}

use axum::{Json, extract::rejection::JsonRejection};

use crate::error::AppError;

/// Turns axum's JSON rejection into the same error shape as every other
/// failure.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(format!("Malformed payload: {}", rejection.body_text())))
}

pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid product id: {raw}")))
}

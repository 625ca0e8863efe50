use crate::api::v1::handler::ApiResponse;
use crate::application_port::RotationError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(err) = err.find::<ApiErrorCode>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone(), err.to_string()));
        Ok(warp::reply::with_status(json, err.status()))
    } else {
        let json = warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(ApiError {
                code: ApiErrorCode::InternalError,
                message: format!("Unhandled error: {:?}", err),
            }),
        });
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid identifier or password")]
    InvalidCredentials,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Session has been revoked")]
    SessionRevoked,
    #[error("Refresh token already used")]
    TokenReuseDetected,
    #[error("Access token has been revoked")]
    TokenRevoked,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    /// Everything auth-shaped maps to 401; none of it is retryable by
    /// design (a reuse-detected refresh will fail forever, the session is
    /// gone).
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<RotationError> for ApiErrorCode {
    fn from(error: RotationError) -> Self {
        match error {
            RotationError::Malformed => ApiErrorCode::InvalidToken,
            RotationError::InvalidToken => ApiErrorCode::InvalidToken,
            RotationError::SessionRevoked => ApiErrorCode::SessionRevoked,
            RotationError::ReuseDetected => ApiErrorCode::TokenReuseDetected,
            RotationError::Store(e) => ApiErrorCode::internal(e),
            RotationError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}

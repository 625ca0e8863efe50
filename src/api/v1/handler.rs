use super::error::*;
use crate::application_port::{CredentialVerifier, RotationService, TokenPair};
use crate::domain_model::SessionId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
    pub device: Option<serde_json::Value>,
}

pub async fn login(
    request: LoginRequest,
    credential_verifier: Arc<dyn CredentialVerifier>,
    rotation_service: Arc<dyn RotationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = credential_verifier
        .verify(&request.identifier, &request.password)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?
        .ok_or_else(|| reject::custom(ApiErrorCode::InvalidCredentials))?;

    let device = request.device.unwrap_or(serde_json::Value::Null);
    let pair: TokenPair = rotation_service
        .issue(user_id, device)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(pair)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    request: RefreshRequest,
    rotation_service: Arc<dyn RotationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let pair = rotation_service
        .rotate(&request.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(pair)))
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub session_id: SessionId,
}

pub async fn logout(
    request: LogoutRequest,
    rotation_service: Arc<dyn RotationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    rotation_service
        .logout(request.session_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(LogoutResponse {
        session_id: request.session_id,
    })))
}

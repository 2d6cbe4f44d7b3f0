//! Errors surfaced to HTTP callers.
//!
//! Every failure maps to one status code and a `{"detail": ...}` body. Nothing
//! is retried and nothing is swallowed.

use crate::auth::TokenError;
use crate::customer::ValidationError;
use crate::models::ErrorBody;
use crate::prediction::PredictionError;
use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Username already exists")]
    DuplicateUser,
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Not authenticated")]
    MissingToken,
    #[error("{}", invalid_token_detail(.0))]
    InvalidToken(TokenError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Payload(String),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error("{0}")]
    Internal(String),
}

fn invalid_token_detail(e: &TokenError) -> &'static str {
    match e {
        TokenError::Expired => "Token has expired",
        _ => "Invalid token",
    }
}

impl ApiError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::MissingToken | ApiError::InvalidToken(_))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::DuplicateUser => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::MissingToken | ApiError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Validation(_) | ApiError::Payload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Prediction(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if self.is_unauthenticated() {
            response.insert_header((header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer")));
        }
        response.json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

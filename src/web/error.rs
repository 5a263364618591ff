use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::{debug, error};

use crate::prelude::*;

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Error::InvalidCsrfToken => (StatusCode::BAD_REQUEST, "Invalid CSRF token."),

            // Login errors
            Error::BadCredentials | Error::DirectoryUnavailable(_) => {
                (StatusCode::UNAUTHORIZED, "Authentication failed")
            }

            // Role errors
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Error::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),

            Error::ProfileNotFound => (StatusCode::NOT_FOUND, "Not found"),

            // Internal errors - hide details
            Error::Generic(_)
            | Error::IO(_)
            | Error::Json(_)
            | Error::ConfigParse(_)
            | Error::InvalidConfig(_)
            | Error::PasswordHash(_)
            | Error::R2D2(_)
            | Error::Diesel(_)
            | Error::Migration(_)
            | Error::Join(_)
            | Error::RoleNotRegistered(_)
            | Error::StoreNotBound(_)
            | Error::CtxMissing
            | Error::RoleBindingMissing => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        if status.is_server_error() {
            error!("Request failed: {self:?}");
        } else {
            debug!("Request refused: {self}");
        }

        let body = Json(json!({
            "error": {
                "message": message,
                "status": status.as_u16()
            }
        }));
        (status, body).into_response()
    }
}

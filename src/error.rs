use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use std::env;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

/// Broad classes of failure, derived from the error code range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    Internal,
    Validation,
    Conflict,
    Authorization,
    NotFound,
    Downstream,
}

impl Error {
    fn new(code: i32, message: &str) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn class(&self) -> Class {
        match self.code {
            100..=199 => Class::Validation,
            200..=299 => Class::Conflict,
            300..=399 => Class::Authorization,
            400..=499 => Class::NotFound,
            500..=599 => Class::Downstream,
            _ => Class::Internal,
        }
    }

    pub fn is_not_found_error(&self) -> bool {
        self.code == 400
    }

    pub fn is_already_decided_error(&self) -> bool {
        self.code == 201
    }

    pub fn is_conflict(&self) -> bool {
        self.class() == Class::Conflict
    }
}

// internal

pub fn unexpected_error() -> Error {
    Error::new(1, "unexpected error")
}

pub fn env_var_error() -> Error {
    Error::new(2, "environment variable error")
}

pub fn authorizor_error() -> Error {
    Error::new(3, "authorizor error")
}

// validation

pub fn invalid_input_error() -> Error {
    Error::new(100, "invalid input")
}

pub fn invalid_window_error() -> Error {
    Error::new(101, "bidding window must end in the future")
}

pub fn out_of_range_error() -> Error {
    Error::new(102, "bid amount out of range")
}

pub fn missing_reference_error() -> Error {
    Error::new(103, "referenced entity has no id")
}

// state conflicts

pub fn session_closed_error() -> Error {
    Error::new(200, "bidding session is closed")
}

pub fn already_decided_error() -> Error {
    Error::new(201, "a winner has already been selected")
}

pub fn bid_not_found_error() -> Error {
    Error::new(202, "bid does not belong to this session")
}

pub fn session_exists_error() -> Error {
    Error::new(203, "load already has a bidding session")
}

pub fn not_awarded_error() -> Error {
    Error::new(204, "bid has not been selected as the winner")
}

// authorization

pub fn forbidden_error() -> Error {
    Error::new(300, "forbidden")
}

// lookup

pub fn not_found_error() -> Error {
    Error::new(400, "not found")
}

// collaborators

pub fn upstream_error() -> Error {
    Error::new(500, "upstream error")
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(_: env::VarError) -> Self {
        env_var_error()
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        tracing::warn!("collaborator request failed: {}", err);
        upstream_error()
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        tracing::error!("authorizor failed: {}", err);
        authorizor_error()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.class() {
            Class::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Class::Validation if self.code == 100 => StatusCode::BAD_REQUEST,
            Class::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Class::Conflict => StatusCode::CONFLICT,
            Class::Authorization => StatusCode::FORBIDDEN,
            Class::NotFound => StatusCode::NOT_FOUND,
            Class::Downstream => StatusCode::BAD_GATEWAY,
        };

        let error_message = match self.class() {
            Class::Internal => "Internal Server Error",
            _ => self.message.as_str(),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

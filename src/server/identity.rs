use axum::{
    async_trait,
    extract::{FromRequest, RequestParts},
    http::HeaderMap,
};
use uuid::Uuid;

use crate::auth::{Role, User};
use crate::error::{forbidden_error, invalid_input_error, Error};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// The caller as identified upstream. Authentication happens before requests
/// reach this service; the gateway forwards the id and a comma separated
/// role list.
#[async_trait]
impl<B> FromRequest<B> for User
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        user_from_headers(req.headers())
    }
}

fn user_from_headers(headers: &HeaderMap) -> Result<User, Error> {
    let id = headers
        .get(USER_ID_HEADER)
        .ok_or_else(forbidden_error)?
        .to_str()
        .ok()
        .and_then(|id| Uuid::parse_str(id.trim()).ok())
        .ok_or_else(invalid_input_error)?;

    let roles = match headers.get(USER_ROLES_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| invalid_input_error())?
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Role::from_name(name).ok_or_else(invalid_input_error))
            .collect::<Result<Vec<Role>, Error>>()?,
        None => Vec::new(),
    };

    Ok(User::new(id, &roles))
}

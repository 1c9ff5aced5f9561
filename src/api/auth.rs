use axum::{ extract::FromRequestParts, http::request::Parts };
use uuid::Uuid;

use crate::enums::Role;
use crate::error::AppError;
use crate::identity::CurrentUser;

/// Header carrying the caller id, set by the upstream auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the caller role; absent means a regular user.
pub const USER_ROLE_HEADER: &str = "x-user-role";

impl<S> FromRequestParts<S> for CurrentUser where S: Send + Sync {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts.headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing caller identity".to_string()))?;
        let id = Uuid::parse_str(id.trim()).map_err(|_|
            AppError::Unauthorized("Malformed caller identity".to_string())
        )?;

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            Some(value) =>
                value
                    .to_str()
                    .map_err(|_| AppError::Unauthorized("Malformed caller role".to_string()))?
                    .trim()
                    .parse::<Role>()?,
            None => Role::User,
        };

        Ok(CurrentUser { id, role })
    }
}

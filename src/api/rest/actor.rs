use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};

/// Set by the authenticating gateway in front of this service.
pub const ROLE_HEADER: &str = "x-actor-role";
pub const ID_HEADER: &str = "x-actor-id";

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = match header(parts, ROLE_HEADER)? {
            "business" => Role::Business,
            "rider" => Role::Rider,
            "admin" => Role::Admin,
            other => return Err(AppError::Forbidden(format!("unknown role {other}"))),
        };

        let id = header(parts, ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| AppError::Forbidden(format!("{ID_HEADER} is not a valid id")))?;

        Ok(Actor::new(role, id))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Forbidden(format!("missing {name} header")))
}

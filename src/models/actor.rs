use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Business,
    Rider,
    Admin,
}

/// Authenticated caller of a core operation, tagged with its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Business(Uuid),
    Rider(Uuid),
    Admin(Uuid),
}

impl Actor {
    pub fn new(role: Role, id: Uuid) -> Self {
        match role {
            Role::Business => Actor::Business(id),
            Role::Rider => Actor::Rider(id),
            Role::Admin => Actor::Admin(id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Actor::Business(id) | Actor::Rider(id) | Actor::Admin(id) => *id,
        }
    }

    pub fn require_business(&self) -> Result<Uuid, AppError> {
        match self {
            Actor::Business(id) => Ok(*id),
            _ => Err(forbidden(Role::Business)),
        }
    }

    pub fn require_rider(&self) -> Result<Uuid, AppError> {
        match self {
            Actor::Rider(id) => Ok(*id),
            _ => Err(forbidden(Role::Rider)),
        }
    }

    pub fn require_admin(&self) -> Result<Uuid, AppError> {
        match self {
            Actor::Admin(id) => Ok(*id),
            _ => Err(forbidden(Role::Admin)),
        }
    }
}

fn forbidden(expected: Role) -> AppError {
    AppError::Forbidden(format!("operation requires the {expected:?} role").to_lowercase())
}

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Citizen,
    Officer,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Citizen => write!(f, "citizen"),
            UserRole::Officer => write!(f, "officer"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

/// Database model for user; reports reference users by id only
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)]
pub struct User {
    pub id: Uuid,
    pub is_anonymous: bool,
    pub role: UserRole,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

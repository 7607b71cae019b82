use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WALK_IN_CLIENT_NAME: &str = "Walk-in client";
pub const OTHER_SERVICE_NAME: &str = "Service Autre";
pub const DEFAULT_COMMISSION_RATE: f64 = 60.0;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Stores a string-backed enum as a TEXT column on every sqlx backend.
macro_rules! text_column {
    ($ty:ty) => {
        impl<DB: sqlx::Database> sqlx::Type<DB> for $ty
        where
            String: sqlx::Type<DB>,
        {
            fn type_info() -> DB::TypeInfo {
                <String as sqlx::Type<DB>>::type_info()
            }

            fn compatible(ty: &DB::TypeInfo) -> bool {
                <String as sqlx::Type<DB>>::compatible(ty)
            }
        }

        impl<'r, DB: sqlx::Database> sqlx::Decode<'r, DB> for $ty
        where
            String: sqlx::Decode<'r, DB>,
        {
            fn decode(
                value: <DB as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <String as sqlx::Decode<'r, DB>>::decode(value)?;
                Ok(raw.parse()?)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agent => "agent",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "agent" => Ok(Self::Agent),
            other => Err(ParseEnumError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

text_column!(Role);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Blocked,
}

impl UserStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
        }
    }
}

impl FromStr for UserStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "blocked" => Ok(Self::Blocked),
            other => Err(ParseEnumError {
                kind: "user status",
                value: other.to_string(),
            }),
        }
    }
}

text_column!(UserStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Validated,
    Rejected,
}

impl OperationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for OperationStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "validated" => Ok(Self::Validated),
            "rejected" => Ok(Self::Rejected),
            other => Err(ParseEnumError {
                kind: "operation status",
                value: other.to_string(),
            }),
        }
    }
}

text_column!(OperationStatus);

/// Admin decision on a pending operation. `pending` is never a valid target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Validated,
    Rejected,
}

impl From<Verdict> for OperationStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Validated => Self::Validated,
            Verdict::Rejected => Self::Rejected,
        }
    }
}

/// Column a login identifier is matched against, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Phone,
    AccountName,
}

impl LoginField {
    pub const LOOKUP_ORDER: [LoginField; 3] = [Self::Email, Self::Phone, Self::AccountName];
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub account_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub specialty: Option<String>,
    /// Carried for a future per-agent split; reports use the fixed ratio.
    pub commission_rate: f64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    pub service_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub account_name: String,
    pub password_hash: String,
    pub role: Role,
    pub specialty: Option<String>,
    pub commission_rate: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Client {
    pub id: i64,
    pub full_name: String,
    pub phone: String,
    pub address: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub full_name: String,
    pub phone: String,
    pub address: Option<String>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Operation {
    pub id: i64,
    pub service_id: i64,
    pub agent_id: i64,
    pub client_id: i64,
    pub price_charged: f64,
    pub notes: Option<String>,
    pub status: OperationStatus,
    pub service_date: DateTime<Utc>,
    pub validation_date: Option<DateTime<Utc>>,
}

/// Operation joined with the display names of its service, client and agent.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OperationDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub operation: Operation,
    pub service_name: String,
    pub client_name: String,
    pub agent_name: String,
}

#[derive(Debug, Clone)]
pub struct NewOperation {
    pub service_id: i64,
    pub agent_id: i64,
    pub client_id: i64,
    pub price_charged: f64,
    pub notes: Option<String>,
    pub service_date: DateTime<Utc>,
}

/// Inclusive `service_date` bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OperationFilter {
    pub status: Option<OperationStatus>,
    pub agent_id: Option<i64>,
    pub range: DateRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_their_column_text() {
        for role in [Role::Admin, Role::Agent] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        for status in [
            OperationStatus::Pending,
            OperationStatus::Validated,
            OperationStatus::Rejected,
        ] {
            assert_eq!(status.to_string().parse::<OperationStatus>().unwrap(), status);
        }
        assert!("superuser".parse::<Role>().is_err());
        assert!("archived".parse::<UserStatus>().is_err());
    }

    #[test]
    fn verdict_never_maps_back_to_pending() {
        assert_eq!(OperationStatus::from(Verdict::Validated), OperationStatus::Validated);
        assert_eq!(OperationStatus::from(Verdict::Rejected), OperationStatus::Rejected);
        assert!(serde_json::from_str::<Verdict>("\"pending\"").is_err());
    }
}

//! Client (customer account) domain types.

use std::str::FromStr;

use crewplan_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EmailAddress;

/// Unique identifier for a client record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Creates a new random client identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a client identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Engagement status of a client account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Client has running engagements.
    Active,
    /// Engagements are paused.
    OnHold,
    /// Relationship has ended.
    Inactive,
}

impl ClientStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Inactive => "inactive",
        }
    }
}

impl FromStr for ClientStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "on_hold" => Ok(Self::OnHold),
            "inactive" => Ok(Self::Inactive),
            _ => Err(AppError::Validation(format!(
                "unknown client status '{value}'"
            ))),
        }
    }
}

/// A client account. Clients have no owner; mutation is gated purely by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier.
    pub id: ClientId,
    /// Unique client name.
    pub name: NonEmptyString,
    /// Optional billing / contact email.
    pub contact_email: Option<EmailAddress>,
    /// Optional phone number, stored as entered.
    pub phone: Option<String>,
    /// Engagement status.
    pub status: ClientStatus,
}

impl Client {
    /// Creates a client with validated name and contact email.
    pub fn new(
        name: impl Into<String>,
        contact_email: Option<String>,
        phone: Option<String>,
        status: ClientStatus,
    ) -> AppResult<Self> {
        Ok(Self {
            id: ClientId::new(),
            name: NonEmptyString::new(name)?,
            contact_email: contact_email
                .filter(|value| !value.trim().is_empty())
                .map(EmailAddress::new)
                .transpose()?,
            phone: phone.filter(|value| !value.trim().is_empty()),
            status,
        })
    }
}

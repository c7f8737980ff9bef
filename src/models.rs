use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ClassId(pub i64);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque member identifier issued by the upstream identity system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow, ToSchema)]
pub struct GymClass {
    pub id: ClassId,
    pub name: String,
    #[schema(value_type = String, format = "date-time", example = "2025-11-24T06:00:00Z")]
    pub start_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub description: String,
    pub capacity: Option<i64>,
    pub version: i64,
}

impl GymClass {
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_seconds)
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + self.duration()
    }
}

/// Class fields as submitted by the authoring endpoints, before validation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassFields {
    pub name: String,
    #[schema(value_type = String, format = "date-time", example = "2025-11-24T06:00:00Z")]
    pub start_time: DateTime<Utc>,
    /// `HH:MM` or `HH:MM:SS`.
    #[schema(example = "01:00")]
    pub duration: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateClassRequest {
    #[serde(flatten)]
    pub fields: ClassFields,
    /// Version the caller last read; a mismatch is reported as a conflict.
    pub version: i64,
}

/// Class fields that passed validation and can be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGymClass {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub description: String,
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassView {
    #[serde(flatten)]
    pub class: GymClass,
    #[schema(value_type = String, format = "date-time")]
    pub end_time: DateTime<Utc>,
}

impl From<GymClass> for ClassView {
    fn from(class: GymClass) -> Self {
        let end_time = class.end_time();
        Self { class, end_time }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassDetails {
    #[serde(flatten)]
    pub class: GymClass,
    #[schema(value_type = String, format = "date-time")]
    pub end_time: DateTime<Utc>,
    pub attendees: Vec<MemberId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ToggleResponse {
    pub outcome: ToggleOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    Inserted,
    AlreadyExists,
    ClassFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveResult {
    Removed,
    NotFound,
}

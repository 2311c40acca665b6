use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod db;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Pending => write!(f, "pending"),
            ApplicationStatus::Approved => write!(f, "approved"),
            ApplicationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A rejected application is the only resolved state open to re-application;
/// pending and approved ones stay exclusive per email.
pub fn reapplication_allowed(status: ApplicationStatus) -> bool {
    status == ApplicationStatus::Rejected
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherApplication {
    #[serde(
        rename = "_id",
        default = "Uuid::new_v4",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub status: ApplicationStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationData {
    pub name: String,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub experience: Option<String>,
    pub category: Option<String>,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

impl From<TeacherApplication> for ApplicationResponse {
    fn from(app: TeacherApplication) -> Self {
        ApplicationResponse {
            id: app.id,
            email: app.email,
            name: app.name,
            experience: app.experience,
            category: app.category,
            status: app.status,
            submitted_at: app.submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_as_lowercase_strings() {
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::Approved).unwrap(),
            "\"approved\""
        );
    }

    #[test]
    fn only_rejected_applications_may_reapply() {
        assert!(reapplication_allowed(ApplicationStatus::Rejected));
        assert!(!reapplication_allowed(ApplicationStatus::Pending));
        assert!(!reapplication_allowed(ApplicationStatus::Approved));
    }
}

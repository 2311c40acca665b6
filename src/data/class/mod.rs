use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod db;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ClassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassStatus::Pending => write!(f, "pending"),
            ClassStatus::Approved => write!(f, "approved"),
            ClassStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Student work handed in against an assignment. Appended, never removed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub student_email: String,
    pub content: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub content: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub submission_count: i64,
}

/// A published class. Status is admin-controlled and gates visibility in
/// the public listings; assignments are embedded in creation order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    #[serde(
        rename = "_id",
        default = "Uuid::new_v4",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub teacher_email: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub status: ClassStatus,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassCreateData {
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassUpdateData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassResponse {
    pub id: Uuid,
    pub teacher_email: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub status: ClassStatus,
    pub assignment_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<Class> for ClassResponse {
    fn from(class: Class) -> Self {
        ClassResponse {
            id: class.id,
            teacher_email: class.teacher_email,
            title: class.title,
            description: class.description,
            price: class.price,
            status: class.status,
            assignment_count: class.assignments.len(),
            created_at: class.created_at,
        }
    }
}

/// Row shape produced by the enrollment-join pipelines. Assignments and the
/// joined enrollment documents are projected away before rows leave the
/// store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledClass {
    #[serde(rename = "_id", with = "bson::serde_helpers::uuid_1_as_binary")]
    pub id: Uuid,
    pub teacher_email: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub status: ClassStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub total_enrollment: i64,
    #[serde(default)]
    pub assignment_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledClassResponse {
    pub id: Uuid,
    pub teacher_email: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub status: ClassStatus,
    pub total_enrollment: i64,
    pub assignment_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<EnrolledClass> for EnrolledClassResponse {
    fn from(row: EnrolledClass) -> Self {
        EnrolledClassResponse {
            id: row.id,
            teacher_email: row.teacher_email,
            title: row.title,
            description: row.description,
            price: row.price,
            status: row.status,
            total_enrollment: row.total_enrollment,
            assignment_count: row.assignment_count,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub index: usize,
    pub content: String,
    pub submission_count: i64,
    pub created_at: DateTime<Utc>,
}

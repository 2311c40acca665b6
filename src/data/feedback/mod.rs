use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod db;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// Feedback is unique per (class, student) pair; any stored document for
/// the pair blocks resubmission, whatever its content.
pub fn feedback_conflict(existing: Option<&Feedback>) -> bool {
    existing.is_some()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(
        rename = "_id",
        default = "Uuid::new_v4",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub class_id: Uuid,
    pub student: String,
    pub rating: i32,
    pub comment: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackData {
    pub class_id: Uuid,
    pub rating: i32,
    pub comment: String,
}

impl FeedbackData {
    pub fn validate(&self) -> Result<(), crate::resp::problem::Problem> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(crate::resp::problem::Problem::validation(format!(
                "Rating must be between {} and {}.",
                MIN_RATING, MAX_RATING
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub id: Uuid,
    pub class_id: Uuid,
    pub student: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<Feedback> for FeedbackResponse {
    fn from(feedback: Feedback) -> Self {
        FeedbackResponse {
            id: feedback.id,
            class_id: feedback.class_id,
            student: feedback.student,
            rating: feedback.rating,
            comment: feedback.comment,
            created_at: feedback.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn data(rating: i32) -> FeedbackData {
        FeedbackData {
            class_id: Uuid::new_v4(),
            rating,
            comment: "Great class.".to_string(),
        }
    }

    #[test]
    fn ratings_inside_the_scale_pass() {
        assert!(data(1).validate().is_ok());
        assert!(data(5).validate().is_ok());
    }

    #[test]
    fn ratings_outside_the_scale_are_rejected() {
        assert!(data(0).validate().is_err());
        assert!(data(6).validate().is_err());
        assert!(data(-3).validate().is_err());
    }

    #[test]
    fn stored_feedback_blocks_resubmission() {
        let existing = Feedback {
            id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            student: "s@x.com".to_string(),
            rating: 4,
            comment: "Great class.".to_string(),
            created_at: Utc::now(),
        };

        assert!(feedback_conflict(Some(&existing)));
        assert!(!feedback_conflict(None));
    }
}

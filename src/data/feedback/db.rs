use bson::doc;
use chrono::Utc;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::Problem;

use super::{feedback_conflict, Feedback, FeedbackData};

pub static FEEDBACK_COLLECTION_NAME: &str = "feedback";

pub mod problem {
    use crate::resp::problem::Problem;

    #[inline]
    pub fn duplicate(class_id: uuid::Uuid) -> Problem {
        Problem::conflict("Feedback for this class was already submitted.")
            .insert_str("classId", class_id)
            .clone()
    }
}

pub trait FeedbackDbExt {
    /// One feedback document per (class, student) pair; a duplicate is a
    /// conflict and the original is left untouched. Uniqueness lives here,
    /// not in a storage constraint.
    async fn submit_feedback(
        &self,
        student: &str,
        data: FeedbackData,
    ) -> Result<Feedback, Problem>;

    async fn list_feedback(&self, class_id: Option<Uuid>) -> Result<Vec<Feedback>, Problem>;
}

impl FeedbackDbExt for Database {
    async fn submit_feedback(
        &self,
        student: &str,
        data: FeedbackData,
    ) -> Result<Feedback, Problem> {
        let collection = self.collection::<Feedback>(FEEDBACK_COLLECTION_NAME);

        let existing = collection
            .find_one(
                doc! {
                    "classId": filter::uuid_bson(data.class_id),
                    "student": student,
                },
                None,
            )
            .await
            .map_err(Problem::from)?;

        if feedback_conflict(existing.as_ref()) {
            return Err(problem::duplicate(data.class_id));
        }

        let feedback = Feedback {
            id: Uuid::new_v4(),
            class_id: data.class_id,
            student: student.to_string(),
            rating: data.rating,
            comment: data.comment,
            created_at: Utc::now(),
        };

        collection
            .insert_one(&feedback, None)
            .await
            .map_err(Problem::from)?;

        Ok(feedback)
    }

    async fn list_feedback(&self, class_id: Option<Uuid>) -> Result<Vec<Feedback>, Problem> {
        let query = class_id.map(|id| doc! { "classId": filter::uuid_bson(id) });

        self.collection::<Feedback>(FEEDBACK_COLLECTION_NAME)
            .find(query, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    #[test]
    fn duplicate_feedback_is_a_conflict() {
        let class_id = Uuid::new_v4();
        let problem = problem::duplicate(class_id);

        assert_eq!(problem.status, Status::Conflict);
        let body = problem.response_body();
        assert_eq!(body["status"], 409);
        assert_eq!(body["classId"], class_id.to_string());
    }
}

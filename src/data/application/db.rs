use bson::doc;
use chrono::Utc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::data::filter;
use crate::middleware::paging::PageState;
use crate::resp::problem::Problem;

use super::{reapplication_allowed, ApplicationData, ApplicationStatus, TeacherApplication};

pub static APPLICATION_COLLECTION_NAME: &str = "teacher_requests";

pub mod problem {
    use crate::resp::problem::Problem;

    #[inline]
    pub fn already_applied(email: impl ToString) -> Problem {
        Problem::conflict("An application already exists for this email.")
            .insert_str("email", email)
            .clone()
    }

    #[inline]
    pub fn not_found(id: uuid::Uuid) -> Problem {
        Problem::not_found("Teacher application doesn't exist.")
            .insert_str("id", id)
            .clone()
    }
}

pub trait ApplicationsDbExt {
    /// Submits an application for `email`. While a pending or approved one
    /// exists this is a conflict; after a rejection the same document is
    /// reset to pending with the new profile fields.
    async fn submit_application(
        &self,
        email: &str,
        data: ApplicationData,
    ) -> Result<TeacherApplication, Problem>;

    async fn find_application(&self, id: Uuid) -> Result<Option<TeacherApplication>, Problem>;

    async fn list_applications(&self, page: PageState)
        -> Result<Vec<TeacherApplication>, Problem>;

    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<TeacherApplication>, Problem>;
}

impl ApplicationsDbExt for Database {
    async fn submit_application(
        &self,
        email: &str,
        data: ApplicationData,
    ) -> Result<TeacherApplication, Problem> {
        let collection = self.collection::<TeacherApplication>(APPLICATION_COLLECTION_NAME);

        let existing = collection
            .find_one(filter::by_email(email), None)
            .await
            .map_err(Problem::from)?;

        if let Some(existing) = existing {
            if !reapplication_allowed(existing.status) {
                return Err(problem::already_applied(email));
            }

            let options = FindOneAndUpdateOptions::builder()
                .return_document(ReturnDocument::After)
                .build();
            let update = doc! {
                "$set": {
                    "name": &data.name,
                    "experience": data.experience.as_deref(),
                    "category": data.category.as_deref(),
                    "status": ApplicationStatus::Pending.to_string(),
                    "submittedAt": bson::DateTime::now(),
                }
            };

            return collection
                .find_one_and_update(filter::by_id(existing.id), update, options)
                .await
                .map_err(Problem::from)?
                .ok_or_else(|| problem::not_found(existing.id));
        }

        let application = TeacherApplication {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: data.name,
            experience: data.experience,
            category: data.category,
            status: ApplicationStatus::Pending,
            submitted_at: Utc::now(),
        };

        collection
            .insert_one(&application, None)
            .await
            .map_err(Problem::from)?;

        Ok(application)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<TeacherApplication>, Problem> {
        self.collection(APPLICATION_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_applications(
        &self,
        page: PageState,
    ) -> Result<Vec<TeacherApplication>, Problem> {
        self.collection::<TeacherApplication>(APPLICATION_COLLECTION_NAME)
            .find(None, FindOptions::from(page))
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<TeacherApplication>, Problem> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection::<TeacherApplication>(APPLICATION_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_id(id),
                doc! { "$set": { "status": status.to_string() } },
                options,
            )
            .await
            .map_err(Problem::from)
    }
}

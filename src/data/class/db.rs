use bson::{doc, from_document, Document};
use chrono::Utc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::{StreamExt, TryStreamExt};
use uuid::Uuid;

use crate::data::enrollment::db::ENROLLMENT_COLLECTION_NAME;
use crate::data::filter;
use crate::middleware::paging::PageState;
use crate::resp::problem::Problem;

use super::{Class, ClassCreateData, ClassStatus, ClassUpdateData, EnrolledClass, Submission};

pub static CLASS_COLLECTION_NAME: &str = "classes";

/// Page size of the popularity listing.
pub const POPULAR_CLASSES_LIMIT: i64 = 6;

/// Join approved classes against their enrollments and count the matches.
/// The count and join run inside the store; the application never
/// reimplements them.
pub fn approved_classes_pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": { "status": ClassStatus::Approved.to_string() } },
        doc! { "$lookup": {
            "from": ENROLLMENT_COLLECTION_NAME,
            "localField": "_id",
            "foreignField": "classId",
            "as": "enrolled",
        } },
        doc! { "$addFields": {
            "totalEnrollment": { "$size": "$enrolled" },
            "assignmentCount": { "$size": { "$ifNull": ["$assignments", []] } },
        } },
        doc! { "$project": { "enrolled": 0, "assignments": 0 } },
    ]
}

pub fn popular_classes_pipeline() -> Vec<Document> {
    let mut pipeline = approved_classes_pipeline();
    pipeline.push(doc! { "$sort": { "totalEnrollment": -1 } });
    pipeline.push(doc! { "$limit": POPULAR_CLASSES_LIMIT });
    pipeline
}

fn update_document(data: ClassUpdateData) -> Document {
    let mut set = Document::new();
    if let Some(title) = data.title {
        set.insert("title", title);
    }
    if let Some(price) = data.price {
        set.insert("price", price);
    }
    if let Some(description) = data.description {
        set.insert("description", description);
    }
    set
}

pub trait ClassesDbExt {
    async fn create_class(
        &self,
        teacher_email: &str,
        data: ClassCreateData,
    ) -> Result<Class, Problem>;

    async fn find_class(&self, id: Uuid) -> Result<Option<Class>, Problem>;

    async fn list_classes(&self, page: PageState) -> Result<Vec<Class>, Problem>;

    async fn list_classes_by_teacher(&self, email: &str) -> Result<Vec<Class>, Problem>;

    async fn set_class_status(
        &self,
        id: Uuid,
        status: ClassStatus,
    ) -> Result<Option<Class>, Problem>;

    /// Applies the provided field updates; returns false when the class
    /// doesn't exist. The caller is responsible for the ownership check.
    async fn update_class_info(&self, id: Uuid, data: ClassUpdateData) -> Result<bool, Problem>;

    async fn push_assignment(&self, id: Uuid, content: &str) -> Result<bool, Problem>;

    /// Appends a submission to the indexed assignment and bumps its counter
    /// in the same update. False when the class or the index is absent.
    async fn push_submission(
        &self,
        id: Uuid,
        index: usize,
        submission: Submission,
    ) -> Result<bool, Problem>;

    async fn list_approved_classes(&self) -> Result<Vec<EnrolledClass>, Problem>;

    async fn list_popular_classes(&self) -> Result<Vec<EnrolledClass>, Problem>;

    async fn count_classes(&self) -> Result<u64, Problem>;
}

impl ClassesDbExt for Database {
    async fn create_class(
        &self,
        teacher_email: &str,
        data: ClassCreateData,
    ) -> Result<Class, Problem> {
        let class = Class {
            id: Uuid::new_v4(),
            teacher_email: teacher_email.to_string(),
            title: data.title,
            description: data.description,
            price: data.price,
            status: ClassStatus::Pending,
            assignments: vec![],
            created_at: Utc::now(),
        };

        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .insert_one(&class, None)
            .await
            .map_err(Problem::from)?;

        Ok(class)
    }

    async fn find_class(&self, id: Uuid) -> Result<Option<Class>, Problem> {
        self.collection(CLASS_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_classes(&self, page: PageState) -> Result<Vec<Class>, Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .find(None, FindOptions::from(page))
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn list_classes_by_teacher(&self, email: &str) -> Result<Vec<Class>, Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .find(doc! { "teacherEmail": email }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn set_class_status(
        &self,
        id: Uuid,
        status: ClassStatus,
    ) -> Result<Option<Class>, Problem> {
        let options = mongodb::options::FindOneAndUpdateOptions::builder()
            .return_document(mongodb::options::ReturnDocument::After)
            .build();

        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_id(id),
                doc! { "$set": { "status": status.to_string() } },
                options,
            )
            .await
            .map_err(Problem::from)
    }

    async fn update_class_info(&self, id: Uuid, data: ClassUpdateData) -> Result<bool, Problem> {
        let set = update_document(data);

        let result = self
            .collection::<Class>(CLASS_COLLECTION_NAME)
            .update_one(filter::by_id(id), doc! { "$set": set }, None)
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }

    async fn push_assignment(&self, id: Uuid, content: &str) -> Result<bool, Problem> {
        let assignment = doc! {
            "content": content,
            "createdAt": bson::DateTime::now(),
            "submissions": [],
            "submissionCount": 0i64,
        };

        let result = self
            .collection::<Class>(CLASS_COLLECTION_NAME)
            .update_one(
                filter::by_id(id),
                doc! { "$push": { "assignments": assignment } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }

    async fn push_submission(
        &self,
        id: Uuid,
        index: usize,
        submission: Submission,
    ) -> Result<bool, Problem> {
        let mut query = filter::by_id(id);
        query.insert(format!("assignments.{}", index), doc! { "$exists": true });

        let mut push = Document::new();
        push.insert(
            format!("assignments.{}.submissions", index),
            bson::to_bson(&submission)?,
        );
        let mut inc = Document::new();
        inc.insert(format!("assignments.{}.submissionCount", index), 1i64);

        let result = self
            .collection::<Class>(CLASS_COLLECTION_NAME)
            .update_one(query, doc! { "$push": push, "$inc": inc }, None)
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }

    async fn list_approved_classes(&self) -> Result<Vec<EnrolledClass>, Problem> {
        aggregate_classes(self, approved_classes_pipeline()).await
    }

    async fn list_popular_classes(&self) -> Result<Vec<EnrolledClass>, Problem> {
        aggregate_classes(self, popular_classes_pipeline()).await
    }

    async fn count_classes(&self) -> Result<u64, Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .count_documents(None, None)
            .await
            .map_err(Problem::from)
    }
}

async fn aggregate_classes(
    db: &Database,
    pipeline: Vec<Document>,
) -> Result<Vec<EnrolledClass>, Problem> {
    let mut rows = db
        .collection::<Class>(CLASS_COLLECTION_NAME)
        .aggregate(pipeline, None)
        .await
        .map_err(Problem::from)?;

    let mut classes = vec![];
    while let Some(row) = rows.next().await {
        match from_document::<EnrolledClass>(row.map_err(Problem::from)?) {
            Ok(class) => classes.push(class),
            Err(e) => {
                tracing::warn!("unable to deserialize aggregated class row: {}", e);
            }
        }
    }

    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approved_pipeline_matches_joins_and_counts() {
        let pipeline = approved_classes_pipeline();

        assert_eq!(
            pipeline[0],
            doc! { "$match": { "status": "approved" } },
            "public listings must only ever see approved classes"
        );

        let lookup = pipeline[1].get_document("$lookup").expect("$lookup stage");
        assert_eq!(lookup.get_str("from"), Ok("enrollments"));
        assert_eq!(lookup.get_str("localField"), Ok("_id"));
        assert_eq!(lookup.get_str("foreignField"), Ok("classId"));

        let fields = pipeline[2]
            .get_document("$addFields")
            .expect("$addFields stage");
        assert_eq!(
            fields.get_document("totalEnrollment").unwrap(),
            &doc! { "$size": "$enrolled" }
        );
    }

    #[test]
    fn popular_pipeline_sorts_descending_and_caps_the_page() {
        let pipeline = popular_classes_pipeline();
        let len = pipeline.len();

        assert_eq!(
            pipeline[len - 2],
            doc! { "$sort": { "totalEnrollment": -1 } }
        );
        assert_eq!(pipeline[len - 1], doc! { "$limit": 6i64 });
    }

    #[test]
    fn update_document_only_sets_provided_fields() {
        let set = update_document(ClassUpdateData {
            title: Some("Intro to Cello".to_string()),
            price: None,
            description: None,
        });

        assert_eq!(set.get_str("title"), Ok("Intro to Cello"));
        assert!(set.get("price").is_none());
        assert!(set.get("description").is_none());
    }

    #[test]
    fn empty_update_produces_empty_document() {
        let set = update_document(ClassUpdateData {
            title: None,
            price: None,
            description: None,
        });
        assert!(set.is_empty());
    }
}

use bson::doc;
use chrono::Utc;
use mongodb::Database;
use rocket::futures::{StreamExt, TryStreamExt};
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::Problem;

use super::{Enrollment, Payment, PaymentData, PaymentRecorded};

pub static PAYMENT_COLLECTION_NAME: &str = "payments";
pub static ENROLLMENT_COLLECTION_NAME: &str = "enrollments";

pub trait EnrollmentsDbExt {
    /// Records the payment ledger entry, then the enrollment. The two
    /// inserts are sequential and not transactional: a failure after the
    /// first one leaves an orphaned payment and surfaces as 500.
    async fn record_payment(
        &self,
        email: &str,
        data: PaymentData,
    ) -> Result<PaymentRecorded, Problem>;

    async fn enrollments_for_student(&self, email: &str) -> Result<Vec<Enrollment>, Problem>;

    /// Fills the enrollment review slot. The `review: null` filter keeps
    /// the slot write-once even if the caller's duplicate check races.
    async fn set_enrollment_review(
        &self,
        class_id: Uuid,
        student_email: &str,
        review: &str,
    ) -> Result<bool, Problem>;

    async fn count_enrollments(&self) -> Result<u64, Problem>;

    async fn total_revenue(&self) -> Result<f64, Problem>;
}

impl EnrollmentsDbExt for Database {
    async fn record_payment(
        &self,
        email: &str,
        data: PaymentData,
    ) -> Result<PaymentRecorded, Problem> {
        let now = Utc::now();

        let payment = Payment {
            id: Uuid::new_v4(),
            class_id: data.class_id,
            email: email.to_string(),
            amount: data.amount,
            method: data.method,
            transaction_id: data.transaction_id.clone(),
            paid_at: now,
        };

        self.collection::<Payment>(PAYMENT_COLLECTION_NAME)
            .insert_one(&payment, None)
            .await
            .map_err(Problem::from)?;
        tracing::info!("recorded payment {} for class {}", payment.id, data.class_id);

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_email: email.to_string(),
            class_id: data.class_id,
            enrolled_at: now,
            payment_info: data.transaction_id,
            review: None,
        };

        self.collection::<Enrollment>(ENROLLMENT_COLLECTION_NAME)
            .insert_one(&enrollment, None)
            .await
            .map_err(Problem::from)?;
        tracing::info!(
            "recorded enrollment {} for payment {}",
            enrollment.id,
            payment.id
        );

        Ok(PaymentRecorded {
            payment_id: payment.id,
            enrollment_id: enrollment.id,
        })
    }

    async fn enrollments_for_student(&self, email: &str) -> Result<Vec<Enrollment>, Problem> {
        self.collection::<Enrollment>(ENROLLMENT_COLLECTION_NAME)
            .find(doc! { "studentEmail": email }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn set_enrollment_review(
        &self,
        class_id: Uuid,
        student_email: &str,
        review: &str,
    ) -> Result<bool, Problem> {
        let result = self
            .collection::<Enrollment>(ENROLLMENT_COLLECTION_NAME)
            .update_one(
                doc! {
                    "classId": filter::uuid_bson(class_id),
                    "studentEmail": student_email,
                    "review": null,
                },
                doc! { "$set": { "review": review } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.modified_count > 0)
    }

    async fn count_enrollments(&self) -> Result<u64, Problem> {
        self.collection::<Enrollment>(ENROLLMENT_COLLECTION_NAME)
            .count_documents(None, None)
            .await
            .map_err(Problem::from)
    }

    async fn total_revenue(&self) -> Result<f64, Problem> {
        let pipeline = vec![doc! {
            "$group": { "_id": null, "revenue": { "$sum": "$amount" } }
        }];

        let mut rows = self
            .collection::<Payment>(PAYMENT_COLLECTION_NAME)
            .aggregate(pipeline, None)
            .await
            .map_err(Problem::from)?;

        match rows.next().await {
            Some(row) => {
                let row = row.map_err(Problem::from)?;
                Ok(row.get_f64("revenue").unwrap_or_default())
            }
            // No payments recorded yet.
            None => Ok(0.0),
        }
    }
}

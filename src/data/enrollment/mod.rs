use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod db;

/// Append-only ledger entry. Never updated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(
        rename = "_id",
        default = "Uuid::new_v4",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub class_id: Uuid,
    pub email: String,
    pub amount: f64,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(
        rename = "_id",
        default = "Uuid::new_v4",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub student_email: String,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub class_id: Uuid,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub enrolled_at: DateTime<Utc>,
    /// Transaction id of the payment this enrollment was created with,
    /// when the provider reported one.
    #[serde(default)]
    pub payment_info: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub class_id: Uuid,
    pub amount: f64,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl PaymentData {
    pub fn validate(&self) -> Result<(), crate::resp::problem::Problem> {
        if crate::payment::amount_to_cents(self.amount).is_none() {
            return Err(crate::resp::problem::Problem::validation(
                "Amount must be a positive number.",
            ));
        }
        if matches!(self.transaction_id.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(crate::resp::problem::Problem::validation(
                "Transaction id must not be blank.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecorded {
    pub payment_id: Uuid,
    pub enrollment_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub student_email: String,
    pub class_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub payment_info: Option<String>,
    pub review: Option<String>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        EnrollmentResponse {
            id: enrollment.id,
            student_email: enrollment.student_email,
            class_id: enrollment.class_id,
            enrolled_at: enrollment.enrolled_at,
            payment_info: enrollment.payment_info,
            review: enrollment.review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn data(amount: f64, transaction_id: Option<&str>) -> PaymentData {
        PaymentData {
            class_id: Uuid::new_v4(),
            amount,
            method: None,
            transaction_id: transaction_id.map(str::to_string),
        }
    }

    #[test]
    fn payment_without_transaction_id_is_accepted() {
        assert!(data(20.0, None).validate().is_ok());
        assert!(data(19.99, Some("tx_1")).validate().is_ok());
    }

    #[test]
    fn blank_transaction_id_is_rejected() {
        assert!(data(20.0, Some("   ")).validate().is_err());
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(data(0.0, Some("tx_1")).validate().is_err());
        assert!(data(-5.0, None).validate().is_err());
    }
}

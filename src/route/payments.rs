use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::IdentityClaims;
use crate::config::Config;
use crate::data::enrollment::db::EnrollmentsDbExt;
use crate::data::enrollment::{EnrollmentResponse, PaymentData, PaymentRecorded};
use crate::payment::{amount_to_cents, PaymentIntentProvider};
use crate::resp::problem::Problem;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IntentData {
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub client_secret: String,
}

/// Asks the payment provider for a client secret the frontend uses to
/// complete the card charge.
#[utoipa::path(
    request_body = IntentData,
    responses(
        (status = 200, description = "Opaque client secret", body = IntentResponse),
        (status = 400, description = "Non-positive amount", body = Problem),
        (status = 500, description = "Provider failure", body = Problem),
    ),
    security(("bearer" = []))
)]
#[post("/payments/intent", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(provider, config))]
pub async fn payment_intent(
    _auth: IdentityClaims,
    data: Json<IntentData>,
    provider: &State<Box<dyn PaymentIntentProvider>>,
    config: &State<Config>,
) -> Result<Json<IntentResponse>, Problem> {
    let cents = amount_to_cents(data.amount)
        .ok_or_else(|| Problem::validation("Amount must be a positive number."))?;

    let intent = provider.create_intent(cents, &config.currency).await?;
    Ok(Json(IntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// Records the completed purchase: a payment ledger entry plus the matching
/// enrollment. The charge itself is trusted as reported by the client.
#[utoipa::path(
    request_body = PaymentData,
    responses(
        (status = 200, description = "Ids of the recorded pair", body = PaymentRecorded),
        (status = 400, description = "Non-positive amount", body = Problem),
    ),
    security(("bearer" = []))
)]
#[post("/payments", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn payment_record(
    auth: IdentityClaims,
    data: Json<PaymentData>,
    db: &State<Database>,
) -> Result<Json<PaymentRecorded>, Problem> {
    let data = data.into_inner();
    data.validate()?;

    let recorded = db.record_payment(&auth.email, data).await?;
    Ok(Json(recorded))
}

#[utoipa::path(
    responses((status = 200, body = Vec<EnrollmentResponse>)),
    security(("bearer" = []))
)]
#[get("/enrollments?<email>")]
#[tracing::instrument(skip(db))]
pub async fn enrollment_list(
    auth: IdentityClaims,
    email: Option<String>,
    db: &State<Database>,
) -> Result<Json<Vec<EnrollmentResponse>>, Problem> {
    let email = email.unwrap_or_else(|| auth.email.clone());
    let enrollments = db.enrollments_for_student(&email).await?;
    Ok(Json(
        enrollments
            .into_iter()
            .map(EnrollmentResponse::from)
            .collect(),
    ))
}

use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::auth::IdentityClaims;
use crate::data::enrollment::db::EnrollmentsDbExt;
use crate::data::feedback::db::FeedbackDbExt;
use crate::data::feedback::{FeedbackData, FeedbackResponse};
use crate::resp::problem::Problem;

/// Leave feedback for a class, once per (class, student) pair. A successful
/// submission also fills the matching enrollment's review slot.
#[utoipa::path(
    request_body = FeedbackData,
    responses(
        (status = 200, description = "Stored feedback", body = FeedbackResponse),
        (status = 400, description = "Rating outside 1..=5", body = Problem),
        (status = 409, description = "Feedback already submitted", body = Problem),
    ),
    security(("bearer" = []))
)]
#[post("/feedback", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn feedback_submit(
    auth: IdentityClaims,
    data: Json<FeedbackData>,
    db: &State<Database>,
) -> Result<Json<FeedbackResponse>, Problem> {
    let data = data.into_inner();
    data.validate()?;

    let feedback = db.submit_feedback(&auth.email, data).await?;

    if !db
        .set_enrollment_review(feedback.class_id, &auth.email, &feedback.comment)
        .await?
    {
        // Feedback without an enrollment is allowed; nothing to annotate.
        tracing::debug!(
            "no open review slot for {} on class {}",
            auth.email,
            feedback.class_id
        );
    }

    Ok(Json(feedback.into()))
}

#[utoipa::path(
    responses((status = 200, body = Vec<FeedbackResponse>))
)]
#[get("/feedback?<class>")]
#[tracing::instrument(skip(db))]
pub async fn feedback_list(
    class: Option<Uuid>,
    db: &State<Database>,
) -> Result<Json<Vec<FeedbackResponse>>, Problem> {
    let feedback = db.list_feedback(class).await?;
    Ok(Json(
        feedback.into_iter().map(FeedbackResponse::from).collect(),
    ))
}

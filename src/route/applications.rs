use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::guard::AdminUser;
use crate::auth::IdentityClaims;
use crate::data::application::db::{problem as application_problem, ApplicationsDbExt};
use crate::data::application::{ApplicationData, ApplicationResponse, ApplicationStatus};
use crate::data::user::db::UsersDbExt;
use crate::middleware::paging::PageState;
use crate::resp::problem::Problem;
use crate::role::Role;

/// Apply to become a teacher. One active application per email: 409 while
/// one is pending or approved, re-application after a rejection resets the
/// same document to pending.
#[utoipa::path(
    request_body = ApplicationData,
    responses(
        (status = 200, description = "Submitted application", body = ApplicationResponse),
        (status = 409, description = "An application already exists", body = Problem),
    ),
    security(("bearer" = []))
)]
#[post("/teacher-requests", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn application_submit(
    auth: IdentityClaims,
    data: Json<ApplicationData>,
    db: &State<Database>,
) -> Result<Json<ApplicationResponse>, Problem> {
    let application = db
        .submit_application(&auth.email, data.into_inner())
        .await?;
    Ok(Json(application.into()))
}

#[utoipa::path(
    responses((status = 200, body = Vec<ApplicationResponse>)),
    security(("bearer" = []))
)]
#[get("/teacher-requests")]
#[tracing::instrument(skip(db))]
pub async fn application_list(
    _admin: AdminUser,
    page: PageState,
    db: &State<Database>,
) -> Result<Json<Vec<ApplicationResponse>>, Problem> {
    let applications = db.list_applications(page).await?;
    Ok(Json(
        applications
            .into_iter()
            .map(ApplicationResponse::from)
            .collect(),
    ))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusUpdateData {
    pub status: ApplicationStatus,
}

/// Resolve an application. Approval also promotes the applicant's account
/// to the teacher role.
#[utoipa::path(
    request_body = StatusUpdateData,
    params(("id", description = "application ID")),
    responses(
        (status = 200, description = "Resolved application", body = ApplicationResponse),
        (status = 400, description = "Status is not approved/rejected", body = Problem),
        (status = 404, description = "Application doesn't exist", body = Problem),
    ),
    security(("bearer" = []))
)]
#[patch("/teacher-requests/<id>/status", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn application_set_status(
    _admin: AdminUser,
    id: Uuid,
    data: Json<StatusUpdateData>,
    db: &State<Database>,
) -> Result<Json<ApplicationResponse>, Problem> {
    let status = data.status;
    if status == ApplicationStatus::Pending {
        return Err(Problem::validation(
            "Applications can only be resolved to 'approved' or 'rejected'.",
        ));
    }

    let application = db
        .set_application_status(id, status)
        .await?
        .ok_or_else(|| application_problem::not_found(id))?;

    if status == ApplicationStatus::Approved {
        // Second write, not transactional with the first.
        db.set_user_role(&application.email, Role::Teacher).await?;
        tracing::info!("promoted {} to teacher", application.email);
    }

    Ok(Json(application.into()))
}

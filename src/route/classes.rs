use chrono::Utc;
use mongodb::Database;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::guard::{AdminUser, TeacherUser};
use crate::auth::IdentityClaims;
use crate::data::class::db::ClassesDbExt;
use crate::data::class::{
    AssignmentResponse, Class, ClassCreateData, ClassResponse, ClassStatus, ClassUpdateData,
    EnrolledClassResponse, Submission,
};
use crate::middleware::paging::PageState;
use crate::resp::problem::Problem;

pub mod problem {
    use crate::resp::problem::Problem;

    #[inline]
    pub fn not_found(id: uuid::Uuid) -> Problem {
        Problem::not_found("Class doesn't exist.")
            .insert_str("id", id)
            .clone()
    }

    #[inline]
    pub fn not_owner() -> Problem {
        Problem::forbidden("Class is owned by another teacher.")
    }
}

/// Fetches a class and enforces that `email` owns it.
async fn owned_class(db: &Database, id: Uuid, email: &str) -> Result<Class, Problem> {
    let class = db.find_class(id).await?.ok_or_else(|| problem::not_found(id))?;
    if class.teacher_email != email {
        return Err(problem::not_owner());
    }
    Ok(class)
}

/// New classes always start out pending admin review.
#[utoipa::path(
    request_body = ClassCreateData,
    responses(
        (status = 200, description = "Created class", body = ClassResponse),
        (status = 403, description = "Caller is not a teacher", body = Problem),
    ),
    security(("bearer" = []))
)]
#[post("/classes", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn class_create(
    teacher: TeacherUser,
    data: Json<ClassCreateData>,
    db: &State<Database>,
) -> Result<Json<ClassResponse>, Problem> {
    let data = data.into_inner();
    if data.price < 0.0 || !data.price.is_finite() {
        return Err(Problem::validation("Price must be a non-negative number."));
    }
    if data.title.trim().is_empty() {
        return Err(Problem::validation("Title is required."));
    }

    let class = db.create_class(&teacher.claims.email, data).await?;
    Ok(Json(class.into()))
}

#[utoipa::path(
    responses((status = 200, body = Vec<ClassResponse>)),
    security(("bearer" = []))
)]
#[get("/classes")]
#[tracing::instrument(skip(db))]
pub async fn class_list(
    _admin: AdminUser,
    page: PageState,
    db: &State<Database>,
) -> Result<Json<Vec<ClassResponse>>, Problem> {
    let classes = db.list_classes(page).await?;
    Ok(Json(classes.into_iter().map(ClassResponse::from).collect()))
}

#[utoipa::path(
    responses((status = 200, body = Vec<ClassResponse>)),
    security(("bearer" = []))
)]
#[get("/classes/mine")]
#[tracing::instrument(skip(db))]
pub async fn class_list_mine(
    teacher: TeacherUser,
    db: &State<Database>,
) -> Result<Json<Vec<ClassResponse>>, Problem> {
    let classes = db.list_classes_by_teacher(&teacher.claims.email).await?;
    Ok(Json(classes.into_iter().map(ClassResponse::from).collect()))
}

/// Public single-class view; anything not yet approved stays invisible.
#[utoipa::path(
    params(("id", description = "class ID")),
    responses(
        (status = 200, body = ClassResponse),
        (status = 404, description = "Class doesn't exist or isn't approved"),
    )
)]
#[get("/classes/<id>")]
#[tracing::instrument(skip(db))]
pub async fn class_get(id: Uuid, db: &State<Database>) -> Result<Json<ClassResponse>, Problem> {
    let class = db.find_class(id).await?.ok_or_else(|| problem::not_found(id))?;
    if class.status != ClassStatus::Approved {
        return Err(problem::not_found(id));
    }
    Ok(Json(class.into()))
}

#[utoipa::path(
    request_body = ClassUpdateData,
    params(("id", description = "class ID")),
    responses(
        (status = 200, description = "Updated class", body = ClassResponse),
        (status = 403, description = "Class belongs to another teacher", body = Problem),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("bearer" = []))
)]
#[put("/classes/<id>", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn class_update(
    teacher: TeacherUser,
    id: Uuid,
    data: Json<ClassUpdateData>,
    db: &State<Database>,
) -> Result<Json<ClassResponse>, Problem> {
    let data = data.into_inner();
    if data.title.is_none() && data.price.is_none() && data.description.is_none() {
        return Err(Problem::validation("Update carries no fields."));
    }
    if matches!(data.price, Some(p) if p < 0.0 || !p.is_finite()) {
        return Err(Problem::validation("Price must be a non-negative number."));
    }

    owned_class(db, id, &teacher.claims.email).await?;
    db.update_class_info(id, data).await?;

    let updated = db.find_class(id).await?.ok_or_else(|| problem::not_found(id))?;
    Ok(Json(updated.into()))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClassStatusData {
    pub status: ClassStatus,
}

#[utoipa::path(
    request_body = ClassStatusData,
    params(("id", description = "class ID")),
    responses(
        (status = 200, description = "Class with updated status", body = ClassResponse),
        (status = 400, description = "Status is not approved/rejected", body = Problem),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("bearer" = []))
)]
#[patch("/classes/<id>/status", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn class_set_status(
    _admin: AdminUser,
    id: Uuid,
    data: Json<ClassStatusData>,
    db: &State<Database>,
) -> Result<Json<ClassResponse>, Problem> {
    if data.status == ClassStatus::Pending {
        return Err(Problem::validation(
            "Classes can only be resolved to 'approved' or 'rejected'.",
        ));
    }

    db.set_class_status(id, data.status)
        .await?
        .map(|class| Json(class.into()))
        .ok_or_else(|| problem::not_found(id))
}

/// Approved classes with their enrollment totals, joined by the store.
#[utoipa::path(
    responses((status = 200, body = Vec<EnrolledClassResponse>))
)]
#[get("/approved-classes")]
#[tracing::instrument(skip(db))]
pub async fn approved_classes(
    db: &State<Database>,
) -> Result<Json<Vec<EnrolledClassResponse>>, Problem> {
    let classes = db.list_approved_classes().await?;
    Ok(Json(
        classes.into_iter().map(EnrolledClassResponse::from).collect(),
    ))
}

/// The six most enrolled approved classes.
#[utoipa::path(
    responses((status = 200, body = Vec<EnrolledClassResponse>))
)]
#[get("/popular-classes")]
#[tracing::instrument(skip(db))]
pub async fn popular_classes(
    db: &State<Database>,
) -> Result<Json<Vec<EnrolledClassResponse>>, Problem> {
    let classes = db.list_popular_classes().await?;
    Ok(Json(
        classes.into_iter().map(EnrolledClassResponse::from).collect(),
    ))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssignmentCreateData {
    pub content: String,
}

#[utoipa::path(
    request_body = AssignmentCreateData,
    params(("id", description = "class ID")),
    responses(
        (status = 201, description = "Assignment appended"),
        (status = 403, description = "Class belongs to another teacher", body = Problem),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("bearer" = []))
)]
#[post("/classes/<id>/assignments", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn assignment_create(
    teacher: TeacherUser,
    id: Uuid,
    data: Json<AssignmentCreateData>,
    db: &State<Database>,
) -> Result<Status, Problem> {
    if data.content.trim().is_empty() {
        return Err(Problem::validation("Assignment content is required."));
    }

    owned_class(db, id, &teacher.claims.email).await?;

    if !db.push_assignment(id, &data.content).await? {
        return Err(problem::not_found(id));
    }
    Ok(Status::Created)
}

#[utoipa::path(
    params(("id", description = "class ID")),
    responses(
        (status = 200, body = Vec<AssignmentResponse>),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("bearer" = []))
)]
#[get("/classes/<id>/assignments")]
#[tracing::instrument(skip(db))]
pub async fn assignment_list(
    _auth: IdentityClaims,
    id: Uuid,
    db: &State<Database>,
) -> Result<Json<Vec<AssignmentResponse>>, Problem> {
    let class = db.find_class(id).await?.ok_or_else(|| problem::not_found(id))?;

    Ok(Json(
        class
            .assignments
            .into_iter()
            .enumerate()
            .map(|(index, a)| AssignmentResponse {
                index,
                content: a.content,
                submission_count: a.submission_count,
                created_at: a.created_at,
            })
            .collect(),
    ))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmissionData {
    pub content: String,
}

/// Hand work in against an assignment; appends the submission and bumps the
/// per-assignment counter in one store update.
#[utoipa::path(
    request_body = SubmissionData,
    params(
        ("id", description = "class ID"),
        ("index", description = "zero-based assignment index"),
    ),
    responses(
        (status = 201, description = "Submission recorded"),
        (status = 404, description = "Class or assignment doesn't exist", body = Problem),
    ),
    security(("bearer" = []))
)]
#[post(
    "/classes/<id>/assignments/<index>/submit",
    format = "application/json",
    data = "<data>"
)]
#[tracing::instrument(skip(db))]
pub async fn assignment_submit(
    auth: IdentityClaims,
    id: Uuid,
    index: usize,
    data: Json<SubmissionData>,
    db: &State<Database>,
) -> Result<Status, Problem> {
    let submission = Submission {
        student_email: auth.email.clone(),
        content: data.into_inner().content,
        submitted_at: Utc::now(),
    };

    if !db.push_submission(id, index, submission).await? {
        return Err(Problem::not_found("Class or assignment doesn't exist.")
            .insert_str("id", id)
            .insert("index", index)
            .clone());
    }
    Ok(Status::Created)
}

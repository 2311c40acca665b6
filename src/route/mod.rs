use std::collections::BTreeMap;

use rocket::http::Status;
use rocket::{Build, Rocket, Route};

pub mod applications;
pub mod classes;
pub mod feedback;
pub mod payments;
pub mod stats;
pub mod users;

use applications::*;
use classes::*;
use feedback::*;
use payments::*;
use stats::*;
use users::*;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::doc::BearerAuth,
    data::{application as ad, class as cd, enrollment as ed, feedback as fd, user::UserResponse},
    resp::problem::Problem,
    role::Role,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        user_upsert,
        user_list,
        user_role,
        user_set_role,
        application_submit,
        application_list,
        application_set_status,
        class_create,
        class_list,
        class_list_mine,
        class_get,
        class_update,
        class_set_status,
        approved_classes,
        popular_classes,
        assignment_create,
        assignment_list,
        assignment_submit,
        payment_intent,
        payment_record,
        enrollment_list,
        feedback_submit,
        feedback_list,
        admin_stats,
    ),
    components(schemas(
        Role,
        Problem,
        UserResponse,
        UserUpsertData,
        RoleResponse,
        RoleUpdateData,
        ad::ApplicationData,
        ad::ApplicationResponse,
        ad::ApplicationStatus,
        StatusUpdateData,
        cd::ClassStatus,
        cd::ClassCreateData,
        cd::ClassUpdateData,
        cd::ClassResponse,
        cd::EnrolledClassResponse,
        cd::AssignmentResponse,
        ClassStatusData,
        AssignmentCreateData,
        SubmissionData,
        ed::PaymentData,
        ed::PaymentRecorded,
        ed::EnrollmentResponse,
        IntentData,
        IntentResponse,
        fd::FeedbackData,
        fd::FeedbackResponse,
        AdminStats,
    )),
    modifiers(&BearerAuth, &V1_PREFIX)
)]
pub struct ApiDocV1;

pub struct PathPrefix(pub &'static str);
static V1_PREFIX: PathPrefix = PathPrefix("/api/v1");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

pub fn api_v1() -> Vec<Route> {
    routes![
        user_upsert,
        user_list,
        user_role,
        user_set_role,
        application_submit,
        application_list,
        application_set_status,
        class_create,
        class_list,
        class_list_mine,
        class_get,
        class_update,
        class_set_status,
        approved_classes,
        popular_classes,
        assignment_create,
        assignment_list,
        assignment_submit,
        payment_intent,
        payment_record,
        enrollment_list,
        feedback_submit,
        feedback_list,
        admin_stats,
    ]
}

// Guard rejections and body parse failures pass through these so every
// error keeps the JSON `message` contract.
#[catch(400)]
fn bad_request() -> Problem {
    Problem::validation("Request is malformed.")
}

#[catch(401)]
fn unauthorized() -> Problem {
    Problem::unauthenticated("Authentication required.")
}

#[catch(403)]
fn access_forbidden() -> Problem {
    Problem::forbidden("Insufficient permissions.")
}

#[catch(404)]
fn resource_not_found() -> Problem {
    Problem::not_found("Resource doesn't exist.")
}

#[catch(422)]
fn unprocessable() -> Problem {
    Problem::validation("Request body is malformed.")
}

#[catch(default)]
fn fallback(status: Status, _: &rocket::Request<'_>) -> Problem {
    Problem::new(status, "Unable to process request.")
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api/v1", api_v1())
        .mount(
            "/",
            SwaggerUi::new("/swagger/<_..>").url("/api/v1/openapi.json", ApiDocV1::openapi()),
        )
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                access_forbidden,
                resource_not_found,
                unprocessable,
                fallback
            ],
        )
}

use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::guard::AdminUser;
use crate::auth::IdentityClaims;
use crate::data::user::db::UsersDbExt;
use crate::data::user::UserResponse;
use crate::middleware::paging::PageState;
use crate::resp::problem::Problem;
use crate::role::Role;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserUpsertData {
    #[serde(default)]
    pub name: Option<String>,
}

/// Upsert-on-login. The document is keyed by the verified claim's email,
/// never by anything the client puts in the body.
#[utoipa::path(
    request_body = UserUpsertData,
    responses(
        (status = 200, description = "Created or refreshed account", body = UserResponse),
        (status = 401, description = "Missing/invalid bearer token", body = Problem),
    ),
    security(("bearer" = []))
)]
#[post("/users", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn user_upsert(
    auth: IdentityClaims,
    data: Json<UserUpsertData>,
    db: &State<Database>,
) -> Result<Json<UserResponse>, Problem> {
    let name = data.into_inner().name.or_else(|| auth.name.clone());
    let user = db.upsert_on_login(&auth.email, name.as_deref()).await?;
    Ok(Json(user.into()))
}

/// List accounts, optionally narrowed by a partial name/email match.
#[utoipa::path(
    responses(
        (status = 200, description = "Account list", body = Vec<UserResponse>),
        (status = 403, description = "Caller is not an admin", body = Problem),
    ),
    security(("bearer" = []))
)]
#[get("/users?<search>")]
#[tracing::instrument(skip(db))]
pub async fn user_list(
    _admin: AdminUser,
    page: PageState,
    search: Option<String>,
    db: &State<Database>,
) -> Result<Json<Vec<UserResponse>>, Problem> {
    let users = db.list_users(search.as_deref(), page).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleResponse {
    pub role: Role,
}

/// The caller's stored role; `unset` until an admin or an approved teacher
/// application says otherwise.
#[utoipa::path(
    responses((status = 200, body = RoleResponse)),
    security(("bearer" = []))
)]
#[get("/users/role")]
#[tracing::instrument(skip(db))]
pub async fn user_role(
    auth: IdentityClaims,
    db: &State<Database>,
) -> Result<Json<RoleResponse>, Problem> {
    let role = db
        .find_user_by_email(&auth.email)
        .await?
        .map(|u| u.role)
        .unwrap_or_default();

    Ok(Json(RoleResponse { role }))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RoleUpdateData {
    pub role: Role,
}

#[utoipa::path(
    request_body = RoleUpdateData,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 404, description = "No account for that email", body = Problem),
    ),
    security(("bearer" = []))
)]
#[patch("/users/<email>/role", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn user_set_role(
    _admin: AdminUser,
    email: String,
    data: Json<RoleUpdateData>,
    db: &State<Database>,
) -> Result<Json<UserResponse>, Problem> {
    db.set_user_role(&email, data.role)
        .await?
        .map(|user| Json(user.into()))
        .ok_or_else(|| {
            Problem::not_found("User doesn't exist.")
                .insert_str("email", &email)
                .clone()
        })
}

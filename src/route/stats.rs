use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::guard::AdminUser;
use crate::data::class::db::ClassesDbExt;
use crate::data::enrollment::db::EnrollmentsDbExt;
use crate::data::user::db::UsersDbExt;
use crate::resp::problem::Problem;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: u64,
    pub classes: u64,
    pub enrollments: u64,
    pub revenue: f64,
}

/// Dashboard counters. The revenue sum runs inside the store.
#[utoipa::path(
    responses(
        (status = 200, body = AdminStats),
        (status = 403, description = "Caller is not an admin", body = Problem),
    ),
    security(("bearer" = []))
)]
#[get("/admin/stats")]
#[tracing::instrument(skip(db))]
pub async fn admin_stats(
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<AdminStats>, Problem> {
    Ok(Json(AdminStats {
        users: db.count_users().await?,
        classes: db.count_classes().await?,
        enrollments: db.count_enrollments().await?,
        revenue: db.total_revenue().await?,
    }))
}

use mongodb::Database;
use rocket::http::Status;
use rocket::outcome::Outcome::{Error, Forward, Success};
use rocket::request::{self, FromRequest, Request};

use crate::auth::{AuthError, IdentityClaims, IdentityVerifier};
use crate::data::user::db::UsersDbExt;
use crate::data::user::User;
use crate::resp::problem::Problem;
use crate::role::Role;

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("Bearer").filter(|rest| rest.is_empty()))
        .ok_or(AuthError::MalformedHeader)?;

    if token.trim().is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token.trim())
}

/// Authentication gate: header extraction plus verification against the
/// external identity verifier. Never touches the role store.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for IdentityClaims {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match parse_bearer(req.headers().get_one("Authorization")) {
            Ok(it) => it,
            Err(e) => {
                tracing::debug!("rejecting request: {}", e);
                return Error((Status::Unauthorized, e.into()));
            }
        };

        let verifier: &Box<dyn IdentityVerifier> = match req.rocket().state() {
            Some(it) => it,
            None => {
                return Error((
                    Status::InternalServerError,
                    Problem::internal("Identity verifier is not configured."),
                ));
            }
        };

        match verifier.verify(token).await {
            Ok(claims) => {
                tracing::debug!("verified identity claim for {}", claims.email);
                Success(claims)
            }
            Err(e) => Error((Status::Unauthorized, e.into())),
        }
    }
}

/// The slice of the store the role gate reads. A trait for the same reason
/// the identity verifier is one: tests drive the real role comparison
/// against a substitute store.
#[rocket::async_trait]
pub trait RoleStore: Send + Sync {
    async fn user_for_email(&self, email: &str) -> Result<Option<User>, Problem>;
}

#[rocket::async_trait]
impl RoleStore for Database {
    async fn user_for_email(&self, email: &str) -> Result<Option<User>, Problem> {
        self.find_user_by_email(email).await
    }
}

/// Authorization gate: runs after the authentication gate and checks the
/// stored role for the claimed email against `required`. A store failure is
/// surfaced as 500, distinct from the 403 authorization failures.
async fn require_role(
    req: &Request<'_>,
    required: Role,
) -> Result<(IdentityClaims, User), (Status, Problem)> {
    let claims = match req.guard::<IdentityClaims>().await {
        Success(it) => it,
        Error(e) => return Err(e),
        // Wiring error: the role gate depends on the authentication gate.
        Forward(_) => {
            return Err((
                Status::Forbidden,
                Problem::forbidden("Request carries no verified identity."),
            ));
        }
    };

    let store: &Box<dyn RoleStore> = req.rocket().state().ok_or_else(|| {
        (
            Status::InternalServerError,
            Problem::internal("Role store is not configured."),
        )
    })?;

    let user = store
        .user_for_email(&claims.email)
        .await
        .map_err(|p| (Status::InternalServerError, p))?
        .ok_or_else(|| {
            (
                Status::Forbidden,
                Problem::forbidden("No account exists for the authenticated email."),
            )
        })?;

    if user.role != required {
        tracing::debug!(
            "denying {}: has role '{}', route requires '{}'",
            claims.email,
            user.role,
            required
        );
        return Err((
            Status::Forbidden,
            Problem::forbidden(format!("Route requires the '{}' role.", required)),
        ));
    }

    Ok((claims, user))
}

#[derive(Debug, Clone)]
pub struct AdminUser {
    pub claims: IdentityClaims,
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match require_role(req, Role::Admin).await {
            Ok((claims, user)) => Success(AdminUser { claims, user }),
            Err(e) => Error(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TeacherUser {
    pub claims: IdentityClaims,
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TeacherUser {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match require_role(req, Role::Teacher).await {
            Ok((claims, user)) => Success(TeacherUser { claims, user }),
            Err(e) => Error(e),
        }
    }
}

///////////////////////
//       TESTS
///////////////////////

#[cfg(test)]
mod bearer_parsing {
    use super::*;

    #[test]
    fn missing_header_is_rejected() {
        assert!(matches!(parse_bearer(None), Err(AuthError::MissingHeader)));
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        assert!(matches!(
            parse_bearer(Some("Basic dXNlcjpwdw==")),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            parse_bearer(Some("Bearer")),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            parse_bearer(Some("Bearer   ")),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn token_is_extracted() {
        assert_eq!(parse_bearer(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }
}

#[cfg(test)]
mod gate_behavior {
    use chrono::{Duration, Utc};
    use rocket::http::{Header, Status};
    use rocket::local::asynchronous::Client;
    use rocket::serde::json::Json;

    use uuid::Uuid;

    use crate::auth::guard::{AdminUser, RoleStore};
    use crate::auth::{AuthError, IdentityClaims, IdentityVerifier};
    use crate::data::user::User;
    use crate::resp::problem::Problem;
    use crate::role::Role;

    /// Accepts a fixed set of tokens; everything else fails verification.
    struct FakeVerifier;

    static GOOD_TOKEN: &str = "good-token";
    static ADMIN_TOKEN: &str = "admin-token";
    static GHOST_TOKEN: &str = "ghost-token";

    #[rocket::async_trait]
    impl IdentityVerifier for FakeVerifier {
        async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
            let email = match token {
                t if t == GOOD_TOKEN => "s@x.com",
                t if t == ADMIN_TOKEN => "a@x.com",
                t if t == GHOST_TOKEN => "ghost@x.com",
                _ => return Err(AuthError::Verification("unknown token".to_string())),
            };

            let now = Utc::now();
            Ok(IdentityClaims {
                email: email.to_string(),
                name: None,
                iat: now,
                exp: now + Duration::hours(1),
            })
        }
    }

    /// Knows one student and one admin; every other email is unregistered.
    struct FakeRoleStore;

    #[rocket::async_trait]
    impl RoleStore for FakeRoleStore {
        async fn user_for_email(&self, email: &str) -> Result<Option<User>, Problem> {
            let role = match email {
                "s@x.com" => Role::Student,
                "a@x.com" => Role::Admin,
                _ => return Ok(None),
            };

            let now = Utc::now();
            Ok(Some(User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                name: None,
                role,
                created_at: now,
                last_login: now,
            }))
        }
    }

    #[get("/whoami")]
    fn whoami(auth: IdentityClaims) -> Json<String> {
        Json(auth.email)
    }

    #[get("/admin-ping")]
    fn admin_ping(_admin: AdminUser) -> &'static str {
        "pong"
    }

    async fn test_client() -> Client {
        let rocket = rocket::build()
            .manage(Box::new(FakeVerifier) as Box<dyn IdentityVerifier>)
            .mount("/", routes![whoami, admin_ping]);
        Client::tracked(rocket).await.expect("invalid test rocket")
    }

    async fn test_client_with_store() -> Client {
        let rocket = rocket::build()
            .manage(Box::new(FakeVerifier) as Box<dyn IdentityVerifier>)
            .manage(Box::new(FakeRoleStore) as Box<dyn RoleStore>)
            .mount("/", routes![whoami, admin_ping]);
        Client::tracked(rocket).await.expect("invalid test rocket")
    }

    #[rocket::async_test]
    async fn missing_token_is_unauthenticated() {
        let client = test_client().await;
        let response = client.get("/whoami").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn malformed_header_is_unauthenticated() {
        let client = test_client().await;
        let response = client
            .get("/whoami")
            .header(Header::new("Authorization", "Token abc"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn rejected_token_is_unauthenticated() {
        let client = test_client().await;
        let response = client
            .get("/whoami")
            .header(Header::new("Authorization", "Bearer bad-token"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn verified_token_reaches_handler() {
        let client = test_client().await;
        let response = client
            .get("/whoami")
            .header(Header::new("Authorization", format!("Bearer {}", GOOD_TOKEN)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let email: String = response.into_json().await.expect("invalid response json");
        assert_eq!(email, "s@x.com");
    }

    #[rocket::async_test]
    async fn role_gate_without_token_is_unauthenticated() {
        // The authentication gate runs first, so its failure wins.
        let client = test_client().await;
        let response = client.get("/admin-ping").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn role_gate_without_store_is_internal_error() {
        let client = test_client().await;
        let response = client
            .get("/admin-ping")
            .header(Header::new("Authorization", format!("Bearer {}", GOOD_TOKEN)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::InternalServerError);
    }

    #[rocket::async_test]
    async fn wrong_role_is_forbidden() {
        // Verified student identity against an admin-only route.
        let client = test_client_with_store().await;
        let response = client
            .get("/admin-ping")
            .header(Header::new("Authorization", format!("Bearer {}", GOOD_TOKEN)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn unregistered_email_is_forbidden() {
        let client = test_client_with_store().await;
        let response = client
            .get("/admin-ping")
            .header(Header::new("Authorization", format!("Bearer {}", GHOST_TOKEN)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn matching_role_passes_the_gate() {
        let client = test_client_with_store().await;
        let response = client
            .get("/admin-ping")
            .header(Header::new("Authorization", format!("Bearer {}", ADMIN_TOKEN)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.as_deref(), Some("pong"));
    }
}

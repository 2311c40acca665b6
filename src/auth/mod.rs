use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resp::problem::Problem;

pub mod guard;

pub mod date_time_as_unix_seconds {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(date.timestamp())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let seconds = i64::deserialize(d)?;
        Utc.timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}

/// Verified identity attached to a request by the authentication gate.
/// The email is the key used for all role lookups; it is trusted verbatim
/// from the token issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(with = "date_time_as_unix_seconds")]
    pub iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    pub exp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("Authorization header is not a bearer credential")]
    MalformedHeader,
    #[error("bearer credential carries no token")]
    MissingToken,
    #[error("token verification failed: {0}")]
    Verification(String),
}

impl From<AuthError> for Problem {
    fn from(e: AuthError) -> Self {
        Problem::unauthenticated("Unable to authenticate request.")
            .detail(e)
            .clone()
    }
}

/// External trust root for "who are you". Kept behind a trait so tests can
/// substitute a fake verifier while exercising real role logic.
#[rocket::async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError>;
}

/// Verifies tokens minted by the external issuer with a shared HS256 secret.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> JwtVerifier {
        JwtVerifier {
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[rocket::async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("token verification failed: {}", e);
                AuthError::Verification(e.to_string())
            })
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    #[derive(Clone, Copy)]
    pub struct BearerAuth;

    impl From<BearerAuth> for SecurityScheme {
        fn from(_: BearerAuth) -> SecurityScheme {
            let mut http = Http::new(HttpAuthScheme::Bearer);
            http.bearer_format = Some("JWT".to_string());
            SecurityScheme::Http(http)
        }
    }

    impl utoipa::Modify for BearerAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            let c = openapi.components.as_mut().unwrap();
            c.add_security_scheme("bearer", *self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn issue(secret: &str, email: &str, lifetime: Duration) -> String {
        let now = Utc::now();
        let claims = IdentityClaims {
            email: email.to_string(),
            name: Some("Test User".to_string()),
            iat: now,
            exp: now + lifetime,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encoding example claims should work")
    }

    #[rocket::async_test]
    async fn valid_token_yields_claims() {
        let verifier = JwtVerifier::new("test-secret");
        let token = issue("test-secret", "s@x.com", Duration::hours(1));

        let claims = verifier.verify(&token).await.expect("token should verify");
        assert_eq!(claims.email, "s@x.com");
        assert_eq!(claims.name.as_deref(), Some("Test User"));
    }

    #[rocket::async_test]
    async fn wrong_secret_fails_verification() {
        let verifier = JwtVerifier::new("test-secret");
        let token = issue("other-secret", "s@x.com", Duration::hours(1));

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::Verification(_))
        ));
    }

    #[rocket::async_test]
    async fn expired_token_fails_verification() {
        let verifier = JwtVerifier::new("test-secret");
        // Outside the default decode leeway.
        let token = issue("test-secret", "s@x.com", Duration::minutes(-10));

        assert!(verifier.verify(&token).await.is_err());
    }

    #[rocket::async_test]
    async fn garbage_token_fails_verification() {
        let verifier = JwtVerifier::new("test-secret");
        assert!(verifier.verify("not-a-jwt").await.is_err());
    }
}

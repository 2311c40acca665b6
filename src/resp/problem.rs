use std::io::Cursor;

use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;

/// Error response body shared by every endpoint: a human-readable `message`
/// plus the status code, with optional extra fields. Internal store errors
/// are mapped onto this type and never forwarded to clients verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Problem {
    #[serde(skip, default = "default_status")]
    pub status: Status,
    pub message: String,
    pub detail: Option<String>,

    #[schema(value_type = Object)]
    pub body: Map<String, Value>,
}

fn default_status() -> Status {
    Status::InternalServerError
}

impl Default for Problem {
    fn default() -> Self {
        Problem {
            status: Status::InternalServerError,
            message: "Problem".to_string(),
            detail: None,
            body: Map::new(),
        }
    }
}

impl Problem {
    pub fn new(status: Status, message: impl ToString) -> Problem {
        Problem {
            status,
            message: message.to_string(),
            ..Default::default()
        }
    }

    pub fn validation(message: impl ToString) -> Problem {
        Problem::new(Status::BadRequest, message)
    }

    pub fn unauthenticated(message: impl ToString) -> Problem {
        Problem::new(Status::Unauthorized, message)
    }

    pub fn forbidden(message: impl ToString) -> Problem {
        Problem::new(Status::Forbidden, message)
    }

    pub fn not_found(message: impl ToString) -> Problem {
        Problem::new(Status::NotFound, message)
    }

    pub fn conflict(message: impl ToString) -> Problem {
        Problem::new(Status::Conflict, message)
    }

    pub fn internal(message: impl ToString) -> Problem {
        Problem::new(Status::InternalServerError, message)
    }

    pub fn detail(&mut self, value: impl ToString) -> &mut Problem {
        self.detail = Some(value.to_string());
        self
    }

    pub fn insert<V: Serialize>(&mut self, key: impl ToString, value: V) -> &mut Problem {
        self.body.insert(
            key.to_string(),
            serde_json::to_value(value).expect("data must be JSON serializable"),
        );
        self
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn response_body(&self) -> Map<String, Value> {
        let mut body = self.body.clone();
        body.insert(String::from("message"), Value::from(self.message.clone()));
        body.insert(String::from("status"), Value::from(self.status.code));
        if let Some(detail) = &self.detail {
            body.insert(String::from("detail"), Value::from(detail.clone()));
        }
        body
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body_string = serde_json::to_string(&self.response_body())
            .expect("JSON map keys and values must be JSON serializable");

        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

impl From<mongodb::error::Error> for Problem {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        // Store failures surface as 500 without leaking driver error detail.
        let message = match e.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Authentication { .. } => "Server was unable to access the document store.",
            ErrorKind::Write(_) | ErrorKind::Io(_) => {
                "A write error occurred. Submitted data might not be properly stored."
            }
            _ => "Document store failed while processing request.",
        };

        tracing::error!("mongodb error: {}", e);
        Problem::internal(message)
    }
}

impl From<bson::de::Error> for Problem {
    fn from(e: bson::de::Error) -> Self {
        tracing::error!("bson decode error: {}", e);
        Problem::internal("An error occurred while processing stored data.")
    }
}

impl From<bson::ser::Error> for Problem {
    fn from(e: bson::ser::Error) -> Self {
        tracing::error!("bson encode error: {}", e);
        Problem::internal("An error occurred while processing stored data.")
    }
}

impl From<serde_json::Error> for Problem {
    fn from(_: serde_json::Error) -> Self {
        Problem::internal("An error occurred while processing JSON data.")
    }
}

impl From<jsonwebtoken::errors::Error> for Problem {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.into_kind() {
            ErrorKind::ExpiredSignature => Problem::unauthenticated("Expired bearer token."),
            _ => Problem::unauthenticated("Invalid bearer token."),
        }
    }
}

impl From<reqwest::Error> for Problem {
    fn from(e: reqwest::Error) -> Self {
        tracing::error!("payment provider error: {}", e);
        Problem::internal("Payment provider request failed.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_body_carries_message_and_status() {
        let problem = Problem::conflict("Feedback already submitted.")
            .insert_str("classId", "c1")
            .clone();

        let body = problem.response_body();
        assert_eq!(body["message"], "Feedback already submitted.");
        assert_eq!(body["status"], 409);
        assert_eq!(body["classId"], "c1");
    }

    #[test]
    fn taxonomy_constructors_map_to_expected_status() {
        assert_eq!(Problem::validation("m").status, Status::BadRequest);
        assert_eq!(Problem::unauthenticated("m").status, Status::Unauthorized);
        assert_eq!(Problem::forbidden("m").status, Status::Forbidden);
        assert_eq!(Problem::not_found("m").status, Status::NotFound);
        assert_eq!(Problem::conflict("m").status, Status::Conflict);
        assert_eq!(Problem::internal("m").status, Status::InternalServerError);
    }

    #[test]
    fn expired_token_maps_to_unauthenticated() {
        let err = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::ExpiredSignature,
        );
        assert_eq!(Problem::from(err).status, Status::Unauthorized);
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of marketplace roles. Stored on the user document as a plain
/// lowercase string; comparison is exact, there is no role hierarchy.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Unset,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Unset => "unset",
        }
    }
}

impl std::default::Default for Role {
    fn default() -> Self {
        Role::Unset
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "unset" => Ok(Role::Unset),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn roles_serialize_as_lowercase_strings() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        assert_eq!(serde_json::to_string(&Role::Unset).unwrap(), "\"unset\"");
    }

    #[test]
    fn role_parsing_is_case_sensitive() {
        assert_eq!(Role::from_str("teacher"), Ok(Role::Teacher));
        assert!(Role::from_str("Teacher").is_err());
        assert!(Role::from_str("ADMIN").is_err());
    }

    #[test]
    fn unknown_role_strings_are_rejected() {
        assert!(serde_json::from_str::<Role>("\"moderator\"").is_err());
    }
}

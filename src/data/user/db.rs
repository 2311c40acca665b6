use bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::data::filter;
use crate::middleware::paging::PageState;
use crate::resp::problem::Problem;
use crate::role::Role;

use super::User;

pub static USER_COLLECTION_NAME: &str = "users";

/// Update document for the login upsert: `name` and `lastLogin` are
/// refreshed on every call, everything else only on first contact.
pub fn login_upsert(email: &str, name: Option<&str>, now: bson::DateTime) -> Document {
    doc! {
        "$set": {
            "name": name,
            "lastLogin": now,
        },
        "$setOnInsert": {
            "_id": filter::uuid_bson(Uuid::new_v4()),
            "email": email,
            "role": Role::Unset.as_str(),
            "createdAt": now,
        },
    }
}

pub trait UsersDbExt {
    async fn upsert_on_login(&self, email: &str, name: Option<&str>) -> Result<User, Problem>;

    async fn find_user_by_email(&self, email: impl AsRef<str> + Send)
        -> Result<Option<User>, Problem>;

    async fn list_users(
        &self,
        search: Option<&str>,
        page: PageState,
    ) -> Result<Vec<User>, Problem>;

    async fn set_user_role(&self, email: &str, role: Role) -> Result<Option<User>, Problem>;

    async fn count_users(&self) -> Result<u64, Problem>;
}

impl UsersDbExt for Database {
    async fn upsert_on_login(&self, email: &str, name: Option<&str>) -> Result<User, Problem> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        self.collection::<User>(USER_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_email(email),
                login_upsert(email, name, bson::DateTime::now()),
                options,
            )
            .await
            .map_err(Problem::from)?
            .ok_or_else(|| Problem::internal("Login upsert returned no document."))
    }

    async fn find_user_by_email(
        &self,
        email: impl AsRef<str> + Send,
    ) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::by_email(email), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_users(
        &self,
        search: Option<&str>,
        page: PageState,
    ) -> Result<Vec<User>, Problem> {
        // Partial matching is delegated to the store's regex support.
        let query = search.map(|s| {
            doc! {
                "$or": [
                    { "name": { "$regex": s, "$options": "i" } },
                    { "email": { "$regex": s, "$options": "i" } },
                ]
            }
        });

        self.collection::<User>(USER_COLLECTION_NAME)
            .find(query, FindOptions::from(page))
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn set_user_role(&self, email: &str, role: Role) -> Result<Option<User>, Problem> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection::<User>(USER_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_email(email),
                doc! { "$set": { "role": role.as_str() } },
                options,
            )
            .await
            .map_err(Problem::from)
    }

    async fn count_users(&self) -> Result<u64, Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .count_documents(None, None)
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    #[test]
    fn login_upsert_only_creates_identity_fields_on_insert() {
        let now = bson::DateTime::now();
        let update = login_upsert("s@x.com", Some("Student"), now);

        let set = update.get_document("$set").expect("$set present");
        assert_eq!(set.get_str("name"), Ok("Student"));
        assert_eq!(set.get("lastLogin"), Some(&Bson::DateTime(now)));
        assert!(set.get("createdAt").is_none(), "createdAt must not refresh");

        let on_insert = update.get_document("$setOnInsert").expect("$setOnInsert");
        assert_eq!(on_insert.get_str("email"), Ok("s@x.com"));
        assert_eq!(on_insert.get_str("role"), Ok("unset"));
        assert_eq!(on_insert.get("createdAt"), Some(&Bson::DateTime(now)));
    }

    #[test]
    fn login_upsert_clears_missing_name() {
        let update = login_upsert("s@x.com", None, bson::DateTime::now());
        let set = update.get_document("$set").expect("$set present");
        assert_eq!(set.get("name"), Some(&Bson::Null));
    }
}

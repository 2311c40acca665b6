pub mod application;
pub mod class;
pub mod enrollment;
pub mod feedback;
pub mod user;

/// Common BSON filter helpers. Document ids are UUIDs stored as binary
/// subtype 4, matching the `uuid_1_as_binary` serde helper on the models.
pub mod filter {
    use bson::spec::BinarySubtype;
    use bson::{doc, Binary, Bson, Document};
    use uuid::Uuid;

    pub fn uuid_bson(id: Uuid) -> Bson {
        Bson::Binary(Binary {
            subtype: BinarySubtype::Uuid,
            bytes: id.as_bytes().to_vec(),
        })
    }

    #[inline]
    pub fn by_id(id: Uuid) -> Document {
        doc! { "_id": uuid_bson(id) }
    }

    #[inline]
    pub fn by_email(email: impl AsRef<str>) -> Document {
        doc! { "email": email.as_ref() }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn id_filter_uses_uuid_binary_subtype() {
            let id = Uuid::new_v4();
            let filter = by_id(id);
            match filter.get("_id") {
                Some(Bson::Binary(bin)) => {
                    assert_eq!(bin.subtype, BinarySubtype::Uuid);
                    assert_eq!(bin.bytes, id.as_bytes().to_vec());
                }
                other => panic!("expected binary _id filter, got {:?}", other),
            }
        }
    }
}

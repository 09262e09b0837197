use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Credential {
    pub id: String,
    /// Owner; lookups from executors are scoped to this user.
    pub user_id: String,
    pub name: String,
    /// Provider tag, e.g. `openai`.
    pub kind: String,
    /// Secret in its at-rest encoding, decrypted on demand.
    pub value: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl DbCollectionIden for Credential {
    fn iden() -> StoreIden {
        StoreIden::Credentials
    }
}

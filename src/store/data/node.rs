use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Node {
    pub id: String,
    pub workflow_id: String,
    /// Node type tag in its wire form, e.g. `http-request`.
    pub kind: String,
    pub name: String,
    /// Executor config as JSON text.
    pub data: String,
    /// Position within the workflow's node list, keeps load order
    /// stable.
    pub seq: i64,
    pub timestamp: i64,
}

impl DbCollectionIden for Node {
    fn iden() -> StoreIden {
        StoreIden::Nodes
    }
}

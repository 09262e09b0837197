use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Connection {
    pub id: String,
    pub workflow_id: String,
    pub from_node_id: String,
    pub to_node_id: String,
    pub seq: i64,
    pub timestamp: i64,
}

impl DbCollectionIden for Connection {
    fn iden() -> StoreIden {
        StoreIden::Connections
    }
}

use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::Connection, db::mem::DbDocument},
};

impl DbDocument for Connection {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("workflow_id".to_string(), json!(self.workflow_id.clone()));
        map.insert("from_node_id".to_string(), json!(self.from_node_id.clone()));
        map.insert("to_node_id".to_string(), json!(self.to_node_id.clone()));
        map.insert("seq".to_string(), json!(self.seq));
        map.insert("timestamp".to_string(), json!(self.timestamp));
        Ok(map)
    }
}

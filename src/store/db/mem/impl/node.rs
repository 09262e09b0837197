use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::Node, db::mem::DbDocument},
};

impl DbDocument for Node {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("workflow_id".to_string(), json!(self.workflow_id.clone()));
        map.insert("kind".to_string(), json!(self.kind.clone()));
        map.insert("name".to_string(), json!(self.name.clone()));
        map.insert("data".to_string(), json!(self.data.clone()));
        map.insert("seq".to_string(), json!(self.seq));
        map.insert("timestamp".to_string(), json!(self.timestamp));
        Ok(map)
    }
}

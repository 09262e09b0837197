use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::Execution, db::mem::DbDocument},
};

impl DbDocument for Execution {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("workflow_id".to_string(), json!(self.workflow_id.clone()));
        map.insert("event_id".to_string(), json!(self.event_id.clone()));
        map.insert("status".to_string(), json!(self.status.clone()));
        map.insert("started_at".to_string(), json!(self.started_at));
        map.insert("completed_at".to_string(), json!(self.completed_at));
        map.insert("output".to_string(), json!(self.output.clone()));
        map.insert("error".to_string(), json!(self.error.clone()));
        map.insert("error_stack".to_string(), json!(self.error_stack.clone()));
        Ok(map)
    }
}

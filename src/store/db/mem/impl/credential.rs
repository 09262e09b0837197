use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::Credential, db::mem::DbDocument},
};

impl DbDocument for Credential {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("user_id".to_string(), json!(self.user_id.clone()));
        map.insert("name".to_string(), json!(self.name.clone()));
        map.insert("kind".to_string(), json!(self.kind.clone()));
        map.insert("value".to_string(), json!(self.value.clone()));
        map.insert("create_time".to_string(), json!(self.create_time));
        map.insert("update_time".to_string(), json!(self.update_time));
        Ok(map)
    }
}

mod collect;
mod r#impl;

use std::{collections::HashMap, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

use crate::{
    Result,
    store::{DbCollection, DbStore, Store, data::*},
};

pub use collect::Collect;

/// In-memory backend for tests and embedded use. Every collection is
/// a [`Collect`] over a concurrent map; queries filter and sort over
/// a document view of each row.
#[derive(Debug, Clone)]
pub struct MemStore {
    workflows: Arc<Collect<Workflow>>,
    nodes: Arc<Collect<Node>>,
    connections: Arc<Collect<Connection>>,
    executions: Arc<Collect<Execution>>,
    credentials: Arc<Collect<Credential>>,
}

/// Row as a flat field map, the form filters and ordering run against.
pub(crate) trait DbDocument: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
    fn doc(&self) -> Result<HashMap<String, JsonValue>>;
}

impl DbStore for MemStore {
    fn init(
        &self,
        s: &Store,
    ) {
        s.register(self.workflows());
        s.register(self.nodes());
        s.register(self.connections());
        s.register(self.executions());
        s.register(self.credentials());
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(Collect::new("workflows")),
            nodes: Arc::new(Collect::new("nodes")),
            connections: Arc::new(Collect::new("connections")),
            executions: Arc::new(Collect::new("executions")),
            credentials: Arc::new(Collect::new("credentials")),
        }
    }

    pub fn workflows(&self) -> Arc<dyn DbCollection<Item = Workflow> + Send + Sync> {
        self.workflows.clone()
    }

    pub fn nodes(&self) -> Arc<dyn DbCollection<Item = Node> + Send + Sync> {
        self.nodes.clone()
    }

    pub fn connections(&self) -> Arc<dyn DbCollection<Item = Connection> + Send + Sync> {
        self.connections.clone()
    }

    pub fn executions(&self) -> Arc<dyn DbCollection<Item = Execution> + Send + Sync> {
        self.executions.clone()
    }

    pub fn credentials(&self) -> Arc<dyn DbCollection<Item = Credential> + Send + Sync> {
        self.credentials.clone()
    }
}

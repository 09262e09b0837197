use std::{
    any::Any,
    collections::HashMap,
    convert::AsRef,
    sync::{Arc, RwLock},
};

use tracing::trace;

use crate::{
    Result, SeqflowError, ShareLock,
    model::{ConnectionModel, NodeModel, WorkflowModel},
    utils,
};

use super::{DbCollection, DbCollectionIden, StoreIden, data::*, query::Query};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

pub struct Store {
    collections: ShareLock<HashMap<StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn collection<DATA>(&self) -> Arc<dyn DbCollection<Item = DATA>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().unwrap();

        #[allow(clippy::expect_fun_call)]
        let collection = collections.get(&DATA::iden()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()));

        #[allow(clippy::expect_fun_call)]
        collection.downcast_ref::<DynDbSetRef<DATA>>().map(|v| v.0.clone()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()))
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) where
        DATA: DbCollectionIden + 'static,
    {
        let mut collections = self.collections.write().unwrap();
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
    }

    pub fn workflows(&self) -> Arc<dyn DbCollection<Item = Workflow>> {
        self.collection()
    }

    pub fn nodes(&self) -> Arc<dyn DbCollection<Item = Node>> {
        self.collection()
    }

    pub fn connections(&self) -> Arc<dyn DbCollection<Item = Connection>> {
        self.collection()
    }

    pub fn executions(&self) -> Arc<dyn DbCollection<Item = Execution>> {
        self.collection()
    }

    pub fn credentials(&self) -> Arc<dyn DbCollection<Item = Credential>> {
        self.collection()
    }

    /// Persists a workflow definition: upserts the workflow row and
    /// replaces its node and connection rows.
    pub fn deploy(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<bool> {
        trace!("store::deploy({})", workflow.id);
        if workflow.id.is_empty() {
            return Err(SeqflowError::Workflow("missing id in workflow".into()));
        }

        let workflows = self.workflows();
        match workflows.find(&workflow.id) {
            Ok(existing) => {
                let data = Workflow {
                    id: workflow.id.clone(),
                    user_id: workflow.user_id.clone(),
                    name: workflow.name.clone(),
                    create_time: existing.create_time,
                    update_time: utils::time::time_millis(),
                };
                workflows.update(&data)?;
            }
            Err(_) => {
                let data = Workflow {
                    id: workflow.id.clone(),
                    user_id: workflow.user_id.clone(),
                    name: workflow.name.clone(),
                    create_time: utils::time::time_millis(),
                    update_time: 0,
                };
                workflows.create(&data)?;
            }
        }

        let nodes = self.nodes();
        let stale = nodes.query(&Query::new().push_filter("workflow_id", workflow.id.clone()))?;
        for row in stale.rows {
            nodes.delete(&row.id)?;
        }
        for (seq, node) in workflow.nodes.iter().enumerate() {
            let data = Node {
                id: node.id.clone(),
                workflow_id: workflow.id.clone(),
                kind: node.kind.as_ref().to_string(),
                name: node.name.clone(),
                data: serde_json::to_string(&node.data)?,
                seq: seq as i64,
                timestamp: utils::time::time_millis(),
            };
            nodes.create(&data)?;
        }

        let connections = self.connections();
        let stale = connections.query(&Query::new().push_filter("workflow_id", workflow.id.clone()))?;
        for row in stale.rows {
            connections.delete(&row.id)?;
        }
        for (seq, connection) in workflow.connections.iter().enumerate() {
            // editors may omit edge ids; an assigned one keeps every
            // edge as its own row
            let id = if connection.id.is_empty() {
                utils::longid()
            } else {
                connection.id.clone()
            };
            let data = Connection {
                id,
                workflow_id: workflow.id.clone(),
                from_node_id: connection.from_node_id.clone(),
                to_node_id: connection.to_node_id.clone(),
                seq: seq as i64,
                timestamp: utils::time::time_millis(),
            };
            connections.create(&data)?;
        }

        Ok(true)
    }

    /// Loads a workflow with its graph, nodes in their deploy order.
    pub fn load_workflow(
        &self,
        id: &str,
    ) -> Result<WorkflowModel> {
        // a workflow that was never deployed is a config problem, not a
        // backend failure; only the latter should be retried
        let row = self.workflows().find(id).map_err(|err| match self.workflows().exists(id) {
            Ok(false) => SeqflowError::Config(format!("workflow '{}' not found", id)),
            _ => err,
        })?;

        let node_rows = self.nodes().query(&Query::new().push_filter("workflow_id", id).push_order("seq", false))?;
        let mut nodes = Vec::with_capacity(node_rows.rows.len());
        for node in node_rows.rows {
            nodes.push(NodeModel {
                id: node.id,
                kind: node.kind.parse().map_err(|_| SeqflowError::Workflow(format!("unknown node type '{}'", node.kind)))?,
                name: node.name,
                data: serde_json::from_str(&node.data)?,
            });
        }

        let connection_rows = self.connections().query(&Query::new().push_filter("workflow_id", id).push_order("seq", false))?;
        let connections = connection_rows
            .rows
            .into_iter()
            .map(|connection| ConnectionModel {
                id: connection.id,
                from_node_id: connection.from_node_id,
                to_node_id: connection.to_node_id,
            })
            .collect();

        Ok(WorkflowModel {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            nodes,
            connections,
        })
    }
}

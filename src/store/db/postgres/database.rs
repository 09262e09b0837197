use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::store::{DbCollection, DbStore, Store, data::*};

use super::{DbInit, collection::*, synclient::SynClient};

pub struct PostgresStore {
    workflows: Arc<WorkflowCollection>,
    nodes: Arc<NodeCollection>,
    connections: Arc<ConnectionCollection>,
    executions: Arc<ExecutionCollection>,
    credentials: Arc<CredentialCollection>,
}

impl DbStore for PostgresStore {
    fn init(
        &self,
        s: &Store,
    ) {
        self.workflows.init();
        self.nodes.init();
        self.connections.init();
        self.executions.init();
        self.credentials.init();

        s.register(self.workflows());
        s.register(self.nodes());
        s.register(self.connections());
        s.register(self.executions());
        s.register(self.credentials());
    }
}

impl PostgresStore {
    pub fn new(
        db_url: &str,
        runtime: Arc<Runtime>,
    ) -> Self {
        let conn = Arc::new(SynClient::connect(db_url, runtime));
        let workflows = WorkflowCollection::new(&conn);
        let nodes = NodeCollection::new(&conn);
        let connections = ConnectionCollection::new(&conn);
        let executions = ExecutionCollection::new(&conn);
        let credentials = CredentialCollection::new(&conn);

        Self {
            workflows: Arc::new(workflows),
            nodes: Arc::new(nodes),
            connections: Arc::new(connections),
            executions: Arc::new(executions),
            credentials: Arc::new(credentials),
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

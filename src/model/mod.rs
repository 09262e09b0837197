mod connection;
mod node;
mod trigger;
mod workflow;

pub use connection::ConnectionModel;
pub use node::{NodeModel, NodeType};
pub use trigger::TriggerEvent;
pub use workflow::WorkflowModel;

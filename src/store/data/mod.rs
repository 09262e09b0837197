mod connection;
mod credential;
mod execution;
mod node;
mod workflow;

pub use connection::Connection;
pub use credential::Credential;
pub use execution::{Execution, ExecutionStatus};
pub use node::Node;
pub use workflow::Workflow;

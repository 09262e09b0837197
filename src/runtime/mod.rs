mod channel;
mod context;
mod run;
mod runner;
mod steps;

pub use channel::{Channel, ChannelSubscription, NodeStatusWatch, SubscribeOptions};
pub use context::ExecutionContext;
pub use run::{Run, RunId};
pub use runner::WorkflowRunner;
pub use steps::{AiCallMeta, MemoStepRunner, StepFuture, StepRunner};

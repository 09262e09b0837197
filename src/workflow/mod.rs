pub mod executors;
pub mod plan;
pub mod template;

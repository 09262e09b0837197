//! # Seqflow
//!
//! Seqflow is an embeddable workflow execution engine. A workflow is a
//! directed acyclic graph of typed nodes; the engine flattens it into
//! a deterministic linear order, runs each node through its executor,
//! threads a shared context from node to node, and records a durable
//! execution history with whole-run retry for transient failures.
//!
//! ## Core Features
//!
//! - **Deterministic execution**: the graph is topologically ordered
//!   once per run, and nodes execute strictly sequentially
//! - **Typed executors**: each node kind validates its configuration
//!   against a schema before any work starts
//! - **Live status events**: every node emits loading/success/error
//!   on a broadcast channel observers can filter by glob
//! - **Durable history**: runs land in the store as
//!   RUNNING -> SUCCESS | FAILED rows, with memoized steps replayed
//!   across retry attempts
//! - **Pluggable storage**: in-memory for tests, PostgreSQL for
//!   production
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seqflow::{Config, EngineBuilder, TriggerEvent, WorkflowModel};
//!
//! let engine = EngineBuilder::new().config(Config::default()).build()?;
//! engine.launch();
//!
//! let workflow = WorkflowModel::from_json(json_str)?;
//! engine.deploy(&workflow)?;
//! let run = engine.trigger(TriggerEvent::new(&workflow.id))?;
//! let context = run.wait().await?;
//!
//! engine.shutdown();
//! ```

mod builder;
mod common;
mod config;
mod engine;
mod error;
mod events;
mod model;
mod runtime;
mod secrets;
mod store;
mod utils;
mod workflow;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::{Config, PostgresConfig, RetryConfig, StoreConfig, StoreType};
pub use engine::Engine;
pub use error::SeqflowError;
pub use events::{NodeStatus, RecordingPublisher, StatusMessage, StatusPublisher};
pub use model::*;
pub use runtime::{Channel, ChannelSubscription, ExecutionContext, NodeStatusWatch, Run, SubscribeOptions};
pub use secrets::{Base64Cipher, CredentialCipher};
pub use store::{MemStore, PostgresStore, Store};

/// Result type alias for Seqflow operations.
pub type Result<T> = std::result::Result<T, SeqflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;

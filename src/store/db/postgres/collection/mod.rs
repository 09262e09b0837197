mod connection;
mod credential;
mod execution;
mod node;
mod workflow;

use std::sync::Arc;

use sea_query::{Alias as SeaAlias, Cond, Expr as SeaExpr, Value as SeaValue};
use serde_json::Value as JsonValue;

use crate::store::query::Query;

use super::synclient::SynClient;

pub use connection::ConnectionCollection;
pub use credential::CredentialCollection;
pub use execution::ExecutionCollection;
pub use node::NodeCollection;
pub use workflow::WorkflowCollection;

pub(crate) use crate::store::map_db_err;

pub(crate) type DbConnection = Arc<SynClient>;

/// Translates a collection query's equality filters into a sea-query
/// condition tree.
pub(crate) fn into_query(q: &Query) -> Cond {
    let mut cond = Cond::all();
    for filter in q.filters() {
        cond = cond.add(SeaExpr::col(SeaAlias::new(&filter.key)).eq(bind_value(&filter.value)));
    }
    cond
}

fn bind_value(value: &JsonValue) -> SeaValue {
    match value {
        JsonValue::String(s) => s.clone().into(),
        JsonValue::Bool(b) => (*b).into(),
        JsonValue::Number(n) if n.is_i64() => n.as_i64().unwrap_or_default().into(),
        JsonValue::Number(n) => n.as_f64().unwrap_or_default().into(),
        other => other.to_string().into(),
    }
}

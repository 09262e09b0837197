//! Filtering and pagination options for collection queries.

use serde_json::Value as JsonValue;

const DEFAULT_LIMIT: usize = 10000;

/// Equality filter on one column.
#[derive(Debug, Clone)]
pub struct Filter {
    pub key: String,
    pub value: JsonValue,
}

/// Collection query: equality filters combined with AND, optional
/// ordering, and offset/limit pagination.
#[derive(Debug, Clone)]
pub struct Query {
    filters: Vec<Filter>,
    order_by: Vec<(String, bool)>,
    limit: usize,
    offset: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Adds an equality filter on a column.
    pub fn push_filter(
        mut self,
        key: &str,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.filters.push(Filter {
            key: key.to_string(),
            value: value.into(),
        });
        self
    }

    /// Adds an ordering column; `rev` sorts descending.
    pub fn push_order(
        mut self,
        key: &str,
        rev: bool,
    ) -> Self {
        self.order_by.push((key.to_string(), rev));
        self
    }

    pub fn set_limit(
        mut self,
        limit: usize,
    ) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn set_offset(
        mut self,
        offset: usize,
    ) -> Self {
        self.offset = offset;
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[(String, bool)] {
        &self.order_by
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::new().push_filter("workflow_id", "w1").push_filter("status", json!("RUNNING")).push_order("seq", false).set_limit(20).set_offset(40);

        assert_eq!(query.filters().len(), 2);
        assert_eq!(query.filters()[0].key, "workflow_id");
        assert_eq!(query.filters()[0].value, json!("w1"));
        assert_eq!(query.order_by(), &[("seq".to_string(), false)]);
        assert_eq!(query.limit(), 20);
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn test_limit_never_zero() {
        assert_eq!(Query::new().set_limit(0).limit(), 1);
    }
}

use std::cmp::Ordering;

use moka::sync::Cache;
use serde_json::Value as JsonValue;

use crate::{
    Result, SeqflowError,
    store::{DbCollection, PageData, query::Query},
};

use super::DbDocument;

/// One in-memory collection, keyed by row id.
#[derive(Debug, Clone)]
pub struct Collect<T>
where
    T: Clone + Send + Sync + 'static,
{
    name: String,
    rows: Cache<String, T>,
}

impl<T> Collect<T>
where
    T: DbDocument + Clone + Send + Sync + 'static,
{
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Cache::new(u64::MAX),
        }
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument + Clone + Send + Sync + 'static,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        Ok(self.rows.contains_key(id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        self.rows.get(id).ok_or_else(|| SeqflowError::Store(format!("cannot find record '{}' in {}", id, self.name)))
    }

    fn query(
        &self,
        q: &Query,
    ) -> Result<PageData<Self::Item>> {
        let mut matched: Vec<(T, std::collections::HashMap<String, JsonValue>)> = Vec::new();
        for (_, row) in self.rows.iter() {
            let doc = row.doc()?;
            let hit = q.filters().iter().all(|filter| doc.get(&filter.key) == Some(&filter.value));
            if hit {
                matched.push((row, doc));
            }
        }

        if q.order_by().is_empty() {
            // keep a stable fallback order, the map iterates arbitrarily
            matched.sort_by(|a, b| a.0.id().cmp(b.0.id()));
        } else {
            matched.sort_by(|a, b| {
                for (key, rev) in q.order_by() {
                    let ordering = cmp_value(a.1.get(key), b.1.get(key));
                    let ordering = if *rev { ordering.reverse() } else { ordering };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let count = matched.len();
        let rows: Vec<T> = matched.into_iter().map(|(row, _)| row).skip(q.offset()).take(q.limit()).collect();

        Ok(PageData {
            count,
            page_size: q.limit(),
            page_num: q.offset() / q.limit() + 1,
            page_count: count.div_ceil(q.limit()),
            rows,
        })
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        self.rows.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        if !self.rows.contains_key(data.id()) {
            return Ok(false);
        }
        self.rows.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        if !self.rows.contains_key(id) {
            return Ok(false);
        }
        self.rows.remove(id);
        Ok(true)
    }
}

fn cmp_value(
    a: Option<&JsonValue>,
    b: Option<&JsonValue>,
) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::data::Execution;

    fn execution(
        id: &str,
        workflow_id: &str,
        started_at: i64,
    ) -> Execution {
        Execution {
            id: id.to_string(),
            workflow_id: workflow_id.to_string(),
            event_id: format!("evt-{id}"),
            status: "RUNNING".to_string(),
            started_at,
            completed_at: 0,
            output: None,
            error: None,
            error_stack: None,
        }
    }

    fn seeded() -> Collect<Execution> {
        let collect = Collect::new("executions");
        collect.create(&execution("e1", "w1", 10)).unwrap();
        collect.create(&execution("e2", "w1", 30)).unwrap();
        collect.create(&execution("e3", "w2", 20)).unwrap();
        collect
    }

    #[test]
    fn test_find_and_exists() {
        let collect = seeded();
        assert!(collect.exists("e1").unwrap());
        assert!(!collect.exists("ghost").unwrap());
        assert_eq!(collect.find("e2").unwrap().workflow_id, "w1");
        assert!(collect.find("ghost").is_err());
    }

    #[test]
    fn test_query_filters_and_orders() {
        let collect = seeded();

        let page = collect.query(&Query::new().push_filter("workflow_id", "w1").push_order("started_at", true)).unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.rows[0].id, "e2");
        assert_eq!(page.rows[1].id, "e1");
    }

    #[test]
    fn test_query_paginates() {
        let collect = seeded();

        let page = collect.query(&Query::new().push_order("started_at", false).set_limit(2)).unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[0].id, "e1");

        let page = collect.query(&Query::new().push_order("started_at", false).set_limit(2).set_offset(2)).unwrap();
        assert_eq!(page.page_num, 2);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].id, "e2");
    }

    #[test]
    fn test_query_compound_filter() {
        let collect = seeded();
        let page = collect.query(&Query::new().push_filter("workflow_id", "w1").push_filter("event_id", "evt-e1")).unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.rows[0].id, "e1");
    }

    #[test]
    fn test_update_and_delete_report_presence() {
        let collect = seeded();

        let mut row = collect.find("e1").unwrap();
        row.status = "SUCCESS".to_string();
        assert!(collect.update(&row).unwrap());
        assert_eq!(collect.find("e1").unwrap().status, "SUCCESS");

        assert!(!collect.update(&execution("ghost", "w1", 0)).unwrap());
        assert!(collect.delete("e1").unwrap());
        assert!(!collect.delete("e1").unwrap());
    }

    #[test]
    fn test_optional_fields_survive_the_document_view() {
        let collect: Collect<Execution> = Collect::new("executions");
        let mut row = execution("e9", "w1", 5);
        row.error = Some("boom".to_string());
        collect.create(&row).unwrap();

        let page = collect.query(&Query::new().push_filter("error", json!("boom"))).unwrap();
        assert_eq!(page.count, 1);
    }
}

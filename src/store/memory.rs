use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

use crate::error::{Error, Result};

use super::{Document, DocumentStore, NativeQuery};

/// Documents returned by a list call that carries no `limit`.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// In-process document store that evaluates native queries the way the
/// backend does. Documents keep insertion order.
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    clock: AtomicU64,
    calls: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            collections: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every (operation, collection) pair seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub fn all(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, op: &str, collection: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((op.to_string(), collection.to_string()));
    }

    fn tick(&self) -> String {
        let n = self.clock.fetch_add(1, AtomicOrdering::SeqCst);
        format!("2024-01-01T00:00:{:02}.{:03}+00:00", (n / 1000) % 60, n % 1000)
    }
}

impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn list_documents(&self, collection: &str, queries: &[NativeQuery]) -> Result<Vec<Document>> {
        self.record("list", collection);
        let docs = self.all(collection);

        let mut out: Vec<Document> = Vec::new();
        for doc in docs {
            let mut keep = true;
            for q in queries.iter().filter(|q| q.is_filter()) {
                if !matches(&doc, q)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                out.push(doc);
            }
        }

        let orders: Vec<(&str, bool)> = queries
            .iter()
            .filter_map(|q| match q {
                NativeQuery::OrderAsc(a) => Some((a.as_str(), true)),
                NativeQuery::OrderDesc(a) => Some((a.as_str(), false)),
                _ => None,
            })
            .collect();
        if !orders.is_empty() {
            out.sort_by(|a, b| {
                for (attr, asc) in &orders {
                    let ord = compare_opt(a.field(attr).as_ref(), b.field(attr).as_ref());
                    let ord = if *asc { ord } else { ord.reverse() };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = queries.iter().find_map(|q| match q {
            NativeQuery::Offset(n) => Some(*n as usize),
            _ => None,
        });
        let limit = queries
            .iter()
            .find_map(|q| match q {
                NativeQuery::Limit(n) => Some(*n as usize),
                _ => None,
            })
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let mut out: Vec<Document> = out.into_iter().skip(offset.unwrap_or(0)).collect();
        out.truncate(limit);

        if let Some(attrs) = queries.iter().find_map(|q| match q {
            NativeQuery::Select(a) => Some(a),
            _ => None,
        }) {
            for doc in &mut out {
                doc.data.retain(|k, _| attrs.iter().any(|a| a == k));
            }
        }
        Ok(out)
    }

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.record("get", collection);
        Ok(self.all(collection).into_iter().find(|d| d.id == id))
    }

    fn create_document(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<Document> {
        self.record("create", collection);
        let now = self.tick();
        let mut map = self.collections.lock().unwrap();
        let docs = map.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.id == id) {
            return Err(Error::Conflict(format!(
                "Document with the requested ID '{}' already exists.",
                id
            )));
        }
        let doc = Document {
            id: id.to_string(),
            created_at: now.clone(),
            updated_at: now,
            data: data.clone(),
        };
        docs.push(doc.clone());
        Ok(doc)
    }

    fn update_document(&self, collection: &str, id: &str, patch: &Map<String, Value>) -> Result<Document> {
        self.record("update", collection);
        let now = self.tick();
        let mut map = self.collections.lock().unwrap();
        let doc = map
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| Error::NotFound(format!("document {} in {}", id, collection)))?;
        for (k, v) in patch {
            doc.data.insert(k.clone(), v.clone());
        }
        doc.updated_at = now;
        Ok(doc.clone())
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.record("delete", collection);
        let mut map = self.collections.lock().unwrap();
        let docs = map
            .get_mut(collection)
            .ok_or_else(|| Error::NotFound(format!("collection {}", collection)))?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(Error::NotFound(format!("document {} in {}", id, collection)));
        }
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}

fn matches(doc: &Document, q: &NativeQuery) -> Result<bool> {
    Ok(match q {
        NativeQuery::Equal(attr, values) => {
            let v = doc.field(attr);
            values.iter().any(|x| loose_eq(v.as_ref(), x))
        }
        NativeQuery::NotEqual(attr, values) => {
            let v = doc.field(attr);
            !values.iter().any(|x| loose_eq(v.as_ref(), x))
        }
        NativeQuery::GreaterThan(attr, x) => compare_opt(doc.field(attr).as_ref(), Some(x)) == Ordering::Greater,
        NativeQuery::GreaterThanEqual(attr, x) => {
            doc.field(attr).is_some() && compare_opt(doc.field(attr).as_ref(), Some(x)) != Ordering::Less
        }
        NativeQuery::LessThan(attr, x) => {
            doc.field(attr).is_some() && compare_opt(doc.field(attr).as_ref(), Some(x)) == Ordering::Less
        }
        NativeQuery::LessThanEqual(attr, x) => {
            doc.field(attr).is_some() && compare_opt(doc.field(attr).as_ref(), Some(x)) != Ordering::Greater
        }
        NativeQuery::IsNull(attr) => matches!(doc.field(attr), None | Some(Value::Null)),
        NativeQuery::IsNotNull(attr) => !matches!(doc.field(attr), None | Some(Value::Null)),
        NativeQuery::Or(inner) => {
            if inner.is_empty() {
                return Err(Error::InvalidQuery("or() needs at least one query".into()));
            }
            let mut any = false;
            for q in inner {
                if matches(doc, q)? {
                    any = true;
                    break;
                }
            }
            any
        }
        _ => true,
    })
}

fn loose_eq(a: Option<&Value>, b: &Value) -> bool {
    match (a, b) {
        (Some(Value::Number(x)), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Some(x), y) => x == y,
        (None, Value::Null) => true,
        (None, _) => false,
    }
}

fn compare_opt(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare(x, y),
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

pub mod appwrite;
#[cfg(test)]
pub mod memory;

// ── Documents ───────────────────────────────────────────────────────

/// A schema-flexible record as stored by the backend. System attributes
/// (`$id`, `$createdAt`, ...) are lifted out of `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub data: Map<String, Value>,
}

impl Document {
    /// Parse Appwrite's wire representation.
    pub fn from_wire(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(Error::Decode("document is not a JSON object".into()));
        };
        let id = match map.remove("$id") {
            Some(Value::String(s)) => s,
            _ => return Err(Error::Decode("document has no $id".into())),
        };
        let created_at = take_str(&mut map, "$createdAt");
        let updated_at = take_str(&mut map, "$updatedAt");
        map.retain(|k, _| !k.starts_with('$'));
        Ok(Document {
            id,
            created_at,
            updated_at,
            data: map,
        })
    }

    /// Field lookup that also understands the system attributes, used when
    /// evaluating filters and orderings.
    pub fn field(&self, field: &str) -> Option<Value> {
        match field {
            "id" | "$id" => Some(Value::String(self.id.clone())),
            "$createdAt" | "created_at" if !self.data.contains_key(field) => {
                Some(Value::String(self.created_at.clone()))
            }
            "$updatedAt" | "updated_at" if !self.data.contains_key(field) => {
                Some(Value::String(self.updated_at.clone()))
            }
            _ => self.data.get(field).cloned(),
        }
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }

    /// Decode into a typed record. The document id is exposed as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut map = self.data.clone();
        map.insert("id".into(), Value::String(self.id.clone()));
        if !map.contains_key("created_at") && !self.created_at.is_empty() {
            map.insert("created_at".into(), Value::String(self.created_at.clone()));
        }
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::Decode(format!("document {}: {}", self.id, e)))
    }
}

fn take_str(map: &mut Map<String, Value>, key: &str) -> String {
    match map.remove(key) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Serialize a record into document fields, dropping the keys the backend
/// owns (`id`, `created_at`) and explicit nulls for absent optionals.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(mut map) => {
            map.remove("id");
            map.remove("created_at");
            map.retain(|_, v| !v.is_null());
            Ok(map)
        }
        _ => Err(Error::Decode("record did not serialize to an object".into())),
    }
}

// ── Native queries ──────────────────────────────────────────────────

/// The backend's own query objects, one per predicate/modifier.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeQuery {
    Equal(String, Vec<Value>),
    NotEqual(String, Vec<Value>),
    GreaterThan(String, Value),
    GreaterThanEqual(String, Value),
    LessThan(String, Value),
    LessThanEqual(String, Value),
    IsNull(String),
    IsNotNull(String),
    Or(Vec<NativeQuery>),
    Select(Vec<String>),
    OrderAsc(String),
    OrderDesc(String),
    Limit(u64),
    Offset(u64),
}

impl NativeQuery {
    pub fn method(&self) -> &'static str {
        match self {
            NativeQuery::Equal(..) => "equal",
            NativeQuery::NotEqual(..) => "notEqual",
            NativeQuery::GreaterThan(..) => "greaterThan",
            NativeQuery::GreaterThanEqual(..) => "greaterThanEqual",
            NativeQuery::LessThan(..) => "lessThan",
            NativeQuery::LessThanEqual(..) => "lessThanEqual",
            NativeQuery::IsNull(_) => "isNull",
            NativeQuery::IsNotNull(_) => "isNotNull",
            NativeQuery::Or(_) => "or",
            NativeQuery::Select(_) => "select",
            NativeQuery::OrderAsc(_) => "orderAsc",
            NativeQuery::OrderDesc(_) => "orderDesc",
            NativeQuery::Limit(_) => "limit",
            NativeQuery::Offset(_) => "offset",
        }
    }

    /// Appwrite's JSON query object.
    pub fn to_json(&self) -> Value {
        let method = self.method();
        match self {
            NativeQuery::Equal(attr, values) | NativeQuery::NotEqual(attr, values) => {
                json!({ "method": method, "attribute": wire_attribute(attr), "values": values })
            }
            NativeQuery::GreaterThan(attr, v)
            | NativeQuery::GreaterThanEqual(attr, v)
            | NativeQuery::LessThan(attr, v)
            | NativeQuery::LessThanEqual(attr, v) => {
                json!({ "method": method, "attribute": wire_attribute(attr), "values": [v] })
            }
            NativeQuery::IsNull(attr)
            | NativeQuery::IsNotNull(attr)
            | NativeQuery::OrderAsc(attr)
            | NativeQuery::OrderDesc(attr) => json!({ "method": method, "attribute": wire_attribute(attr) }),
            NativeQuery::Or(inner) => {
                let values: Vec<Value> = inner.iter().map(|q| q.to_json()).collect();
                json!({ "method": method, "values": values })
            }
            NativeQuery::Select(attrs) => {
                let values: Vec<&str> = attrs.iter().map(|a| wire_attribute(a)).collect();
                json!({ "method": method, "values": values })
            }
            NativeQuery::Limit(n) | NativeQuery::Offset(n) => json!({ "method": method, "values": [n] }),
        }
    }

    /// Serialized form sent as a `queries[]` parameter.
    pub fn to_wire(&self) -> String {
        self.to_json().to_string()
    }

    pub fn is_filter(&self) -> bool {
        !matches!(
            self,
            NativeQuery::Select(_)
                | NativeQuery::OrderAsc(_)
                | NativeQuery::OrderDesc(_)
                | NativeQuery::Limit(_)
                | NativeQuery::Offset(_)
        )
    }
}

/// Record-level names for system attributes map to their `$` forms.
fn wire_attribute(attr: &str) -> &str {
    match attr {
        "id" => "$id",
        "created_at" => "$createdAt",
        "updated_at" => "$updatedAt",
        other => other,
    }
}

// ── Store trait ─────────────────────────────────────────────────────

/// Document-store access. Collections are addressed by backend id (the
/// adapter resolves logical table names before calling in).
/// Implementations: `AppwriteStore` (REST) and `MemoryStore` (tests).
pub trait DocumentStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    fn list_documents(&self, collection: &str, queries: &[NativeQuery]) -> Result<Vec<Document>>;
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;
    /// Fails with `Error::Conflict` when `id` already exists.
    fn create_document(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<Document>;
    /// Partial update: only the keys in `patch` change.
    fn update_document(&self, collection: &str, id: &str, patch: &Map<String, Value>) -> Result<Document>;
    fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

    /// Cheap reachability check for boot and health.
    fn ping(&self) -> Result<()>;
}

/// Generate a backend-acceptable unique document id.
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

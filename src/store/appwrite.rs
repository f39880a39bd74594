use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::appwrite::AppwriteClient;
use crate::error::{Error, Result};
use crate::provision::{AttributeKind, AttributeSpec, IndexSpec, SchemaAdmin};

use super::{Document, DocumentStore, NativeQuery};

/// Appwrite Databases API implementation of the DocumentStore trait.
pub struct AppwriteStore {
    client: Arc<AppwriteClient>,
    database_id: String,
}

impl AppwriteStore {
    pub fn new(client: Arc<AppwriteClient>, database_id: &str) -> Self {
        Self {
            client,
            database_id: database_id.to_string(),
        }
    }

    fn documents_path(&self, collection: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.database_id, collection
        )
    }

    fn document_path(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.documents_path(collection), id)
    }

    fn collection_path(&self, collection: &str) -> String {
        format!("/databases/{}/collections/{}", self.database_id, collection)
    }
}

impl DocumentStore for AppwriteStore {
    fn backend_name(&self) -> &'static str {
        "appwrite"
    }

    fn list_documents(&self, collection: &str, queries: &[NativeQuery]) -> Result<Vec<Document>> {
        let params: Vec<(&str, String)> = queries.iter().map(|q| ("queries[]", q.to_wire())).collect();
        let body = self.client.get(&self.documents_path(collection), &params)?;
        let docs = body
            .get("documents")
            .and_then(|d| d.as_array())
            .cloned()
            .ok_or_else(|| Error::Decode("list response has no documents array".into()))?;
        docs.into_iter().map(Document::from_wire).collect()
    }

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        match self.client.get(&self.document_path(collection, id), &[]) {
            Ok(v) => Document::from_wire(v).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_document(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<Document> {
        let body = json!({ "documentId": id, "data": data });
        let v = self.client.post(&self.documents_path(collection), &body)?;
        Document::from_wire(v)
    }

    fn update_document(&self, collection: &str, id: &str, patch: &Map<String, Value>) -> Result<Document> {
        let body = json!({ "data": patch });
        let v = self.client.patch(&self.document_path(collection, id), &body)?;
        Document::from_wire(v)
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.client.delete(&self.document_path(collection, id))
    }

    fn ping(&self) -> Result<()> {
        self.client
            .get(&format!("/databases/{}", self.database_id), &[])
            .map(|_| ())
    }
}

// ── Schema administration (provisioning) ──────────────────────────────

impl SchemaAdmin for AppwriteStore {
    fn create_database(&self, name: &str) -> Result<()> {
        let body = json!({ "databaseId": self.database_id, "name": name });
        self.client.post("/databases", &body).map(|_| ())
    }

    fn create_collection(&self, id: &str, name: &str) -> Result<()> {
        let body = json!({
            "collectionId": id,
            "name": name,
            "permissions": [
                "read(\"users\")",
                "create(\"users\")",
                "update(\"users\")",
                "delete(\"users\")"
            ],
            "documentSecurity": false,
        });
        self.client
            .post(&format!("/databases/{}/collections", self.database_id), &body)
            .map(|_| ())
    }

    fn create_attribute(&self, collection: &str, attr: &AttributeSpec) -> Result<()> {
        let mut body = json!({
            "key": attr.key,
            "required": attr.required,
            "array": attr.array,
        });
        let kind = match attr.kind {
            AttributeKind::String { size } => {
                body["size"] = json!(size);
                "string"
            }
            AttributeKind::Integer => "integer",
            AttributeKind::Float => "float",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Datetime => "datetime",
        };
        if !attr.required {
            if let Some(default) = &attr.default {
                body["default"] = default.clone();
            }
        }
        self.client
            .post(
                &format!("{}/attributes/{}", self.collection_path(collection), kind),
                &body,
            )
            .map(|_| ())
    }

    fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()> {
        let body = json!({
            "key": index.key,
            "type": if index.unique { "unique" } else { "key" },
            "attributes": index.attributes,
        });
        self.client
            .post(&format!("{}/indexes", self.collection_path(collection)), &body)
            .map(|_| ())
    }
}

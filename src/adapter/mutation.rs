use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::models::Record;
use crate::store::{to_fields, unique_id, Document};

use super::{Adapter, Query};

impl Adapter {
    /// Create one document per row. A string `id` key in a row becomes the
    /// document id (and is removed from the stored fields); rows without one
    /// get a generated id.
    pub fn insert(&self, table: &str, rows: Vec<Map<String, Value>>, cancel: &CancelToken) -> Result<Vec<Document>> {
        let collection = self.collection_id(table);
        let mut created = Vec::with_capacity(rows.len());
        for mut row in rows {
            cancel.check()?;
            let id = match row.remove("id") {
                Some(Value::String(s)) if !s.is_empty() => s,
                _ => unique_id(),
            };
            created.push(self.store().create_document(collection, &id, &row)?);
        }
        Ok(created)
    }

    pub fn insert_record<T: Record>(&self, record: &T, cancel: &CancelToken) -> Result<T> {
        let mut row = to_fields(record)?;
        if !record.id().is_empty() {
            row.insert("id".into(), Value::String(record.id().to_string()));
        }
        let doc = self
            .insert(T::TABLE, vec![row], cancel)?
            .into_iter()
            .next()
            .ok_or_else(|| crate::error::Error::Decode("insert returned nothing".into()))?;
        doc.decode()
    }

    /// Update the first document matching the query's filters. A query with
    /// no filters, or one that matches nothing, is a successful no-op.
    pub fn update(&self, query: &Query, patch: &Map<String, Value>, cancel: &CancelToken) -> Result<Option<Document>> {
        let Some(target) = self.first_match(query, cancel)? else {
            return Ok(None);
        };
        cancel.check()?;
        let doc = self
            .store()
            .update_document(self.collection_id(query.table()), &target.id, patch)?;
        Ok(Some(doc))
    }

    /// Delete the first document matching the query's filters and return
    /// it. Same no-op rules as `update`.
    pub fn delete(&self, query: &Query, cancel: &CancelToken) -> Result<Option<Document>> {
        let Some(target) = self.first_match(query, cancel)? else {
            return Ok(None);
        };
        cancel.check()?;
        self.store()
            .delete_document(self.collection_id(query.table()), &target.id)?;
        Ok(Some(target))
    }

    /// Look-then-write upsert keyed by `filter`: update the first document
    /// whose `column == value`, otherwise create one. Without a filter it
    /// always creates.
    ///
    /// Not atomic. Two callers racing on the same filter can both miss the
    /// lookup and both create, leaving duplicate "unique" documents. Use
    /// [`Adapter::upsert_keyed`] where that matters.
    pub fn upsert(
        &self,
        table: &str,
        data: Map<String, Value>,
        filter: Option<(&str, Value)>,
        cancel: &CancelToken,
    ) -> Result<Document> {
        if let Some((column, value)) = filter {
            let lookup = Query::from(table).eq(column, value).limit(1);
            if let Some(existing) = self.select(&lookup, cancel)?.into_first() {
                cancel.check()?;
                return self
                    .store()
                    .update_document(self.collection_id(table), &existing.id, &data);
            }
        }
        let mut created = self.insert(table, vec![data], cancel)?;
        Ok(created.remove(0))
    }

    /// Idempotent upsert: the document id is derived from `key`, so every
    /// caller with the same key addresses the same document. Creation is
    /// tried first and a conflict turns into an update of that id.
    pub fn upsert_keyed(
        &self,
        table: &str,
        key: &str,
        data: &Map<String, Value>,
        cancel: &CancelToken,
    ) -> Result<Document> {
        let collection = self.collection_id(table);
        let id = idempotency_id(key);
        cancel.check()?;
        match self.store().create_document(collection, &id, data) {
            Ok(doc) => Ok(doc),
            Err(e) if e.is_conflict() => {
                cancel.check()?;
                self.store().update_document(collection, &id, data)
            }
            Err(e) => Err(e),
        }
    }

    fn first_match(&self, query: &Query, cancel: &CancelToken) -> Result<Option<Document>> {
        if query.filters().is_empty() {
            log::debug!(
                "[adapter] mutation on {} without a filter ignored",
                query.table()
            );
            return Ok(None);
        }
        let lookup = query.clone().limit(1);
        Ok(self.select(&lookup, cancel)?.into_first())
    }
}

/// Document id for an idempotency key: hex SHA-256, cut to the backend's
/// 36-character id limit. Hex never starts with a special character.
pub fn idempotency_id(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(36);
    id
}

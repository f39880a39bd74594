//! Compatibility adapter: a chainable, table-oriented query interface on top
//! of the document store's native query objects.
//!
//! Logical table names are resolved through the [`CollectionMap`]; names
//! the map does not know are used verbatim as collection ids. Every call
//! returns a `Result` (the HTTP layer folds it into the `{ data, error }`
//! [`Envelope`]) and checks the caller's [`CancelToken`] before touching the
//! network.

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::config::CollectionMap;
use crate::error::Result;
use crate::models::Record;
use crate::store::{Document, DocumentStore};

pub mod envelope;
pub mod mutation;
pub mod query;

pub use envelope::Envelope;
pub use query::{Cardinality, Direction, Filter, Query, Rows};

/// Documents per request when paging through an unbounded list read.
pub const PAGE_SIZE: u64 = 100;

#[derive(Clone)]
pub struct Adapter {
    store: Arc<dyn DocumentStore>,
    collections: CollectionMap,
}

impl Adapter {
    pub fn new(store: Arc<dyn DocumentStore>, collections: CollectionMap) -> Self {
        Adapter { store, collections }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        &*self.store
    }

    pub fn collection_id<'a>(&'a self, table: &'a str) -> &'a str {
        self.collections.resolve(table)
    }

    /// Execute a query spec. Bounded reads (`limit`, `range`, `single`)
    /// issue exactly one `list_documents` call; a list read without a limit
    /// pages through the collection so the backend's default page size
    /// never truncates it.
    pub fn select(&self, query: &Query, cancel: &CancelToken) -> Result<Rows> {
        let collection = self.collection_id(query.table());
        if query.is_unbounded() {
            return self.select_all_pages(collection, query, cancel).map(Rows::Many);
        }
        let native = query.translate()?;
        cancel.check()?;
        let docs = self.store.list_documents(collection, &native)?;
        match query.cardinality() {
            Cardinality::Many => Ok(Rows::Many(docs)),
            Cardinality::Single | Cardinality::MaybeSingle => {
                if docs.len() > 1 {
                    log::debug!(
                        "[adapter] single() on {} matched {} documents, keeping the first",
                        collection,
                        docs.len()
                    );
                }
                Ok(Rows::One(docs.into_iter().next()))
            }
        }
    }

    /// Offset paging until a page comes back short.
    fn select_all_pages(&self, collection: &str, query: &Query, cancel: &CancelToken) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        let mut start = query.offset();
        loop {
            let native = query.clone().range(start, start + PAGE_SIZE - 1).translate()?;
            cancel.check()?;
            let page = self.store.list_documents(collection, &native)?;
            let fetched = page.len() as u64;
            docs.extend(page);
            if fetched < PAGE_SIZE {
                return Ok(docs);
            }
            start += PAGE_SIZE;
        }
    }

    pub fn fetch_all<T: Record>(&self, query: &Query, cancel: &CancelToken) -> Result<Vec<T>> {
        self.select(query, cancel)?
            .into_vec()
            .iter()
            .map(Document::decode)
            .collect()
    }

    pub fn fetch_one<T: Record>(&self, query: &Query, cancel: &CancelToken) -> Result<Option<T>> {
        match self.select(query, cancel)?.into_first() {
            Some(doc) => doc.decode().map(Some),
            None => Ok(None),
        }
    }

    /// Direct lookup by document id.
    pub fn get<T: Record>(&self, id: &str, cancel: &CancelToken) -> Result<Option<T>> {
        cancel.check()?;
        match self.store.get_document(self.collection_id(T::TABLE), id)? {
            Some(doc) => doc.decode().map(Some),
            None => Ok(None),
        }
    }
}

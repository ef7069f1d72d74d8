use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::store::{
    upsert_seed, Collection, DeleteResult, Document, DocumentStore, Filter, InsertResult, UpdateResult,
};

/// Process-local store for tests and database-less development runs.
///
/// Documents keep insertion order. The users collection enforces unique emails
/// the way the Postgres index does.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique_email(
        collection: Collection,
        docs: &[Document],
        skip: Option<Uuid>,
        fields: &Map<String, Value>,
    ) -> Result<(), DatabaseError> {
        if collection != Collection::Users {
            return Ok(());
        }
        let Some(email) = fields.get("email").and_then(Value::as_str) else {
            return Ok(());
        };
        let taken = docs
            .iter()
            .any(|doc| Some(doc.id) != skip && doc.get_str("email") == Some(email));
        if taken {
            return Err(DatabaseError::Conflict(format!("{} already exists", collection.table())));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(&doc.id, &doc.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).and_then(|docs| {
            docs.iter()
                .find(|doc| filter.matches(&doc.id, &doc.fields))
                .cloned()
        }))
    }

    async fn insert_one(
        &self,
        collection: Collection,
        fields: Map<String, Value>,
    ) -> Result<InsertResult, DatabaseError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        Self::check_unique_email(collection, docs, None, &fields)?;

        let id = Uuid::new_v4();
        docs.push(Document { id, fields });
        Ok(InsertResult::new(id))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Map<String, Value>,
        upsert: bool,
    ) -> Result<UpdateResult, DatabaseError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        match docs.iter().position(|doc| filter.matches(&doc.id, &doc.fields)) {
            Some(index) => {
                let mut updated = docs[index].fields.clone();
                updated.extend(set);
                Self::check_unique_email(collection, docs, Some(docs[index].id), &updated)?;

                let modified = updated != docs[index].fields;
                docs[index].fields = updated;
                Ok(UpdateResult::matched(modified))
            }
            None if upsert => {
                let fields = upsert_seed(filter, set);
                Self::check_unique_email(collection, docs, None, &fields)?;

                let id = filter.id.unwrap_or_else(Uuid::new_v4);
                docs.push(Document { id, fields });
                Ok(UpdateResult::upserted(id))
            }
            None => Ok(UpdateResult::unmatched()),
        }
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(DeleteResult::new(0));
        };
        match docs.iter().position(|doc| filter.matches(&doc.id, &doc.fields)) {
            Some(index) => {
                docs.remove(index);
                Ok(DeleteResult::new(1))
            }
            None => Ok(DeleteResult::new(0)),
        }
    }

    async fn delete_many(&self, collection: Collection, ids: &[Uuid]) -> Result<DeleteResult, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(DeleteResult::new(0));
        };
        let before = docs.len();
        docs.retain(|doc| !ids.contains(&doc.id));
        Ok(DeleteResult::new((before - docs.len()) as u64))
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(&doc.id, &doc.fields)).count())
            .unwrap_or(0) as u64)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn close(&self) {}
}

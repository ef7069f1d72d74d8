use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::manager::DatabaseError;

/// The document collections the API serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Menu,
    Reviews,
    ReviewItems,
    Carts,
    Bookings,
    Payments,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Users,
        Collection::Menu,
        Collection::Reviews,
        Collection::ReviewItems,
        Collection::Carts,
        Collection::Bookings,
        Collection::Payments,
    ];

    /// Backing table name. Fixed strings only, never caller input.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Menu => "menu",
            Collection::Reviews => "reviews",
            Collection::ReviewItems => "review_items",
            Collection::Carts => "carts",
            Collection::Bookings => "booking",
            Collection::Payments => "payments",
        }
    }
}

/// A stored document: server id plus free-form fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Equality filter over an optional id and top-level fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub id: Option<Uuid>,
    pub fields: Map<String, Value>,
}

impl Filter {
    /// Matches every document
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            fields: Map::new(),
        }
    }

    pub fn field(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(key, value)
    }

    pub fn and(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, id: &Uuid, fields: &Map<String, Value>) -> bool {
        if let Some(wanted) = &self.id {
            if wanted != id {
                return false;
            }
        }
        self.fields
            .iter()
            .all(|(key, value)| fields.get(key) == Some(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl InsertResult {
    pub fn new(inserted_id: Uuid) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

impl UpdateResult {
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: modified as u64,
            upserted_id: None,
        }
    }

    pub fn upserted(id: Uuid) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        }
    }

    pub fn unmatched() -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: None,
        }
    }
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

/// Document persistence used by every handler and by the role lookup.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All matching documents, oldest first
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, DatabaseError>;

    async fn insert_one(
        &self,
        collection: Collection,
        fields: Map<String, Value>,
    ) -> Result<InsertResult, DatabaseError>;

    /// Overwrite the top-level keys in `set` on the first match. With `upsert`
    /// and no match, create a document from the filter's fields merged with `set`.
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Map<String, Value>,
        upsert: bool,
    ) -> Result<UpdateResult, DatabaseError>;

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult, DatabaseError>;

    async fn delete_many(&self, collection: Collection, ids: &[Uuid]) -> Result<DeleteResult, DatabaseError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError>;

    /// Connectivity probe for /health
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Release connections on shutdown
    async fn close(&self);
}

/// Seed document for an upsert that matched nothing
pub(crate) fn upsert_seed(filter: &Filter, set: Map<String, Value>) -> Map<String, Value> {
    let mut fields = filter.fields.clone();
    fields.extend(set);
    fields
}

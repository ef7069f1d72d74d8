use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::store::{
    upsert_seed, Collection, DeleteResult, Document, DocumentStore, Filter, InsertResult, UpdateResult,
};

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    doc: Json<Map<String, Value>>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            fields: row.doc.0,
        }
    }
}

/// Collections as JSONB rows in Postgres; filters use `doc @> $1` containment
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `$1` = field containment document, `$2` = optional id
    fn where_clause() -> &'static str {
        "doc @> $1 AND ($2::uuid IS NULL OR id = $2)"
    }

    fn containment(filter: &Filter) -> Json<Value> {
        Json(Value::Object(filter.fields.clone()))
    }

    async fn first_match(&self, collection: Collection, filter: &Filter) -> Result<Option<DocumentRow>, DatabaseError> {
        let sql = format!(
            "SELECT id, doc FROM {} WHERE {} ORDER BY created_at, id LIMIT 1",
            collection.table(),
            Self::where_clause()
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(Self::containment(filter))
            .bind(filter.id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let sql = format!(
            "SELECT id, doc FROM {} WHERE {} ORDER BY created_at, id",
            collection.table(),
            Self::where_clause()
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(Self::containment(filter))
            .bind(filter.id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, DatabaseError> {
        Ok(self.first_match(collection, filter).await?.map(Document::from))
    }

    async fn insert_one(
        &self,
        collection: Collection,
        fields: Map<String, Value>,
    ) -> Result<InsertResult, DatabaseError> {
        let id = Uuid::new_v4();
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", collection.table());
        sqlx::query(&sql)
            .bind(id)
            .bind(Json(Value::Object(fields)))
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, collection.table()))?;
        Ok(InsertResult::new(id))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Map<String, Value>,
        upsert: bool,
    ) -> Result<UpdateResult, DatabaseError> {
        match self.first_match(collection, filter).await? {
            Some(row) => {
                let set = Value::Object(set);
                // Rows already containing every key/value are matched but not modified
                let sql = format!(
                    "UPDATE {} SET doc = doc || $2 WHERE id = $1 AND NOT (doc @> $2)",
                    collection.table()
                );
                let done = sqlx::query(&sql)
                    .bind(row.id)
                    .bind(Json(set))
                    .execute(&self.pool)
                    .await
                    .map_err(|e| DatabaseError::from_write(e, collection.table()))?;
                Ok(UpdateResult::matched(done.rows_affected() > 0))
            }
            None if upsert => {
                let id = filter.id.unwrap_or_else(Uuid::new_v4);
                let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", collection.table());
                sqlx::query(&sql)
                    .bind(id)
                    .bind(Json(Value::Object(upsert_seed(filter, set))))
                    .execute(&self.pool)
                    .await
                    .map_err(|e| DatabaseError::from_write(e, collection.table()))?;
                Ok(UpdateResult::upserted(id))
            }
            None => Ok(UpdateResult::unmatched()),
        }
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult, DatabaseError> {
        let Some(row) = self.first_match(collection, filter).await? else {
            return Ok(DeleteResult::new(0));
        };
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let done = sqlx::query(&sql).bind(row.id).execute(&self.pool).await?;
        Ok(DeleteResult::new(done.rows_affected()))
    }

    async fn delete_many(&self, collection: Collection, ids: &[Uuid]) -> Result<DeleteResult, DatabaseError> {
        if ids.is_empty() {
            return Ok(DeleteResult::new(0));
        }
        let sql = format!("DELETE FROM {} WHERE id = ANY($1)", collection.table());
        let done = sqlx::query(&sql).bind(ids).execute(&self.pool).await?;
        Ok(DeleteResult::new(done.rows_affected()))
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            collection.table(),
            Self::where_clause()
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(Self::containment(filter))
            .bind(filter.id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use store::{Collection, DeleteResult, Document, DocumentStore, Filter, InsertResult, UpdateResult};

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use bistro_api::config::test_config;
use bistro_api::database::{
    Collection, DatabaseError, DeleteResult, Document, DocumentStore, Filter, InsertResult, UpdateResult,
};
use common::{TestApp, SECRET};

/// Store that fails every call, optionally after a delay
struct UnavailableStore {
    delay: Option<Duration>,
}

impl UnavailableStore {
    async fn fail<T>(&self) -> Result<T, DatabaseError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Err(DatabaseError::QueryError("connection reset".to_string()))
    }
}

#[async_trait]
impl DocumentStore for UnavailableStore {
    async fn find(&self, _: Collection, _: &Filter) -> Result<Vec<Document>, DatabaseError> {
        self.fail().await
    }

    async fn find_one(&self, _: Collection, _: &Filter) -> Result<Option<Document>, DatabaseError> {
        self.fail().await
    }

    async fn insert_one(&self, _: Collection, _: Map<String, Value>) -> Result<InsertResult, DatabaseError> {
        self.fail().await
    }

    async fn update_one(
        &self,
        _: Collection,
        _: &Filter,
        _: Map<String, Value>,
        _: bool,
    ) -> Result<UpdateResult, DatabaseError> {
        self.fail().await
    }

    async fn delete_one(&self, _: Collection, _: &Filter) -> Result<DeleteResult, DatabaseError> {
        self.fail().await
    }

    async fn delete_many(&self, _: Collection, _: &[Uuid]) -> Result<DeleteResult, DatabaseError> {
        self.fail().await
    }

    async fn count(&self, _: Collection, _: &Filter) -> Result<u64, DatabaseError> {
        self.fail().await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.fail().await
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn admin_check_is_limited_to_the_caller() {
    let app = TestApp::new();
    app.seed_user("chef@bistro.test", Some("admin")).await;
    app.seed_user("guest@bistro.test", None).await;

    // Even an admin may not ask about somebody else
    let token = app.token_for("chef@bistro.test");
    let (status, body) = app.get("/users/admin/guest@bistro.test", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "message": "unauthorized access" }));

    let (status, body) = app.get("/users/admin/chef@bistro.test", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "admin": true }));

    let token = app.token_for("guest@bistro.test");
    let (status, body) = app.get("/users/admin/guest@bistro.test", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "admin": false }));
}

#[tokio::test]
async fn admin_check_for_unregistered_caller_is_false() {
    let app = TestApp::new();
    let token = app.token_for("ghost@bistro.test");

    let (status, body) = app.get("/users/admin/ghost@bistro.test", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "admin": false }));
}

#[tokio::test]
async fn promotion_takes_effect_on_the_next_request() {
    let app = TestApp::new();
    app.seed_user("chef@bistro.test", Some("admin")).await;
    let admin = app.token_for("chef@bistro.test");

    let (status, body) = app
        .post("/users", None, json!({ "email": "cook@bistro.test", "name": "Cook" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let cook_id = body["insertedId"].as_str().unwrap().to_string();
    let cook = app.token_for("cook@bistro.test");

    let (status, _) = app.get("/admin-stats", Some(&cook)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::PATCH, &format!("/users/admin/{}", cook_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedCount"], 1);
    assert_eq!(body["modifiedCount"], 1);

    let (status, body) = app.get("/users/admin/cook@bistro.test", Some(&cook)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "admin": true }));

    let (status, body) = app.get("/admin-stats", Some(&cook)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"], 2);
}

#[tokio::test]
async fn demotion_is_not_masked_by_a_cache() {
    let app = TestApp::new();
    app.seed_user("chef@bistro.test", Some("admin")).await;
    let token = app.token_for("chef@bistro.test");

    let (status, _) = app.get("/admin-stats", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let mut set = Map::new();
    set.insert("role".to_string(), json!("user"));
    app.state
        .store
        .update_one(Collection::Users, &Filter::field("email", "chef@bistro.test"), set, false)
        .await
        .unwrap();

    // Same token, role re-read from the store
    let (status, body) = app.get("/admin-stats", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "message": "forbidden" }));
}

#[tokio::test]
async fn promote_rejects_malformed_ids() {
    let app = TestApp::new();
    app.seed_user("chef@bistro.test", Some("admin")).await;
    let token = app.token_for("chef@bistro.test");

    let (status, body) = app
        .request(Method::PATCH, "/users/admin/64f1c0ffee", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = app
        .request(Method::PATCH, &format!("/users/admin/{}", Uuid::new_v4()), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedCount"], 0);
}

#[tokio::test]
async fn role_store_failure_is_service_unavailable() {
    let app = TestApp::with_store(Arc::new(UnavailableStore { delay: None }));
    let token = app.token_for("chef@bistro.test");

    let (status, body) = app.get("/admin-stats", Some(&token)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "service unavailable");

    let (status, _) = app.get("/users/admin/chef@bistro.test", Some(&token)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Stage 1 needs no store
    let (status, body) = app.get("/admin-stats", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "forbidden access" }));
}

#[tokio::test]
async fn slow_role_lookup_times_out() {
    let mut config = test_config(SECRET);
    config.security.role_lookup_timeout_ms = 50;
    let app = TestApp::build(
        config,
        Arc::new(UnavailableStore {
            delay: Some(Duration::from_millis(500)),
        }),
    );
    let token = app.token_for("chef@bistro.test");

    let (status, body) = app.get("/admin-stats", Some(&token)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn health_reports_an_unreachable_store() {
    let app = TestApp::with_store(Arc::new(UnavailableStore { delay: None }));

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "unavailable");
}

mod common;

use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn binary_serves_health_and_tokens() -> Result<()> {
    let server = common::TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(15)).await?;
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(health["status"], "ok");

    let res = client
        .post(format!("{}/jwt", server.base_url))
        .json(&json!({ "email": "guest@bistro.test" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let token = res.json::<Value>().await?["token"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(!token.is_empty());

    // Authenticated, but no user record and so no admin role
    let res = client
        .get(format!("{}/admin-stats", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.json::<Value>().await?, json!({ "message": "forbidden" }));

    let res = client
        .get(format!("{}/payments?email=guest@bistro.test", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?, json!({ "message": "forbidden access" }));

    Ok(())
}

mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn protected_routes_reject_missing_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in [
        "/api/auth/whoami",
        "/api/users",
        "/api/roles",
        "/api/groups",
        "/api/rules",
        "/api/businesses",
        "/api/audit",
        "/api/root/tenants",
    ] {
        let res = client.get(format!("{}{}", server.base_url, path)).send().await?;
        assert_eq!(
            res.status(),
            StatusCode::UNAUTHORIZED,
            "expected 401 for {} without a token",
            path
        );

        let body = res.json::<serde_json::Value>().await?;
        assert_eq!(body["error"], json!(true));
        assert_eq!(body["code"], json!("UNAUTHORIZED"));
    }

    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_garbage_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_rejects_invalid_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/refresh", server.base_url))
        .json(&json!({ "token": "expired.or.garbage" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_never_leaks_tenant_existence() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({
            "tenant": "no-such-tenant",
            "email": "nobody@example.test",
            "password": "wrong-password"
        }))
        .send()
        .await?;

    // 401 with a database, 5xx without one; never a 404 that would reveal
    // whether the tenant exists
    assert!(
        res.status() == StatusCode::UNAUTHORIZED || res.status().is_server_error(),
        "unexpected status: {}",
        res.status()
    );
    Ok(())
}

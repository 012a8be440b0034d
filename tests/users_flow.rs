mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{read_json, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn super_admin_manages_users() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let id = app
        .create(
            "/users",
            &json!({ "name": "Ivo", "email": "ivo@example.com", "password": "pw", "isSuperAdmin": true }),
            &token,
        )
        .await?;

    let user: Value = read_json(app.get(&format!("/users/{id}"), Some(&token)).await?).await?;
    assert_eq!(user["email"], "ivo@example.com");
    assert_eq!(user["isSuperAdmin"], true);
    assert!(user.get("passwordHash").is_none());
    assert!(user.get("refreshToken").is_none());

    let update = app
        .put_json(
            &format!("/users/{id}"),
            &json!({ "name": "Ivo Neto", "password": "new-pw" }),
            Some(&token),
        )
        .await?;
    assert_eq!(update.status(), StatusCode::OK);
    app.login("ivo@example.com", "new-pw").await?;

    let listed: Value = read_json(app.get("/users?q=neto", Some(&token)).await?).await?;
    assert_eq!(listed["total"], 1);

    let delete = app.delete(&format!("/users/{id}"), Some(&token)).await?;
    assert_eq!(delete.status(), StatusCode::OK);
    let missing = app.get(&format!("/users/{id}"), Some(&token)).await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn regular_user_cannot_grant_super_admin() -> Result<()> {
    let app = TestApp::new().await?;
    app.insert_user("jo@example.com", "pw", false).await?;
    let token = app.login("jo@example.com", "pw").await?.token;

    let forbidden = app
        .post_json(
            "/users",
            &json!({ "name": "Kai", "email": "kai@example.com", "password": "pw", "isSuperAdmin": true }),
            Some(&token),
        )
        .await?;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let allowed = app
        .post_json(
            "/users",
            &json!({ "name": "Kai", "email": "kai@example.com", "password": "pw" }),
            Some(&token),
        )
        .await?;
    assert_eq!(allowed.status(), StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn duplicate_user_email_conflicts() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let other = app
        .create(
            "/users",
            &json!({ "name": "Lia", "email": "lia@example.com", "password": "pw" }),
            &token,
        )
        .await?;

    let create = app
        .post_json(
            "/users",
            &json!({ "name": "Lia 2", "email": "LIA@example.com", "password": "pw" }),
            Some(&token),
        )
        .await?;
    assert_eq!(create.status(), StatusCode::CONFLICT);

    let update = app
        .put_json(
            &format!("/users/{other}"),
            &json!({ "email": common::ADMIN_EMAIL }),
            Some(&token),
        )
        .await?;
    assert_eq!(update.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn regular_user_cannot_modify_or_delete_other_accounts() -> Result<()> {
    let app = TestApp::new().await?;
    let admin_id = app
        .insert_user(common::ADMIN_EMAIL, common::ADMIN_PASSWORD, true)
        .await?;

    let signup = app
        .post_json(
            "/auth/signup",
            &json!({ "name": "Eve", "email": "eve@example.com", "password": "pw" }),
            None,
        )
        .await?;
    assert_eq!(signup.status(), StatusCode::CREATED);
    let eve: Value = read_json(signup).await?;
    let eve_id = eve["id"].as_str().unwrap_or_default().to_string();
    let token = app.login("eve@example.com", "pw").await?.token;

    let takeover = app
        .put_json(
            &format!("/users/{admin_id}"),
            &json!({ "password": "owned" }),
            Some(&token),
        )
        .await?;
    assert_eq!(takeover.status(), StatusCode::FORBIDDEN);

    let delete = app.delete(&format!("/users/{admin_id}"), Some(&token)).await?;
    assert_eq!(delete.status(), StatusCode::FORBIDDEN);

    let promote = app
        .put_json(
            &format!("/users/{eve_id}"),
            &json!({ "isSuperAdmin": true }),
            Some(&token),
        )
        .await?;
    assert_eq!(promote.status(), StatusCode::FORBIDDEN);

    let own = app
        .put_json(
            &format!("/users/{eve_id}"),
            &json!({ "name": "Eve Lima" }),
            Some(&token),
        )
        .await?;
    assert_eq!(own.status(), StatusCode::OK);

    let admin = app
        .login(common::ADMIN_EMAIL, common::ADMIN_PASSWORD)
        .await?;
    assert_eq!(admin.user["isSuperAdmin"], true);
    Ok(())
}

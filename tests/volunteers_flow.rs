mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Utc;
use common::{read_json, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn volunteer_crud_flow() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let id = app
        .create(
            "/volunteers",
            &json!({
                "fullName": "Ana Maria Souza",
                "email": "Ana@Example.com",
                "startDate": "2024-01-01",
                "notes": "likes robots"
            }),
            &token,
        )
        .await?;

    let response = app.get(&format!("/volunteers/{id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let volunteer: Value = read_json(response).await?;
    assert_eq!(volunteer["firstName"], "Ana");
    assert_eq!(volunteer["lastName"], "Maria Souza");
    assert_eq!(volunteer["email"], "ana@example.com");
    assert_eq!(volunteer["status"], "ACTIVE");
    assert_eq!(volunteer["startDate"], "2024-01-01");
    assert_eq!(volunteer["endDate"], Value::Null);

    let update = app
        .put_json(
            &format!("/volunteers/{id}"),
            &json!({ "phone": "555-0100", "notes": null }),
            Some(&token),
        )
        .await?;
    assert_eq!(update.status(), StatusCode::OK);
    let updated: Value = read_json(update).await?;
    assert_eq!(updated["phone"], "555-0100");
    assert_eq!(updated["notes"], Value::Null);
    assert_eq!(updated["email"], "ana@example.com");

    let delete = app.delete(&format!("/volunteers/{id}"), Some(&token)).await?;
    assert_eq!(delete.status(), StatusCode::OK);

    let missing = app.get(&format!("/volunteers/{id}"), Some(&token)).await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn accepts_legacy_snake_case_payload() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let response = app
        .post_json(
            "/volunteers",
            &json!({
                "full_name": "Bruno Lima",
                "entry_date": "2023-05-02",
                "is_active": false,
                "emergency_contact": "Carla",
                "emergency_phone": "555-0199"
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let volunteer: Value = read_json(response).await?;
    assert_eq!(volunteer["fullName"], "Bruno Lima");
    assert_eq!(volunteer["startDate"], "2023-05-02");
    assert_eq!(volunteer["status"], "INACTIVE");
    assert_eq!(volunteer["emergencyContactName"], "Carla");
    assert_eq!(volunteer["emergencyContactPhone"], "555-0199");
    Ok(())
}

#[tokio::test]
async fn rejects_invalid_volunteers() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let no_name = app
        .post_json("/volunteers", &json!({ "startDate": "2024-01-01" }), Some(&token))
        .await?;
    assert_eq!(no_name.status(), StatusCode::BAD_REQUEST);

    let no_start = app
        .post_json("/volunteers", &json!({ "fullName": "X Y" }), Some(&token))
        .await?;
    assert_eq!(no_start.status(), StatusCode::BAD_REQUEST);

    app.create(
        "/volunteers",
        &json!({ "fullName": "Dup One", "email": "dup@example.com", "startDate": "2024-01-01" }),
        &token,
    )
    .await?;
    let duplicate = app
        .post_json(
            "/volunteers",
            &json!({ "fullName": "Dup Two", "email": "DUP@example.com", "startDate": "2024-01-01" }),
            Some(&token),
        )
        .await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn exit_sets_end_date_and_inactive() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let id = app
        .create(
            "/volunteers",
            &json!({ "fullName": "Dora Reis", "startDate": "2024-01-01" }),
            &token,
        )
        .await?;

    let exit = app
        .put_json(&format!("/volunteers/{id}/exit"), &json!({}), Some(&token))
        .await?;
    assert_eq!(exit.status(), StatusCode::OK);
    let body: Value = read_json(exit).await?;
    assert_eq!(body, json!({ "success": true }));

    let volunteer: Value = read_json(app.get(&format!("/volunteers/{id}"), Some(&token)).await?).await?;
    assert_eq!(volunteer["status"], "INACTIVE");
    assert_eq!(
        volunteer["endDate"],
        Utc::now().date_naive().format("%Y-%m-%d").to_string()
    );

    let rejoined = app
        .put_json(
            &format!("/volunteers/{id}"),
            &json!({ "endDate": "2024-02-01", "status": "ACTIVE" }),
            Some(&token),
        )
        .await?;
    assert_eq!(rejoined.status(), StatusCode::OK);
    let rejoined: Value = read_json(rejoined).await?;
    assert_eq!(rejoined["endDate"], "2024-02-01");

    let again = app
        .put_json(&format!("/volunteers/{id}/exit"), &json!({}), Some(&token))
        .await?;
    assert_eq!(again.status(), StatusCode::OK);
    let volunteer: Value = read_json(app.get(&format!("/volunteers/{id}"), Some(&token)).await?).await?;
    assert_eq!(volunteer["status"], "INACTIVE");
    assert_eq!(
        volunteer["endDate"],
        Utc::now().date_naive().format("%Y-%m-%d").to_string()
    );

    let unknown = app
        .put_json(
            &format!("/volunteers/{}/exit", uuid::Uuid::new_v4()),
            &json!({}),
            Some(&token),
        )
        .await?;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_filters_and_paginates() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    for name in ["Eva Alves", "Eduardo Melo", "Fabio Nunes"] {
        app.create(
            "/volunteers",
            &json!({ "fullName": name, "startDate": "2024-01-01" }),
            &token,
        )
        .await?;
    }
    let inactive = app
        .create(
            "/volunteers",
            &json!({ "fullName": "Eli Costa", "startDate": "2024-01-01", "status": "INACTIVE" }),
            &token,
        )
        .await?;

    let search: Value = read_json(app.get("/volunteers?q=ed", Some(&token)).await?).await?;
    assert_eq!(search["total"], 1);
    assert_eq!(search["items"][0]["fullName"], "Eduardo Melo");

    let active: Value =
        read_json(app.get("/volunteers?status=active", Some(&token)).await?).await?;
    assert_eq!(active["total"], 3);

    let only_inactive: Value =
        read_json(app.get("/volunteers?status=INACTIVE", Some(&token)).await?).await?;
    assert_eq!(only_inactive["total"], 1);
    assert_eq!(only_inactive["items"][0]["id"], inactive.to_string());

    let paged: Value =
        read_json(app.get("/volunteers?page=2&limit=3", Some(&token)).await?).await?;
    assert_eq!(paged["total"], 4);
    assert_eq!(paged["page"], 2);
    assert_eq!(paged["items"].as_array().map(Vec::len), Some(1));

    let bad_status = app.get("/volunteers?status=gone", Some(&token)).await?;
    assert_eq!(bad_status.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn active_count_report() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let first = app
        .create(
            "/volunteers",
            &json!({ "fullName": "Gabi Rocha", "startDate": "2024-01-01" }),
            &token,
        )
        .await?;
    app.create(
        "/volunteers",
        &json!({ "fullName": "Hugo Dias", "startDate": "2024-01-01" }),
        &token,
    )
    .await?;

    let count: i64 = read_json(
        app.get("/reports/volunteers/active-count", Some(&token))
            .await?,
    )
    .await?;
    assert_eq!(count, 2);

    app.put_json(&format!("/volunteers/{first}/exit"), &json!({}), Some(&token))
        .await?;
    let count: i64 = read_json(
        app.get("/reports/volunteers/active-count", Some(&token))
            .await?,
    )
    .await?;
    assert_eq!(count, 1);
    Ok(())
}

#[tokio::test]
async fn huge_page_number_returns_an_empty_page() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    app.create(
        "/volunteers",
        &json!({ "fullName": "Gil Rocha", "startDate": "2024-01-01" }),
        &token,
    )
    .await?;

    let response = app
        .get(&format!("/volunteers?page={}", i64::MAX), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await?;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"], json!([]));
    Ok(())
}

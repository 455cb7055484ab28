//! End-to-end submission tests against a real database.
//!
//! Run with `DATABASE_URL` pointing at a scratch PostgreSQL server:
//! `cargo test -p formflow-api -- --ignored`.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json, put_json};
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio::task::JoinSet;

fn signup_form(settings: Value) -> Value {
    json!({
        "title": "Open House",
        "settings": settings,
        "sections": [{"id": "s", "fields": [
            {"id": "fullName", "type": "text", "label": "Your name", "required": true},
            {"id": "mail", "type": "email", "label": "Email"},
            {"id": "wa", "type": "whatsapp-consent", "label": "WhatsApp updates"}
        ]}]
    })
}

fn answers(name: &str, email: &str) -> Value {
    json!({"responses": [
        {"fieldId": "fullName", "value": name},
        {"fieldId": "mail", "value": email},
        {"fieldId": "wa", "value": true}
    ]})
}

/// Create and publish a form; returns its id.
async fn publish(pool: &PgPool, settings: Value) -> i64 {
    let app = common::build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/forms", signup_form(settings)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json(app, &format!("/api/v1/forms/{id}/publish"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    id
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn published_form_accepts_and_routes_submission(pool: PgPool) {
    let form_id = publish(&pool, json!({"customSlug": "open-house"})).await;

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/public/forms/open-house").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["id"], form_id);

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/public/forms/open-house/submit",
        answers("Meera", "meera@example.org"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["collection"], "lead");
    assert_eq!(json["data"]["opt_ins"]["whatsapp"], true);

    let app = common::build_test_app(pool);
    let leads = body_json(get(app, "/api/v1/leads").await).await;
    assert_eq!(leads["data"][0]["name"], "Meera");
    assert_eq!(leads["data"][0]["form_id"], form_id);
    assert_eq!(leads["data"][0]["whatsapp_opt_in"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn response_limit_is_enforced(pool: PgPool) {
    publish(&pool, json!({"customSlug": "tiny", "maxResponses": 1})).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/public/forms/tiny/submit", answers("A", "a@x.org")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/public/forms/tiny/submit", answers("B", "b@x.org")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "Response limit reached");
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn single_response_forms_reject_repeat_submitter(pool: PgPool) {
    publish(
        &pool,
        json!({"customSlug": "once", "allowMultipleResponses": false}),
    )
    .await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/public/forms/once/submit", answers("A", "a@x.org")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/public/forms/once/submit", answers("A", "A@X.org")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn draft_forms_are_not_public(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/forms",
        signup_form(json!({"customSlug": "draft"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/public/forms/draft").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn legacy_path_routes_by_form_type(pool: PgPool) {
    let form_id = publish(&pool, json!({})).await;

    let mut payload = answers("Ravi", "ravi@example.org");
    payload["formId"] = json!(form_id);
    payload["formType"] = json!("swayamsevak");

    let app = common::build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/responses", payload).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["collection"], "volunteer");

    let app = common::build_test_app(pool);
    let volunteers = body_json(get(app, "/api/v1/volunteers").await).await;
    assert_eq!(volunteers["data"][0]["name"], "Ravi");
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn second_form_cannot_take_a_published_slug(pool: PgPool) {
    publish(&pool, json!({"customSlug": "taken"})).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/forms", signup_form(json!({"customSlug": "taken"}))).await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool);
    let response = post_json(app, &format!("/api/v1/forms/{id}/publish"), json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_submissions_respect_the_response_limit(pool: PgPool) {
    publish(&pool, json!({"customSlug": "rush", "maxResponses": 1})).await;

    let mut submissions = JoinSet::new();
    for i in 0..8 {
        let app = common::build_test_app(pool.clone());
        submissions.spawn(async move {
            let email = format!("p{i}@x.org");
            post_json(app, "/api/v1/public/forms/rush/submit", answers("P", &email))
                .await
                .status()
        });
    }

    let mut created = 0;
    while let Some(status) = submissions.join_next().await {
        match status.unwrap() {
            StatusCode::CREATED => created += 1,
            other => assert_eq!(other, StatusCode::CONFLICT),
        }
    }
    assert_eq!(created, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_repeat_submitter_is_admitted_once(pool: PgPool) {
    publish(
        &pool,
        json!({"customSlug": "once-only", "allowMultipleResponses": false}),
    )
    .await;

    let mut submissions = JoinSet::new();
    for _ in 0..6 {
        let app = common::build_test_app(pool.clone());
        submissions.spawn(async move {
            post_json(app, "/api/v1/public/forms/once-only/submit", answers("A", "a@x.org"))
                .await
                .status()
        });
    }

    let mut created = 0;
    while let Some(status) = submissions.join_next().await {
        if status.unwrap() == StatusCode::CREATED {
            created += 1;
        }
    }
    assert_eq!(created, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn published_form_follows_a_changed_custom_slug(pool: PgPool) {
    let form_id = publish(&pool, json!({"customSlug": "spring-fair"})).await;

    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &format!("/api/v1/forms/{form_id}"),
        signup_form(json!({"customSlug": "autumn-fair"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["slug"], "autumn-fair");

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/public/forms/autumn-fair").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["id"], form_id);

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/public/forms/spring-fair").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn slug_change_onto_another_published_form_conflicts(pool: PgPool) {
    publish(&pool, json!({"customSlug": "first"})).await;
    let second = publish(&pool, json!({"customSlug": "second"})).await;

    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &format!("/api/v1/forms/{second}"),
        signup_form(json!({"customSlug": "first"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/public/forms/second").await;
    assert_eq!(response.status(), StatusCode::OK);
}

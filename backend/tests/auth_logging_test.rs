mod common;

use serde_json::Value;
use time::{Duration, OffsetDateTime};

#[tokio::test]
async fn expired_admin_token_is_logged_but_not_disclosed() {
    let (logs, _guard) = common::capture_logs();
    let app = common::setup_test_app().await;

    let token = app
        .tokens
        .issue_admin_token_at(
            "65a1b2c3d4e5f60718293a4b",
            "support@showcase.test",
            None,
            OffsetDateTime::now_utc() - Duration::days(8),
        )
        .unwrap();

    let resp = common::http_client()
        .get(app.url("/api/tickets"))
        .header("Authorization", common::bearer(&token))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    let text = body.to_string();
    assert!(!text.contains("expired"), "response leaked cause: {text}");
    assert_eq!(body["error"], "Authentication required");

    let logged = logs.contents();
    assert!(logged.contains("Admin token rejected"), "logs: {logged}");
    assert!(logged.contains("expired"), "logs: {logged}");
    assert!(!logged.contains(&token), "raw token must not be logged");
}

#[tokio::test]
async fn expired_session_cause_is_logged() {
    let (logs, _guard) = common::capture_logs();
    let app = common::setup_test_app().await;

    let resp = common::http_client()
        .delete(app.url("/api/projects/65a1b2c3d4e5f60718293a4b"))
        .header("Authorization", common::bearer(common::EXPIRED_SESSION))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let logged = logs.contents();
    assert!(logged.contains("Session token rejected"), "logs: {logged}");
    assert!(logged.contains("expired"), "logs: {logged}");
}

#[tokio::test]
async fn failed_ticket_insert_does_not_log_requester_email() {
    let (logs, _guard) = common::capture_logs();
    let app = common::setup_test_app().await;
    app.store.fail_writes();

    let resp = common::http_client()
        .post(app.url("/api/tickets"))
        .json(&serde_json::json!({
            "name": "Ada",
            "email": "ada.private@example.com",
            "subject": "Docs build fails",
            "message": "The example in chapter 2 does not compile.",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Internal server error");

    let logged = logs.contents();
    assert!(logged.contains("tickets.create"), "logs: {logged}");
    assert!(!logged.contains("ada.private@example.com"), "logs: {logged}");
}

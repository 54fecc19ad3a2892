mod common;

use serde_json::{json, Value};
use showcase_backend::db::Collection;

#[tokio::test]
async fn opening_a_ticket_returns_scoped_token() {
    let app = common::setup_test_app().await;
    let (ticket, token) = common::open_ticket(&app, "ada@example.com").await;

    assert_eq!(ticket["status"], "open");
    assert_eq!(ticket["priority"], "medium");
    assert_eq!(ticket["replies"], json!([]));

    let access = app.tokens.decode_ticket_token(&token).unwrap();
    assert_eq!(access.ticket_id, ticket["id"].as_str().unwrap());
    assert_eq!(access.email, "ada@example.com");
}

#[tokio::test]
async fn invalid_ticket_email_returns_400() {
    let app = common::setup_test_app().await;

    let resp = common::http_client()
        .post(app.url("/api/tickets"))
        .json(&json!({
            "name": "Ada",
            "email": "not-an-email",
            "subject": "Help",
            "message": "Please",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(app.store.calls(), 0);
}

#[tokio::test]
async fn holder_can_read_own_ticket_only() {
    let app = common::setup_test_app().await;
    let (mine, my_token) = common::open_ticket(&app, "ada@example.com").await;
    let (theirs, _) = common::open_ticket(&app, "bob@example.com").await;
    let client = common::http_client();

    let resp = client
        .get(app.url(&format!("/api/tickets/{}", mine["id"].as_str().unwrap())))
        .header("Authorization", common::bearer(&my_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["email"], "ada@example.com");

    let calls_before = app.store.calls();
    let resp = client
        .get(app.url(&format!("/api/tickets/{}", theirs["id"].as_str().unwrap())))
        .header("Authorization", common::bearer(&my_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(app.store.calls(), calls_before);
}

#[tokio::test]
async fn ticket_route_without_token_returns_401() {
    let app = common::setup_test_app().await;
    let (ticket, _) = common::open_ticket(&app, "ada@example.com").await;

    let resp = common::http_client()
        .get(app.url(&format!("/api/tickets/{}", ticket["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn admin_header_selects_admin_verification() {
    let app = common::setup_test_app().await;
    let (ticket, holder_token) = common::open_ticket(&app, "ada@example.com").await;
    let admin_token = common::admin_token(&app);
    let url = app.url(&format!("/api/tickets/{}", ticket["id"].as_str().unwrap()));
    let client = common::http_client();

    let resp = client
        .get(&url)
        .header("Authorization", common::bearer(&admin_token))
        .header("X-Admin-Request", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Admin token without the flag is checked as a ticket token.
    let resp = client
        .get(&url)
        .header("Authorization", common::bearer(&admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Ticket token with the flag is checked as an admin token.
    let resp = client
        .get(&url)
        .header("Authorization", common::bearer(&holder_token))
        .header("X-Admin-Request", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn ticket_list_requires_admin() {
    let app = common::setup_test_app().await;
    let (_ticket, holder_token) = common::open_ticket(&app, "ada@example.com").await;
    common::open_ticket(&app, "bob@example.com").await;
    let client = common::http_client();

    let resp = client.get(app.url("/api/tickets")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(app.url("/api/tickets"))
        .header("Authorization", common::bearer(&holder_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let tickets: Vec<Value> = client
        .get(app.url("/api/tickets?status=open"))
        .header("Authorization", common::bearer(&common::admin_token(&app)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tickets.len(), 2);

    let closed: Vec<Value> = client
        .get(app.url("/api/tickets?status=closed"))
        .header("Authorization", common::bearer(&common::admin_token(&app)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(closed.is_empty());
}

#[tokio::test]
async fn patching_missing_ticket_returns_404_without_mutation() {
    let app = common::setup_test_app().await;
    common::open_ticket(&app, "ada@example.com").await;
    let missing = "65a1b2c3d4e5f60718293a4b";

    let resp = common::http_client()
        .patch(app.url(&format!("/api/tickets/{}", missing)))
        .header("Authorization", common::bearer(&common::admin_token(&app)))
        .header("X-Admin-Request", "true")
        .json(&json!({ "status": "closed" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    assert_eq!(app.store.count(Collection::Tickets), 1);
    assert!(app.store.get(Collection::Tickets, missing).is_none());
}

#[tokio::test]
async fn holder_can_close_but_not_reprioritize() {
    let app = common::setup_test_app().await;
    let (ticket, token) = common::open_ticket(&app, "ada@example.com").await;
    let url = app.url(&format!("/api/tickets/{}", ticket["id"].as_str().unwrap()));
    let client = common::http_client();

    let resp = client
        .patch(&url)
        .header("Authorization", common::bearer(&token))
        .json(&json!({ "priority": "high" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .patch(&url)
        .header("Authorization", common::bearer(&token))
        .json(&json!({ "status": "resolved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .patch(&url)
        .header("Authorization", common::bearer(&token))
        .json(&json!({ "status": "closed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "closed");
    assert_eq!(body["priority"], "medium");
}

#[tokio::test]
async fn admin_can_change_status_and_priority() {
    let app = common::setup_test_app().await;
    let (ticket, _) = common::open_ticket(&app, "ada@example.com").await;

    let resp = common::http_client()
        .patch(app.url(&format!("/api/tickets/{}", ticket["id"].as_str().unwrap())))
        .header("Authorization", common::bearer(&common::admin_token(&app)))
        .header("X-Admin-Request", "true")
        .json(&json!({ "status": "in_progress", "priority": "high" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["priority"], "high");
}

#[tokio::test]
async fn unknown_status_returns_400() {
    let app = common::setup_test_app().await;
    let (ticket, token) = common::open_ticket(&app, "ada@example.com").await;
    let calls_before = app.store.calls();

    let resp = common::http_client()
        .patch(app.url(&format!("/api/tickets/{}", ticket["id"].as_str().unwrap())))
        .header("Authorization", common::bearer(&token))
        .json(&json!({ "status": "deleted" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(app.store.calls(), calls_before);
}

#[tokio::test]
async fn replies_are_attributed_by_token_kind() {
    let app = common::setup_test_app().await;
    let (ticket, token) = common::open_ticket(&app, "ada@example.com").await;
    let url = app.url(&format!("/api/tickets/{}/replies", ticket["id"].as_str().unwrap()));
    let client = common::http_client();

    let resp = client
        .post(&url)
        .header("Authorization", common::bearer(&common::admin_token(&app)))
        .header("X-Admin-Request", "true")
        .json(&json!({ "message": "Thanks, looking into it." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(&url)
        .header("Authorization", common::bearer(&token))
        .json(&json!({ "message": "Any update?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.unwrap();
    let replies = body["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["author"], "admin");
    assert_eq!(replies[1]["author"], "requester");
    assert_eq!(replies[1]["message"], "Any update?");
}

#[tokio::test]
async fn secure_link_view() {
    let app = common::setup_test_app().await;
    let (ticket, token) = common::open_ticket(&app, "ada@example.com").await;
    let client = common::http_client();

    let resp = client
        .get(app.url("/api/tickets/secure"))
        .query(&[("token", token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], ticket["id"]);

    let resp = client
        .get(app.url("/api/tickets/secure"))
        .query(&[("token", common::admin_token(&app).as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn only_admin_can_delete() {
    let app = common::setup_test_app().await;
    let (ticket, token) = common::open_ticket(&app, "ada@example.com").await;
    let url = app.url(&format!("/api/tickets/{}", ticket["id"].as_str().unwrap()));
    let client = common::http_client();

    let resp = client
        .delete(&url)
        .header("Authorization", common::bearer(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(app.store.count(Collection::Tickets), 1);

    let resp = client
        .delete(&url)
        .header("Authorization", common::bearer(&common::admin_token(&app)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(app.store.count(Collection::Tickets), 0);
}

#[tokio::test]
async fn malformed_ticket_id_returns_400_before_auth_or_store() {
    let app = common::setup_test_app().await;

    let resp = common::http_client()
        .get(app.url("/api/tickets/not-a-valid-id"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(app.store.calls(), 0);
}

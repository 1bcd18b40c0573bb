mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use common::auth_header;
use inbox_server::config::DeletedMessagePolicy;
use inbox_server::inbox::delivery;
use inbox_server::models::Role;
use inbox_server::AppState;
use serde_json::{json, Value};

struct Fixture {
    server: TestServer,
    state: Arc<AppState>,
    pool: sqlx::SqlitePool,
    seller_id: String,
    seller_token: String,
    buyer_id: String,
    buyer_token: String,
    thread_id: String,
}

async fn setup() -> Fixture {
    let pool = common::setup_test_db().await;
    let state = common::create_test_state(pool.clone());
    let server = TestServer::new(inbox_server::routes::build_router(state.clone())).unwrap();
    let ((seller_id, seller_token), (buyer_id, buyer_token)) = common::create_pair(&pool).await;
    let thread_id = common::create_test_thread(&pool, &seller_id, &buyer_id, "Order #1042").await;
    Fixture {
        server,
        state,
        pool,
        seller_id,
        seller_token,
        buyer_id,
        buyer_token,
        thread_id,
    }
}

impl Fixture {
    async fn send(&self, role: Role, token: &str, body: Value) -> axum_test::TestResponse {
        let (h, v) = auth_header(token);
        self.server
            .post(&format!("/api/{}/threads/{}/messages", role, self.thread_id))
            .add_header(h, v)
            .json(&body)
            .await
    }

    async fn seller_says(&self, content: &str) -> Value {
        let res = self
            .send(Role::Seller, &self.seller_token, json!({ "content": content }))
            .await;
        res.assert_status(StatusCode::CREATED);
        res.json()
    }

    async fn message_status(&self, message_id: &str) -> String {
        sqlx::query_scalar::<_, String>("SELECT status FROM messages WHERE id = ?")
            .bind(message_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    async fn thread_summary(&self) -> (String, String) {
        sqlx::query_as::<_, (String, String)>(
            "SELECT last_message_at, last_message_preview FROM threads WHERE id = ?",
        )
        .bind(&self.thread_id)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    fn seller_message_path(&self, message_id: &str) -> String {
        format!("/api/seller/threads/{}/messages/{}", self.thread_id, message_id)
    }
}

#[tokio::test]
async fn image_only_message_is_accepted() {
    let f = setup().await;

    let form = MultipartForm::new().add_text("content", "").add_part(
        "files",
        Part::bytes(vec![0x89, 0x50, 0x4e, 0x47])
            .file_name("photo.png")
            .mime_type("image/png"),
    );
    let (h, v) = auth_header(&f.buyer_token);
    let res = f
        .server
        .post(&format!("/api/buyer/threads/{}/messages", f.thread_id))
        .add_header(h, v)
        .multipart(form)
        .await;

    res.assert_status(StatusCode::CREATED);
    let message: Value = res.json();
    assert_eq!(message["content"], "");
    let attachments = message["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["type"], "image");
    assert_eq!(attachments[0]["originalName"], "photo.png");
    assert_eq!(attachments[0]["size"], 4);

    let preview = sqlx::query_scalar::<_, String>("SELECT last_message_preview FROM threads WHERE id = ?")
        .bind(&f.thread_id)
        .fetch_one(&f.pool)
        .await
        .unwrap();
    assert_eq!(preview, "Sent an image");
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let f = setup().await;

    for body in [json!({ "content": "" }), json!({ "content": "   \n " })] {
        let res = f.send(Role::Buyer, &f.buyer_token, body).await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let error: Value = res.json();
        assert_eq!(error["error"], "A message needs text or at least one attachment");
        assert_eq!(error["field"], "content");
    }

    assert_eq!(common::unread_counts(&f.pool, &f.thread_id).await, (0, 0));
}

#[tokio::test]
async fn content_is_trimmed_and_counters_follow_author() {
    let f = setup().await;

    let res = f
        .send(Role::Buyer, &f.buyer_token, json!({ "content": "  Any discount?  " }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let message: Value = res.json();
    assert_eq!(message["content"], "Any discount?");
    assert_eq!(message["status"], "sent");
    assert_eq!(message["senderType"], "buyer");
    assert_eq!(message["readBy"], json!([f.buyer_id]));
    assert_eq!(common::unread_counts(&f.pool, &f.thread_id).await, (1, 0));

    f.send(Role::Buyer, &f.buyer_token, json!({ "content": "Hello?" }))
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(common::unread_counts(&f.pool, &f.thread_id).await, (2, 0));

    f.seller_says("5% off").await;
    assert_eq!(common::unread_counts(&f.pool, &f.thread_id).await, (0, 1));
}

#[tokio::test]
async fn only_sender_can_edit() {
    let f = setup().await;
    let message = f.seller_says("Price is $10").await;
    let message_id = message["id"].as_str().unwrap();
    let path = format!("/api/seller/threads/{}/messages/{}", f.thread_id, message_id);

    let (h, v) = auth_header(&f.seller_token);
    let res = f
        .server
        .put(&path)
        .add_header(h, v)
        .json(&json!({ "content": "Price is $9" }))
        .await;
    res.assert_status_ok();
    let edited: Value = res.json();
    assert_eq!(edited["isEdited"], true);
    assert_eq!(edited["content"], "Price is $9");
    assert!(edited["editedAt"].is_string());

    let (h, v) = auth_header(&f.buyer_token);
    f.server
        .put(&format!("/api/buyer/threads/{}/messages/{}", f.thread_id, message_id))
        .add_header(h, v)
        .json(&json!({ "content": "Price is $1" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn message_from_another_thread_is_not_found() {
    let f = setup().await;
    let other_thread =
        common::create_test_thread(&f.pool, &f.seller_id, &f.buyer_id, "Other order").await;
    let message = f.seller_says("In the first thread").await;

    let (h, v) = auth_header(&f.seller_token);
    f.server
        .put(&format!(
            "/api/seller/threads/{}/messages/{}",
            other_thread,
            message["id"].as_str().unwrap()
        ))
        .add_header(h, v)
        .json(&json!({ "content": "moved" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_leaves_tombstone() {
    let f = setup().await;
    let message = f.seller_says("Oops, wrong thread").await;
    let message_id = message["id"].as_str().unwrap();

    let (h, v) = auth_header(&f.buyer_token);
    f.server
        .delete(&format!("/api/buyer/threads/{}/messages/{}", f.thread_id, message_id))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (h, v) = auth_header(&f.seller_token);
    let res = f
        .server
        .delete(&format!("/api/seller/threads/{}/messages/{}", f.thread_id, message_id))
        .add_header(h, v)
        .await;
    res.assert_status_ok();
    let deleted: Value = res.json();
    assert_eq!(deleted["isDeleted"], true);
    assert_eq!(deleted["content"], "This message was deleted");

    let (h, v) = auth_header(&f.buyer_token);
    let page: Value = f
        .server
        .get(&format!("/api/buyer/threads/{}/messages", f.thread_id))
        .add_header(h, v)
        .await
        .json();
    let messages = page["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["isDeleted"], true);

    let (h, v) = auth_header(&f.seller_token);
    f.server
        .put(&format!("/api/seller/threads/{}/messages/{}", f.thread_id, message_id))
        .add_header(h, v)
        .json(&json!({ "content": "restored" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reacting_twice_restores_original_state() {
    let f = setup().await;
    let message = f.seller_says("Shipped!").await;
    let path = format!(
        "/api/buyer/threads/{}/messages/{}/react",
        f.thread_id,
        message["id"].as_str().unwrap()
    );

    let (h, v) = auth_header(&f.buyer_token);
    let first: Value = f
        .server
        .post(&path)
        .add_header(h, v)
        .json(&json!({ "emoji": "👍" }))
        .await
        .json();
    let reactions = first["reactions"].as_array().unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0]["emoji"], "👍");
    assert_eq!(reactions[0]["userId"], f.buyer_id.as_str());

    let (h, v) = auth_header(&f.buyer_token);
    let second: Value = f
        .server
        .post(&path)
        .add_header(h, v)
        .json(&json!({ "emoji": "👍" }))
        .await
        .json();
    assert!(second["reactions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn forward_copies_content_and_attachments() {
    let f = setup().await;
    let (other_buyer, _) = common::create_test_user(&f.pool, "erin", Role::Buyer).await;
    let target = common::create_test_thread(&f.pool, &f.seller_id, &other_buyer, "Same spec, new buyer").await;

    let form = MultipartForm::new().add_text("content", "Spec sheet attached").add_part(
        "files",
        Part::bytes(b"%PDF-1.4".to_vec())
            .file_name("spec.pdf")
            .mime_type("application/pdf"),
    );
    let (h, v) = auth_header(&f.seller_token);
    let original: Value = f
        .server
        .post(&format!("/api/seller/threads/{}/messages", f.thread_id))
        .add_header(h, v)
        .multipart(form)
        .await
        .json();
    let original_id = original["id"].as_str().unwrap();

    let (h, v) = auth_header(&f.seller_token);
    let res = f
        .server
        .post(&format!(
            "/api/seller/threads/{}/messages/{}/forward",
            f.thread_id, original_id
        ))
        .add_header(h, v)
        .json(&json!({ "targetThreadId": target }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let forwarded: Value = res.json();

    assert_eq!(forwarded["threadId"], target.as_str());
    assert_eq!(forwarded["content"], original["content"]);
    assert_eq!(forwarded["forwardedFrom"]["messageId"], original_id);
    assert_eq!(forwarded["forwardedFrom"]["threadId"], f.thread_id.as_str());
    assert_eq!(forwarded["forwardedFrom"]["originalSenderId"], f.seller_id.as_str());
    assert!(forwarded["replyTo"].is_null());

    let copied = forwarded["attachments"].as_array().unwrap();
    let source = original["attachments"].as_array().unwrap();
    assert_eq!(copied.len(), 1);
    assert_eq!(copied[0]["path"], source[0]["path"]);
    assert_eq!(copied[0]["type"], "file");
    assert_ne!(copied[0]["id"], source[0]["id"]);
}

#[tokio::test]
async fn forward_into_foreign_thread_is_not_found() {
    let f = setup().await;
    let (stranger_seller, _) = common::create_test_user(&f.pool, "globex", Role::Seller).await;
    let foreign = common::create_test_thread(&f.pool, &stranger_seller, &f.buyer_id, "Not yours").await;
    let message = f.seller_says("Confidential quote").await;

    let (h, v) = auth_header(&f.seller_token);
    f.server
        .post(&format!(
            "/api/seller/threads/{}/messages/{}/forward",
            f.thread_id,
            message["id"].as_str().unwrap()
        ))
        .add_header(h, v)
        .json(&json!({ "targetThreadId": foreign }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reply_to_must_be_in_same_thread() {
    let f = setup().await;
    let other_thread =
        common::create_test_thread(&f.pool, &f.seller_id, &f.buyer_id, "Other order").await;
    let first = f.seller_says("Quote attached").await;

    let res = f
        .send(
            Role::Buyer,
            &f.buyer_token,
            json!({ "content": "Looks good", "replyTo": first["id"] }),
        )
        .await;
    res.assert_status(StatusCode::CREATED);
    let reply: Value = res.json();
    assert_eq!(reply["replyTo"], first["id"]);

    let (h, v) = auth_header(&f.buyer_token);
    f.server
        .post(&format!("/api/buyer/threads/{}/messages", other_thread))
        .add_header(h, v)
        .json(&json!({ "content": "Wrong place", "replyTo": first["id"] }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mark_read_promotes_counterpart_messages() {
    let f = setup().await;
    let message = f.seller_says("Invoice ready").await;
    let message_id = message["id"].as_str().unwrap();
    assert_eq!(common::unread_counts(&f.pool, &f.thread_id).await, (0, 1));

    let (h, v) = auth_header(&f.buyer_token);
    let thread: Value = f
        .server
        .post(&format!("/api/buyer/threads/{}/read", f.thread_id))
        .add_header(h, v)
        .await
        .json();
    assert_eq!(thread["buyerUnreadCount"], 0);
    assert_eq!(f.message_status(message_id).await, "read");

    let (h, v) = auth_header(&f.buyer_token);
    let page: Value = f
        .server
        .get(&format!("/api/buyer/threads/{}/messages", f.thread_id))
        .add_header(h, v)
        .await
        .json();
    let read_by = page["messages"][0]["readBy"].as_array().unwrap();
    assert!(read_by.contains(&json!(f.buyer_id)));
}

#[tokio::test]
async fn targeted_read_receipt_leaves_counters() {
    let f = setup().await;
    let message = f.seller_says("Tracking number inside").await;
    let message_id = message["id"].as_str().unwrap();

    let (h, v) = auth_header(&f.buyer_token);
    let res = f
        .server
        .post(&format!(
            "/api/buyer/threads/{}/messages/{}/read",
            f.thread_id, message_id
        ))
        .add_header(h, v)
        .await;
    res.assert_status_ok();
    let read: Value = res.json();
    assert_eq!(read["status"], "read");
    assert_eq!(common::unread_counts(&f.pool, &f.thread_id).await, (0, 1));
}

#[tokio::test]
async fn delivery_promotes_once_and_never_regresses() {
    let f = setup().await;
    let first = f.seller_says("First").await;
    let second = f.seller_says("Second").await;
    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();

    // Buyer reads the second before the worker gets to it.
    let (h, v) = auth_header(&f.buyer_token);
    f.server
        .post(&format!("/api/buyer/threads/{}/messages/{}/read", f.thread_id, second_id))
        .add_header(h, v)
        .await
        .assert_status_ok();

    let promoted = delivery::process_due(&f.state).await.unwrap();
    assert_eq!(promoted, 1);
    assert_eq!(f.message_status(first_id).await, "delivered");
    assert_eq!(f.message_status(second_id).await, "read");

    assert_eq!(delivery::process_due(&f.state).await.unwrap(), 0);
    let pending = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM delivery_outbox")
        .fetch_one(&f.pool)
        .await
        .unwrap();
    assert_eq!(pending, 0);
}

#[tokio::test]
async fn messages_page_newest_first_in_chronological_order() {
    let f = setup().await;
    for content in ["one", "two", "three"] {
        f.seller_says(content).await;
    }

    let (h, v) = auth_header(&f.buyer_token);
    let page: Value = f
        .server
        .get(&format!("/api/buyer/threads/{}/messages?limit=2", f.thread_id))
        .add_header(h, v)
        .await
        .json();
    let contents: Vec<&str> = page["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["two", "three"]);
    assert_eq!(page["pagination"]["total"], 3);

    let (h, v) = auth_header(&f.buyer_token);
    let older: Value = f
        .server
        .get(&format!("/api/buyer/threads/{}/messages?limit=2&page=2", f.thread_id))
        .add_header(h, v)
        .await
        .json();
    assert_eq!(older["messages"][0]["content"], "one");
}


#[tokio::test]
async fn editing_or_deleting_older_message_keeps_thread_summary() {
    let f = setup().await;
    let older = f.seller_says("Net 30 terms").await;
    f.seller_says("Shipping Friday").await;
    let before = f.thread_summary().await;
    assert_eq!(before.1, "Shipping Friday");

    let (h, v) = auth_header(&f.seller_token);
    f.server
        .put(&f.seller_message_path(older["id"].as_str().unwrap()))
        .add_header(h, v)
        .json(&json!({ "content": "Net 45 terms" }))
        .await
        .assert_status_ok();
    assert_eq!(f.thread_summary().await, before);

    let (h, v) = auth_header(&f.seller_token);
    f.server
        .delete(&f.seller_message_path(older["id"].as_str().unwrap()))
        .add_header(h, v)
        .await
        .assert_status_ok();
    assert_eq!(f.thread_summary().await, before);
}

#[tokio::test]
async fn editing_text_only_message_to_empty_is_rejected() {
    let f = setup().await;
    let message = f.seller_says("Price is $10").await;

    let (h, v) = auth_header(&f.seller_token);
    let res = f
        .server
        .put(&f.seller_message_path(message["id"].as_str().unwrap()))
        .add_header(h, v)
        .json(&json!({ "content": "  " }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = res.json();
    assert_eq!(error["field"], "content");

    let content = sqlx::query_scalar::<_, String>("SELECT content FROM messages WHERE id = ?")
        .bind(message["id"].as_str().unwrap())
        .fetch_one(&f.pool)
        .await
        .unwrap();
    assert_eq!(content, "Price is $10");
}

#[tokio::test]
async fn hidden_deletions_leave_listing_and_total() {
    let pool = common::setup_test_db().await;
    let mut config = common::test_config();
    config.deleted_messages = DeletedMessagePolicy::Hide;
    let state = common::create_test_state_with(pool.clone(), config);
    let server = TestServer::new(inbox_server::routes::build_router(state)).unwrap();
    let ((seller_id, seller_token), (buyer_id, buyer_token)) = common::create_pair(&pool).await;
    let thread_id = common::create_test_thread(&pool, &seller_id, &buyer_id, "Order #7").await;

    let mut ids = Vec::new();
    for content in ["one", "two", "three"] {
        let (h, v) = auth_header(&seller_token);
        let message: Value = server
            .post(&format!("/api/seller/threads/{}/messages", thread_id))
            .add_header(h, v)
            .json(&json!({ "content": content }))
            .await
            .json();
        ids.push(message["id"].as_str().unwrap().to_string());
    }

    let (h, v) = auth_header(&seller_token);
    server
        .delete(&format!("/api/seller/threads/{}/messages/{}", thread_id, ids[1]))
        .add_header(h, v)
        .await
        .assert_status_ok();

    let (h, v) = auth_header(&buyer_token);
    let page: Value = server
        .get(&format!("/api/buyer/threads/{}/messages", thread_id))
        .add_header(h, v)
        .await
        .json();
    let contents: Vec<&str> = page["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["one", "three"]);
    assert_eq!(page["pagination"]["total"], 2);
}

#[tokio::test]
async fn forwarding_deleted_message_is_not_found() {
    let f = setup().await;
    let (other_buyer, _) = common::create_test_user(&f.pool, "erin", Role::Buyer).await;
    let target = common::create_test_thread(&f.pool, &f.seller_id, &other_buyer, "Spare parts").await;
    let message = f.seller_says("Old quote").await;
    let message_id = message["id"].as_str().unwrap();

    let (h, v) = auth_header(&f.seller_token);
    f.server
        .delete(&f.seller_message_path(message_id))
        .add_header(h, v)
        .await
        .assert_status_ok();

    let (h, v) = auth_header(&f.seller_token);
    f.server
        .post(&format!("{}/forward", f.seller_message_path(message_id)))
        .add_header(h, v)
        .json(&json!({ "targetThreadId": target }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let copies = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE thread_id = ?")
        .bind(&target)
        .fetch_one(&f.pool)
        .await
        .unwrap();
    assert_eq!(copies, 0);
}

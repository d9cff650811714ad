mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use common::{TestApp, TestResult, ARIA, BEATSMITH, BEX, NOVA};

#[tokio::test]
async fn health_reports_ok_without_a_token() -> TestResult {
    let app = TestApp::new().await?;
    let request = Request::builder().uri("/health").body(Body::empty())?;

    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn room_endpoints_require_a_valid_bearer_token() -> TestResult {
    let app = TestApp::new().await?;

    let request = Request::builder().uri("/api/rooms").body(Body::empty())?;
    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .uri("/api/rooms")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())?;
    let (status, _) = app.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn pairwise_room_is_created_once_from_either_side() -> TestResult {
    let app = TestApp::new().await?;

    let (status, created) = app
        .post_json(
            "/api/rooms",
            NOVA,
            json!({"participant_id": 1_000_000, "participant_kind": "producer"}),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "chat_5_1000000");
    assert_eq!(created["created"], true);
    assert_eq!(created["participants"].as_array().map(Vec::len), Some(2));

    let (status, existing) = app
        .post_json(
            "/api/rooms",
            BEATSMITH,
            json!({"participant_id": 5, "participant_kind": "artist"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(existing["id"], created["id"]);
    assert_eq!(existing["created"], false);

    let (status, rooms) = app.get("/api/rooms", NOVA).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rooms.as_array().map(Vec::len), Some(1));
    assert_eq!(rooms[0]["unread_count"], 0);
    Ok(())
}

#[tokio::test]
async fn pairwise_room_validates_the_target() -> TestResult {
    let app = TestApp::new().await?;

    let (status, _) = app
        .post_json(
            "/api/rooms",
            NOVA,
            json!({"participant_id": 7, "participant_kind": "manager"}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_json(
            "/api/rooms",
            NOVA,
            json!({"participant_id": 42, "participant_kind": "producer"}),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post_json(
            "/api/rooms",
            NOVA,
            json!({"participant_id": 5, "participant_kind": "artist"}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn listing_history_marks_incoming_messages_read() -> TestResult {
    let app = TestApp::new().await?;
    let room_id = app.pair_room(ARIA, BEATSMITH).await?;
    let messages_uri = format!("/api/rooms/{room_id}/messages");
    let unread_uri = format!("/api/rooms/{room_id}/unread-count");

    let (status, posted) = app
        .post_json(&messages_uri, ARIA, json!({"content": "hello"}))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posted["content"], "hello");
    assert_eq!(posted["sender_username"], "aria");
    assert_eq!(posted["is_current_user"], true);

    let (_, unread) = app.get(&unread_uri, BEATSMITH).await?;
    assert_eq!(unread["unread_count"], 1);
    let (_, unread) = app.get(&unread_uri, ARIA).await?;
    assert_eq!(unread["unread_count"], 0);

    let (status, history) = app.get(&messages_uri, BEATSMITH).await?;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().cloned().unwrap_or_default();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["is_current_user"], false);
    assert_eq!(history[0]["is_read"], true);
    assert_eq!(history[0]["read_status"][0]["reader_id"], 1_000_000);
    assert_eq!(history[0]["read_status"][0]["is_read"], true);

    let (_, unread) = app.get(&unread_uri, BEATSMITH).await?;
    assert_eq!(unread["unread_count"], 0);
    Ok(())
}

#[tokio::test]
async fn outsiders_cannot_touch_a_room() -> TestResult {
    let app = TestApp::new().await?;
    let room_id = app.pair_room(ARIA, BEATSMITH).await?;

    let (status, _) = app.get(&format!("/api/rooms/{room_id}/messages"), BEX).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post_json(
            &format!("/api/rooms/{room_id}/messages"),
            BEX,
            json!({"content": "let me in"}),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post_empty(&format!("/api/rooms/{room_id}/mark-read"), BEX).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/api/rooms/{room_id}"), BEX).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, detail) = app.get(&format!("/api/rooms/{room_id}"), ARIA).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["id"], room_id);

    let (status, _) = app.get("/api/rooms/9999/messages", ARIA).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn empty_messages_are_rejected() -> TestResult {
    let app = TestApp::new().await?;
    let room_id = app.pair_room(ARIA, BEATSMITH).await?;

    let (status, body) = app
        .post_json(
            &format!("/api/rooms/{room_id}/messages"),
            ARIA,
            json!({"content": "   "}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message must have content or an attachment");
    Ok(())
}

#[tokio::test]
async fn single_message_mark_read_is_idempotent() -> TestResult {
    let app = TestApp::new().await?;
    let room_id = app.pair_room(ARIA, BEATSMITH).await?;

    let (_, posted) = app
        .post_json(
            &format!("/api/rooms/{room_id}/messages"),
            ARIA,
            json!({"content": "check the mix"}),
        )
        .await?;
    let message_id = posted["id"].as_i64().unwrap_or_default();
    let uri = format!("/api/rooms/{room_id}/messages/{message_id}/mark-read");

    let (status, first) = app.post_empty(&uri, BEATSMITH).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["newly_read"], true);

    let (_, second) = app.post_empty(&uri, BEATSMITH).await?;
    assert_eq!(second["newly_read"], false);

    let (status, _) = app.post_empty(&uri, ARIA).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other_room = app.pair_room(ARIA, BEX).await?;
    let (status, _) = app
        .post_empty(
            &format!("/api/rooms/{other_room}/messages/{message_id}/mark-read"),
            BEX,
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn mark_room_read_reports_transitions() -> TestResult {
    let app = TestApp::new().await?;
    let room_id = app.pair_room(ARIA, BEATSMITH).await?;
    let messages_uri = format!("/api/rooms/{room_id}/messages");

    for content in ["one", "two"] {
        app.post_json(&messages_uri, ARIA, json!({"content": content}))
            .await?;
    }

    let (status, body) = app
        .post_empty(&format!("/api/rooms/{room_id}/mark-read"), BEATSMITH)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "marked_read_count": 2}));

    let (_, body) = app
        .post_empty(&format!("/api/rooms/{room_id}/mark-read"), BEATSMITH)
        .await?;
    assert_eq!(body["marked_read_count"], 0);
    Ok(())
}

#[tokio::test]
async fn multipart_upload_infers_the_attachment_type() -> TestResult {
    let app = TestApp::new().await?;
    let room_id = app.pair_room(ARIA, BEATSMITH).await?;

    let boundary = "backstage-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"content\"\r\n\r\n\
         new stem\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file_attachment\"; filename=\"track.mp3\"\r\n\
         Content-Type: audio/mpeg\r\n\r\n\
         ID3fakeaudio\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/rooms/{room_id}/messages"))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token(ARIA)))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))?;

    let (status, message) = app.send(request).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["content"], "new stem");
    assert_eq!(message["attachment"]["type"], "audio");
    assert_eq!(message["attachment"]["name"], "track.mp3");
    assert_eq!(message["attachment"]["size"], 12);
    assert_eq!(
        message["attachment"]["url"],
        format!("/media/chat_attachments/room_{room_id}/track.mp3")
    );
    assert!(app
        .temp_dir
        .path()
        .join("media/chat_attachments")
        .join(format!("room_{room_id}"))
        .join("track.mp3")
        .exists());
    Ok(())
}

#[tokio::test]
async fn named_room_skips_unknown_participants() -> TestResult {
    let app = TestApp::new().await?;

    let (status, room) = app
        .post_json(
            "/api/rooms/named",
            ARIA,
            json!({
                "name": "Album listening session",
                "participants": [
                    {"id": 1_000_000, "kind": "producer"},
                    {"id": 999, "kind": "artist"},
                    {"id": 2, "kind": "drummer"}
                ]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(room["name"], "Album listening session");

    let usernames: Vec<_> = room["participants"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|p| p["username"].as_str().map(str::to_string))
        .collect();
    assert_eq!(usernames, vec!["aria", "beatsmith"]);

    let (status, _) = app
        .post_json("/api/rooms/named", ARIA, json!({"name": ""}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn contacts_list_latest_activity_first() -> TestResult {
    let app = TestApp::new().await?;
    let with_producer = app.pair_room(ARIA, BEATSMITH).await?;
    let with_bex = app.pair_room(ARIA, BEX).await?;

    app.post_json(
        &format!("/api/rooms/{with_producer}/messages"),
        BEATSMITH,
        json!({"content": "older"}),
    )
    .await?;
    app.post_json(
        &format!("/api/rooms/{with_bex}/messages"),
        BEX,
        json!({"content": "newer"}),
    )
    .await?;

    let (status, contacts) = app.get("/api/chats", ARIA).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contacts[0]["username"], "bex");
    assert_eq!(contacts[0]["latest_message"], "newer");
    assert_eq!(contacts[0]["room_id"], with_bex);
    assert_eq!(contacts[1]["username"], "beatsmith");
    assert_eq!(contacts[1]["participant_kind"], "producer");
    Ok(())
}

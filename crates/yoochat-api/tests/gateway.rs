//! Websocket relay over a real socket.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, Message},
};

use common::TestApp;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(app: &TestApp) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Connect and consume `ready`. The connection is already in its room by
/// then, so nothing emitted afterwards can race past it.
async fn connect(app: &TestApp, addr: SocketAddr, user_id: i64, token: &str) -> Socket {
    let before = app.state.dispatcher.connection_count(user_id).await;
    let (mut socket, _) = connect_async(format!("ws://{addr}/gateway?token={token}"))
        .await
        .unwrap();

    let ready = next_event(&mut socket).await;
    assert_eq!(ready["event"], "ready");
    assert_eq!(ready["data"]["user_id"], user_id);
    assert_eq!(
        app.state.dispatcher.connection_count(user_id).await,
        before + 1
    );
    socket
}

async fn next_event(socket: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for an event")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_command(socket: &mut Socket, command: Value) {
    socket
        .send(Message::Text(command.to_string().into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn handshake_requires_a_valid_token() {
    let app = TestApp::new();
    let addr = serve(&app).await;

    for url in [
        format!("ws://{addr}/gateway"),
        format!("ws://{addr}/gateway?token=garbage"),
    ] {
        match connect_async(url).await {
            Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("handshake without a valid token succeeded"),
        }
    }
}

#[tokio::test]
async fn message_is_relayed_enciphered_and_echoed_plain() {
    let app = TestApp::new();
    let addr = serve(&app).await;
    let (alice, alice_token) = app.user("alice").await;
    let (bob, bob_token) = app.user("bob").await;
    app.befriend((alice, alice_token.as_str()), (bob, bob_token.as_str()))
        .await;

    let mut alice_ws = connect(&app, addr, alice, &alice_token).await;
    let mut bob_ws = connect(&app, addr, bob, &bob_token).await;

    send_command(
        &mut alice_ws,
        json!({ "event": "send_message", "data": { "to": bob, "content": "meet at noon" } }),
    )
    .await;

    let to_bob = next_event(&mut bob_ws).await;
    assert_eq!(to_bob["event"], "receive_message");
    assert_eq!(to_bob["data"]["sender_id"], alice);
    assert_eq!(to_bob["data"]["sender_name"], "alice");
    assert_ne!(to_bob["data"]["content"], "meet at noon");

    let echo = next_event(&mut alice_ws).await;
    assert_eq!(echo["event"], "receive_message");
    assert_eq!(echo["data"]["content"], "meet at noon");
    assert_eq!(echo["data"]["message_id"], to_bob["data"]["message_id"]);

    // History deciphers what the recipient saw
    let (_, body) = app
        .get(&format!("/message/conversation/{alice}"), Some(&bob_token))
        .await;
    assert_eq!(body["conversation"][0]["content"], "meet at noon");
}

#[tokio::test]
async fn friend_requests_flow_between_rooms() {
    let app = TestApp::new();
    let addr = serve(&app).await;
    let (alice, alice_token) = app.user("alice").await;
    let (bob, bob_token) = app.user("bob").await;

    let mut alice_ws = connect(&app, addr, alice, &alice_token).await;
    let mut bob_ws = connect(&app, addr, bob, &bob_token).await;

    send_command(
        &mut alice_ws,
        json!({ "event": "send_friend_request", "data": { "receiver_id": bob } }),
    )
    .await;
    let request = next_event(&mut bob_ws).await;
    assert_eq!(request["event"], "new_friend_request");
    assert_eq!(request["data"]["sender_name"], "alice");

    // Accepted over HTTP, still pushed to the sender's socket
    let (status, _) = app
        .post(
            "/friendship/acceptRequest",
            Some(&bob_token),
            json!({ "sender_id": alice }),
        )
        .await;
    assert_eq!(status, 200);
    let accepted = next_event(&mut alice_ws).await;
    assert_eq!(accepted["event"], "friend_request_accepted");
    assert_eq!(accepted["data"]["user_id"], bob);
    assert_eq!(accepted["data"]["username"], "bob");

    send_command(
        &mut bob_ws,
        json!({ "event": "unfriend", "data": { "user2_id": alice } }),
    )
    .await;
    let unfriended = next_event(&mut alice_ws).await;
    assert_eq!(unfriended["event"], "unfriended");
    assert_eq!(unfriended["data"]["user_id"], bob);
}

#[tokio::test]
async fn rejected_and_malformed_commands_answer_the_sender() {
    let app = TestApp::new();
    let addr = serve(&app).await;
    let (alice, alice_token) = app.user("alice").await;
    let (bob, _) = app.user("bob").await;

    let mut alice_ws = connect(&app, addr, alice, &alice_token).await;

    send_command(
        &mut alice_ws,
        json!({ "event": "send_message", "data": { "to": bob, "content": "hi" } }),
    )
    .await;
    let error = next_event(&mut alice_ws).await;
    assert_eq!(error["event"], "error");
    assert_eq!(error["data"]["action"], "send_message");
    assert_eq!(error["data"]["message"], "You are not friends with this user");

    alice_ws
        .send(Message::Text("{not json".into()))
        .await
        .unwrap();
    let error = next_event(&mut alice_ws).await;
    assert_eq!(error["data"]["action"], "unknown");
    assert_eq!(error["data"]["message"], "Malformed command");

    // The connection survives both
    send_command(
        &mut alice_ws,
        json!({ "event": "cancel_friend_request", "data": { "receiver_id": bob } }),
    )
    .await;
    let error = next_event(&mut alice_ws).await;
    assert_eq!(error["data"]["action"], "cancel_friend_request");
}

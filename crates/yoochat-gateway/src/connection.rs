use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use yoochat_social::{Delivery, Social, SocialError, SocialResult};
use yoochat_types::api::Claims;
use yoochat_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const MAX_MISSED_PONGS: u8 = 2;

/// Drive one websocket. The token was verified before the upgrade, so the
/// connection starts authenticated: join the user's room, send Ready, then
/// relay events out and commands in until either side stops.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    social: Arc<Social>,
    claims: Claims,
) {
    let user_id = claims.sub;
    let username = claims.username;
    let (mut sender, mut receiver) = socket.split();

    // Joined before Ready; anything emitted meanwhile waits in the channel
    let (conn_id, mut events) = dispatcher.join(user_id).await;

    let ready = GatewayEvent::Ready {
        user_id,
        username: username.clone(),
    };
    let sent = match encode(&ready) {
        Some(ready) => sender.send(ready).await.is_ok(),
        None => false,
    };
    if !sent {
        dispatcher.leave(user_id, conn_id).await;
        return;
    }
    info!("{} ({}) connected to gateway [{}]", username, user_id, conn_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;

    // Room events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let Some(msg) = encode(&event) else { continue };
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= MAX_MISSED_PONGS {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Client commands, handled one at a time
    let dispatcher_recv = dispatcher.clone();
    let username_recv = username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&social, &dispatcher_recv, user_id, conn_id, cmd).await;
                    }
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            username_recv,
                            user_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                        let reply = GatewayEvent::Error {
                            action: "unknown".to_string(),
                            message: "Malformed command".to_string(),
                        };
                        dispatcher_recv.emit_to_connection(user_id, conn_id, reply).await;
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.leave(user_id, conn_id).await;
    info!("{} ({}) disconnected from gateway [{}]", username, user_id, conn_id);
}

/// Apply one command through the same rules as the HTTP API. Successful
/// mutations fan out to the affected rooms; a rejection is reported only
/// to the connection that sent the command.
pub async fn handle_command(
    social: &Social,
    dispatcher: &Dispatcher,
    user_id: i64,
    conn_id: Uuid,
    cmd: GatewayCommand,
) {
    let action = cmd.action();
    debug!("User {} [{}] -> {}", user_id, conn_id, action);

    match run_command(social, user_id, cmd).await {
        Ok(deliveries) => dispatcher.deliver_all(deliveries).await,
        Err(e) => {
            match &e {
                SocialError::Internal(err) => {
                    error!("{} from user {} failed: {:#}", action, user_id, err)
                }
                rejected => warn!("{} from user {} rejected: {}", action, user_id, rejected),
            }
            let reply = GatewayEvent::Error {
                action: action.to_string(),
                message: e.public_message(),
            };
            dispatcher.emit_to_connection(user_id, conn_id, reply).await;
        }
    }
}

async fn run_command(
    social: &Social,
    user_id: i64,
    cmd: GatewayCommand,
) -> SocialResult<Vec<Delivery>> {
    match cmd {
        GatewayCommand::SendMessage {
            to,
            content,
            is_media,
        } => {
            social
                .send_message(user_id, Some(to), Some(content), is_media)
                .await
        }
        GatewayCommand::SendFriendRequest { receiver_id } => social
            .send_friend_request(user_id, Some(receiver_id))
            .await
            .map(|d| vec![d]),
        GatewayCommand::AcceptFriendRequest { sender_id } => social
            .accept_friend_request(user_id, Some(sender_id))
            .await
            .map(|d| vec![d]),
        GatewayCommand::DeclineFriendRequest { sender_id } => social
            .decline_friend_request(user_id, Some(sender_id))
            .await
            .map(|d| vec![d]),
        GatewayCommand::CancelFriendRequest { receiver_id } => social
            .cancel_friend_request(user_id, Some(receiver_id))
            .await
            .map(|d| vec![d]),
        GatewayCommand::Unfriend { user2_id } => social
            .unfriend(user_id, Some(user2_id))
            .await
            .map(|d| vec![d]),
    }
}

fn encode(event: &GatewayEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            error!("Failed to serialize gateway event: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yoochat_crypto::HillCipher;
    use yoochat_db::Database;
    use yoochat_types::models::SearchMode;

    fn social() -> Arc<Social> {
        let db = Database::open_in_memory().unwrap();
        for name in ["alice", "bob"] {
            db.create_user(name, &format!("{name}@example.com"), "hash", None)
                .unwrap();
        }
        let cipher = Arc::new(HillCipher::from_key("GYBNQKURP").unwrap());
        Arc::new(Social::new(Arc::new(db), cipher, SearchMode::Strict, "secret"))
    }

    #[tokio::test]
    async fn friend_request_reaches_receiver_room() {
        let social = social();
        let dispatcher = Dispatcher::new();
        let (alice_conn, mut alice_rx) = dispatcher.join(1).await;
        let (_, mut bob_rx) = dispatcher.join(2).await;

        let cmd = GatewayCommand::SendFriendRequest { receiver_id: 2 };
        handle_command(&social, &dispatcher, 1, alice_conn, cmd).await;

        match bob_rx.recv().await {
            Some(GatewayEvent::NewFriendRequest { sender_id, sender_name }) => {
                assert_eq!(sender_id, 1);
                assert_eq!(sender_name, "alice");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejection_goes_back_to_the_acting_connection() {
        let social = social();
        let dispatcher = Dispatcher::new();
        let (acting, mut acting_rx) = dispatcher.join(1).await;
        let (_, mut other_tab) = dispatcher.join(1).await;
        let (_, mut bob_rx) = dispatcher.join(2).await;

        let cmd = GatewayCommand::SendMessage {
            to: 2,
            content: "hi".into(),
            is_media: false,
        };
        handle_command(&social, &dispatcher, 1, acting, cmd).await;

        match acting_rx.recv().await {
            Some(GatewayEvent::Error { action, message }) => {
                assert_eq!(action, "send_message");
                assert_eq!(message, "You are not friends with this user");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(other_tab.try_recv().is_err());
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn message_goes_enciphered_to_recipient_and_plain_to_sender() {
        let social = social();
        let dispatcher = Dispatcher::new();
        let (alice_conn, _) = dispatcher.join(1).await;
        let (bob_conn, _) = dispatcher.join(2).await;

        handle_command(&social, &dispatcher, 1, alice_conn, GatewayCommand::SendFriendRequest { receiver_id: 2 }).await;
        handle_command(&social, &dispatcher, 2, bob_conn, GatewayCommand::AcceptFriendRequest { sender_id: 1 }).await;

        let (alice_tab, mut alice_rx) = dispatcher.join(1).await;
        let (_, mut bob_rx) = dispatcher.join(2).await;
        let cmd = GatewayCommand::SendMessage {
            to: 2,
            content: "see you soon".into(),
            is_media: false,
        };
        handle_command(&social, &dispatcher, 1, alice_tab, cmd).await;

        let Some(GatewayEvent::ReceiveMessage { content: to_bob, .. }) = bob_rx.recv().await else {
            panic!("bob got no message");
        };
        let Some(GatewayEvent::ReceiveMessage { content: echo, .. }) = alice_rx.recv().await else {
            panic!("alice got no echo");
        };
        assert_eq!(echo, "see you soon");
        assert_ne!(to_bob, echo);
    }
}

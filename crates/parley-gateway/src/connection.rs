use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{error, info, warn};
use uuid::Uuid;

use parley_core::{Actor, Core};
use parley_types::api::Claims;
use parley_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Followed workspaces, each mapped to the user's member id there.
type Subscriptions = Arc<RwLock<HashMap<Uuid, Uuid>>>;

/// Drive one WebSocket client: wait for `Identify`, reply `Ready`, then
/// forward change events for the workspaces it subscribes to.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    core: Arc<Core>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some((user_id, name)) = wait_for_identify(&mut receiver, &jwt_secret).await else {
        warn!("WebSocket client failed to identify, closing");
        return;
    };

    let ready = GatewayEvent::Ready {
        user_id,
        name: name.clone(),
    };
    if !send_event(&mut sender, &ready).await {
        return;
    }

    dispatcher.connected(user_id).await;
    info!(
        "{} ({}) connected to gateway, {} users online",
        name,
        user_id,
        dispatcher.online_users().await
    );

    run_connection_loop(sender, receiver, &dispatcher, core, user_id).await;

    dispatcher.disconnected(user_id).await;
    info!(
        "{} ({}) disconnected from gateway, {} users online",
        name,
        user_id,
        dispatcher.online_users().await
    );
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: &Dispatcher,
    core: Arc<Core>,
    user_id: Uuid,
) {
    let mut broadcast_rx = dispatcher.subscribe();
    let (local_tx, mut local_rx) = mpsc::unbounded_channel::<GatewayEvent>();

    let subscriptions: Subscriptions = Arc::new(RwLock::new(HashMap::new()));
    let send_subscriptions = subscriptions.clone();
    let send_core = core.clone();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    let Some(workspace_id) = event.workspace_id() else {
                        continue;
                    };
                    if !is_delivered_to(&*send_subscriptions.read().await, &event) {
                        continue;
                    }
                    if !send_event(&mut sender, &event).await {
                        break;
                    }

                    if matches!(
                        event,
                        GatewayEvent::WorkspaceRemoved { .. } | GatewayEvent::MemberRemoved { .. }
                    ) {
                        recheck_subscription(&send_core, user_id, workspace_id, &send_subscriptions).await;
                    }
                }
                Some(event) = local_rx.recv() => {
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
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

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(&core, user_id, cmd, &subscriptions, &local_tx).await,
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            user_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
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
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<(Uuid, String)> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some((token_data.claims.sub, token_data.claims.name));
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify)
        .await
        .ok()
        .flatten()
}

async fn handle_command(
    core: &Arc<Core>,
    user_id: Uuid,
    cmd: GatewayCommand,
    subscriptions: &Subscriptions,
    local_tx: &mpsc::UnboundedSender<GatewayEvent>,
) {
    match cmd {
        GatewayCommand::Identify { .. } => {}

        GatewayCommand::Subscribe { workspace_ids } => {
            let requested = workspace_ids.len();
            let accepted = match member_workspaces(core, user_id, workspace_ids).await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Subscription check failed for {}: {:#}", user_id, e);
                    return;
                }
            };

            info!(
                "{} subscribed to {} of {} requested workspaces",
                user_id,
                accepted.len(),
                requested
            );
            let workspace_ids: Vec<Uuid> = accepted.iter().map(|(workspace_id, _)| *workspace_id).collect();
            *subscriptions.write().await = accepted.into_iter().collect();
            let _ = local_tx.send(GatewayEvent::Subscribed { workspace_ids });
        }
    }
}

/// Keep only the workspaces where the user holds a member row, paired with
/// that member's id.
async fn member_workspaces(
    core: &Arc<Core>,
    user_id: Uuid,
    workspace_ids: Vec<Uuid>,
) -> anyhow::Result<Vec<(Uuid, Uuid)>> {
    let core = core.clone();
    tokio::task::spawn_blocking(move || {
        let actor = Actor::user(user_id);
        let mut accepted = Vec::with_capacity(workspace_ids.len());
        for workspace_id in workspace_ids {
            if accepted.iter().any(|(id, _)| *id == workspace_id) {
                continue;
            }
            if let Some(member) = core.current_member(actor, workspace_id)? {
                accepted.push((workspace_id, member.id));
            }
        }
        Ok::<_, anyhow::Error>(accepted)
    })
    .await?
}

/// Drop a subscription once the user no longer belongs to the workspace, or
/// follow their new member row if they rejoined.
async fn recheck_subscription(
    core: &Arc<Core>,
    user_id: Uuid,
    workspace_id: Uuid,
    subscriptions: &Subscriptions,
) {
    match member_workspaces(core, user_id, vec![workspace_id]).await {
        Ok(still_member) => match still_member.first() {
            Some(&(_, member_id)) => {
                subscriptions.write().await.insert(workspace_id, member_id);
            }
            None => {
                subscriptions.write().await.remove(&workspace_id);
                info!("{} unsubscribed from workspace {}", user_id, workspace_id);
            }
        },
        Err(e) => error!("Subscription recheck failed for {}: {:#}", user_id, e),
    }
}

/// A workspace event reaches a subscriber of that workspace. Events about a
/// private conversation reach its two members only.
fn is_delivered_to(subscriptions: &HashMap<Uuid, Uuid>, event: &GatewayEvent) -> bool {
    let Some(member_id) = event
        .workspace_id()
        .and_then(|workspace_id| subscriptions.get(&workspace_id))
    else {
        return false;
    };
    event
        .participants()
        .is_none_or(|participants| participants.contains(member_id))
}

async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &GatewayEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(text) => sender.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            error!("Failed to encode gateway event: {}", e);
            true
        }
    }
}

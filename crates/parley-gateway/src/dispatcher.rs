use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::trace;
use uuid::Uuid;

use parley_types::events::GatewayEvent;

const CHANNEL_CAPACITY: usize = 1024;

/// Fans change events out to every connected client. Each connection filters
/// the stream down to the workspaces it subscribed to.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Open connections per user
    connections: RwLock<HashMap<Uuid, usize>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish a workspace-scoped change event. Connection-local events
    /// (`Ready`, `Subscribed`) are never broadcast.
    pub fn publish(&self, event: GatewayEvent) {
        if event.workspace_id().is_none() {
            return;
        }
        trace!("Publishing {:?}", event);
        // No receivers just means nobody is connected.
        let _ = self.inner.broadcast_tx.send(event);
    }

    pub async fn connected(&self, user_id: Uuid) {
        *self.inner.connections.write().await.entry(user_id).or_insert(0) += 1;
    }

    pub async fn disconnected(&self, user_id: Uuid) {
        let mut connections = self.inner.connections.write().await;
        if let Some(count) = connections.get_mut(&user_id) {
            *count -= 1;
            if *count == 0 {
                connections.remove(&user_id);
            }
        }
    }

    /// Number of distinct users with at least one open connection.
    pub async fn online_users(&self) -> usize {
        self.inner.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        let event = GatewayEvent::ChannelUpdated {
            workspace_id: Uuid::new_v4(),
            channel_id: Uuid::new_v4(),
        };
        dispatcher.publish(event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn connection_local_events_are_not_broadcast() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.publish(GatewayEvent::Subscribed {
            workspace_ids: vec![],
        });
        let removed = GatewayEvent::WorkspaceRemoved {
            workspace_id: Uuid::new_v4(),
        };
        dispatcher.publish(removed.clone());

        assert_eq!(rx.recv().await.unwrap(), removed);
    }

    #[tokio::test]
    async fn publishing_without_listeners_is_harmless() {
        let dispatcher = Dispatcher::default();
        dispatcher.publish(GatewayEvent::WorkspaceUpdated {
            workspace_id: Uuid::new_v4(),
        });
    }

    #[tokio::test]
    async fn tracks_users_across_connections() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        dispatcher.connected(user).await;
        dispatcher.connected(user).await;
        assert_eq!(dispatcher.online_users().await, 1);

        dispatcher.disconnected(user).await;
        assert_eq!(dispatcher.online_users().await, 1);
        dispatcher.disconnected(user).await;
        assert_eq!(dispatcher.online_users().await, 0);
    }
}

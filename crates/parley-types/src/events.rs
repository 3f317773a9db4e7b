use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events sent over the WebSocket gateway.
///
/// Change events only name what moved; subscribers re-run their queries to
/// pick up the new state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, name: String },

    /// Server confirms which workspaces this connection now follows
    Subscribed { workspace_ids: Vec<Uuid> },

    WorkspaceUpdated { workspace_id: Uuid },
    WorkspaceRemoved { workspace_id: Uuid },

    MemberJoined { workspace_id: Uuid, member_id: Uuid },
    MemberUpdated { workspace_id: Uuid, member_id: Uuid },
    MemberRemoved { workspace_id: Uuid, member_id: Uuid },

    ChannelUpdated { workspace_id: Uuid, channel_id: Uuid },
    ChannelRemoved { workspace_id: Uuid, channel_id: Uuid },

    // `participants` holds the two member ids of a conversation. Events that
    // carry it are delivered to those members only.
    ConversationCreated {
        workspace_id: Uuid,
        conversation_id: Uuid,
        participants: [Uuid; 2],
    },

    MessageCreated {
        workspace_id: Uuid,
        message_id: Uuid,
        channel_id: Option<Uuid>,
        conversation_id: Option<Uuid>,
        parent_message_id: Option<Uuid>,
        participants: Option<[Uuid; 2]>,
    },
    MessageUpdated {
        workspace_id: Uuid,
        message_id: Uuid,
        participants: Option<[Uuid; 2]>,
    },
    MessageRemoved {
        workspace_id: Uuid,
        message_id: Uuid,
        participants: Option<[Uuid; 2]>,
    },

    ReactionToggled {
        workspace_id: Uuid,
        message_id: Uuid,
        participants: Option<[Uuid; 2]>,
    },
}

impl GatewayEvent {
    /// Returns the workspace this event is scoped to.
    /// Events that return `None` are connection-local and never broadcast.
    pub fn workspace_id(&self) -> Option<Uuid> {
        match self {
            Self::Ready { .. } | Self::Subscribed { .. } => None,
            Self::WorkspaceUpdated { workspace_id }
            | Self::WorkspaceRemoved { workspace_id }
            | Self::MemberJoined { workspace_id, .. }
            | Self::MemberUpdated { workspace_id, .. }
            | Self::MemberRemoved { workspace_id, .. }
            | Self::ChannelUpdated { workspace_id, .. }
            | Self::ChannelRemoved { workspace_id, .. }
            | Self::ConversationCreated { workspace_id, .. }
            | Self::MessageCreated { workspace_id, .. }
            | Self::MessageUpdated { workspace_id, .. }
            | Self::MessageRemoved { workspace_id, .. }
            | Self::ReactionToggled { workspace_id, .. } => Some(*workspace_id),
        }
    }

    /// Members allowed to see this event, when it concerns a private
    /// conversation. `None` means every member of the workspace.
    pub fn participants(&self) -> Option<[Uuid; 2]> {
        match self {
            Self::ConversationCreated { participants, .. } => Some(*participants),
            Self::MessageCreated { participants, .. }
            | Self::MessageUpdated { participants, .. }
            | Self::MessageRemoved { participants, .. }
            | Self::ReactionToggled { participants, .. } => *participants,
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Follow change events for these workspaces. Replaces any earlier
    /// subscription; workspaces the user is not a member of are dropped.
    Subscribe { workspace_ids: Vec<Uuid> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_carry_their_workspace() {
        let ws = Uuid::new_v4();
        let event = GatewayEvent::ReactionToggled {
            workspace_id: ws,
            message_id: Uuid::new_v4(),
            participants: None,
        };
        assert_eq!(event.workspace_id(), Some(ws));
        assert_eq!(event.participants(), None);

        let ready = GatewayEvent::Ready {
            user_id: Uuid::new_v4(),
            name: "ana".into(),
        };
        assert_eq!(ready.workspace_id(), None);
    }

    #[test]
    fn commands_use_adjacent_tagging() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"Identify","data":{"token":"abc"}}"#).unwrap();
        assert!(matches!(cmd, GatewayCommand::Identify { token } if token == "abc"));
    }

    #[test]
    fn conversation_events_name_their_participants() {
        let pair = [Uuid::new_v4(), Uuid::new_v4()];
        let created = GatewayEvent::ConversationCreated {
            workspace_id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            participants: pair,
        };
        assert_eq!(created.participants(), Some(pair));

        let message = GatewayEvent::MessageCreated {
            workspace_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            channel_id: None,
            conversation_id: Some(Uuid::new_v4()),
            parent_message_id: None,
            participants: Some(pair),
        };
        assert_eq!(message.participants(), Some(pair));

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["data"]["participants"][1], pair[1].to_string());
    }
}

use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, GroupId};

/// Events emitted by a chat session for external listeners
/// (parent aggregators, observer views, logs).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    /// Stored history was loaded when the session opened.
    HistoryLoaded { group_id: GroupId, count: usize },

    /// A send finished: both messages exist in the view, whether or not
    /// their persistence succeeded.
    TurnCompleted {
        group_id: GroupId,
        student: ChatMessage,
        mentor: ChatMessage,
    },
}

impl SessionEvent {
    /// Returns the group the event belongs to.
    pub fn group_id(&self) -> &GroupId {
        match self {
            SessionEvent::HistoryLoaded { group_id, .. } => group_id,
            SessionEvent::TurnCompleted { group_id, .. } => group_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Role};

    #[test]
    fn test_event_group_id() {
        let group = GroupId::new("g-7");
        let event = SessionEvent::TurnCompleted {
            group_id: group.clone(),
            student: ChatMessage::local(group.clone(), Role::Student, Category::Creative, "hola".into()),
            mentor: ChatMessage::local(group.clone(), Role::Mentor, Category::Creative, "¿Y tú?".into()),
        };
        assert_eq!(event.group_id(), &group);
    }

    #[test]
    fn test_event_serializes() {
        let event = SessionEvent::HistoryLoaded {
            group_id: GroupId::new("g-1"),
            count: 3,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("HistoryLoaded"));
        assert!(json.contains("\"count\":3"));
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A student in the group.
    Student,
    /// The automated Socratic mentor.
    Mentor,
}

impl Role {
    /// Storage representation (`student` / `mentor`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
        }
    }

    /// Role name used on the inference wire (`user` / `assistant`).
    pub fn inference_role(&self) -> &'static str {
        match self {
            Role::Student => "user",
            Role::Mentor => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "mentor" => Ok(Role::Mentor),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Pedagogical category of an utterance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Reflection on feelings, thinking, or learning.
    Metacognitive,
    /// Tools, programs, and techniques.
    Technical,
    /// Coordinating and dividing work.
    Organizational,
    /// Everything else.
    #[default]
    Creative,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Metacognitive => "Metacognitive",
            Category::Technical => "Technical",
            Category::Organizational => "Organizational",
            Category::Creative => "Creative",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Identifier of a student group; conversations are keyed by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// One message in a group conversation. Immutable once persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub group_id: GroupId,
    pub role: Role,
    pub category: Category,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a message that exists only in local view state (not yet persisted).
    pub fn local(group_id: GroupId, role: Role, category: Category, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            role,
            category,
            content,
            created_at: Utc::now(),
        }
    }

    /// Convert into the wire form sent to the inference service.
    pub fn to_history_turn(&self) -> HistoryTurn {
        HistoryTurn {
            role: self.role.inference_role().to_string(),
            content: self.content.clone(),
        }
    }
}

/// Project information for a group, owned by an external collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupContext {
    /// Project name shown to the mentor.
    pub name: String,
    /// Project milestones, in order.
    #[serde(default)]
    pub milestones: Vec<String>,
}

/// A history entry in inference wire form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
}

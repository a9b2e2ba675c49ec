use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// One of the three fixed conversation channels.
///
/// `parent-child` is the only channel where the mediator observes without
/// replying; the other two are direct conversations with the mediator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    ParentChild,
    ParentMediator,
    ChildMediator,
}

impl Channel {
    /// All channels, in a fixed order (useful for reset and iteration).
    pub const ALL: [Channel; 3] = [
        Channel::ParentChild,
        Channel::ParentMediator,
        Channel::ChildMediator,
    ];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::ParentChild => write!(f, "parent-child"),
            Channel::ParentMediator => write!(f, "parent-mediator"),
            Channel::ChildMediator => write!(f, "child-mediator"),
        }
    }
}

impl FromStr for Channel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent-child" => Ok(Channel::ParentChild),
            "parent-mediator" => Ok(Channel::ParentMediator),
            "child-mediator" => Ok(Channel::ChildMediator),
            _ => Err(format!("Unknown channel: {}", s)),
        }
    }
}

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Parent,
    Child,
    Mediator,
}

impl Speaker {
    /// The display name stored alongside messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Speaker::Parent => "Parent",
            Speaker::Child => "Timmy",
            Speaker::Mediator => "Mr. French",
        }
    }

    /// The chat role this speaker maps to when building LLM context.
    pub fn role(&self) -> Role {
        match self {
            Speaker::Parent | Speaker::Child => Role::User,
            Speaker::Mediator => Role::Assistant,
        }
    }
}

impl FromStr for Speaker {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parent" => Ok(Speaker::Parent),
            "child" | "timmy" => Ok(Speaker::Child),
            "mediator" | "mr. french" | "mrfrench" => Ok(Speaker::Mediator),
            _ => Err(format!("Unknown speaker: {}", s)),
        }
    }
}

/// Chat role as seen by the LLM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Task lifecycle status.
///
/// The capitalized wire form (`Pending`, `Progress`, `Completed`) is what the
/// LLM is prompted to emit and what the store persists. Parsing is
/// case-insensitive because the strings originate from model output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Progress,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "Pending"),
            TaskStatus::Progress => write!(f, "Progress"),
            TaskStatus::Completed => write!(f, "Completed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "progress" | "in progress" | "in_progress" => Ok(TaskStatus::Progress),
            "completed" | "complete" | "done" => Ok(TaskStatus::Completed),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// The child's coarse behavioral-status indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Red,
    Green,
    Blue,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Red => write!(f, "Red"),
            Zone::Green => write!(f, "Green"),
            Zone::Blue => write!(f, "Blue"),
        }
    }
}

impl FromStr for Zone {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(Zone::Red),
            "green" => Ok(Zone::Green),
            "blue" => Ok(Zone::Blue),
            _ => Err(format!("Unknown zone: {}", s)),
        }
    }
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Unix timestamp in seconds since epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

// =============================================================================
// Entity Structs
// =============================================================================

/// An assignable chore tracked in the task store.
///
/// `due_date` and `due_time` keep the coarse phrases exactly as extracted
/// (`Today`, `tonight`, `2025-08-01`, `Unknown`, `None`); resolution to a
/// concrete instant happens only at formatting/reminder time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub task: String,
    pub status: TaskStatus,
    pub due_date: String,
    pub due_time: String,
    pub reward: String,
    /// Recurrence marker (e.g. `Daily`), `None` for one-shot tasks.
    pub recurrence: Option<String>,
    pub updated_at: Timestamp,
}

/// One utterance in a channel's history. Append-only, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub channel: Channel,
    pub role: Role,
    pub sender: String,
    pub content: String,
    pub timestamp: Timestamp,
}

impl Message {
    /// Build a message authored by the given speaker, timestamped now.
    pub fn from_speaker(channel: Channel, speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            role: speaker.role(),
            sender: speaker.display_name().to_string(),
            content: content.into(),
            timestamp: Timestamp::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_display_round_trip() {
        for channel in Channel::ALL {
            let s = channel.to_string();
            let parsed: Channel = s.parse().unwrap();
            assert_eq!(parsed, channel);
        }
    }

    #[test]
    fn test_channel_serde_kebab_case() {
        let json = serde_json::to_string(&Channel::ParentMediator).unwrap();
        assert_eq!(json, "\"parent-mediator\"");
        let parsed: Channel = serde_json::from_str("\"child-mediator\"").unwrap();
        assert_eq!(parsed, Channel::ChildMediator);
    }

    #[test]
    fn test_channel_unknown_rejected() {
        assert!("parent-dog".parse::<Channel>().is_err());
    }

    #[test]
    fn test_speaker_display_names() {
        assert_eq!(Speaker::Parent.display_name(), "Parent");
        assert_eq!(Speaker::Child.display_name(), "Timmy");
        assert_eq!(Speaker::Mediator.display_name(), "Mr. French");
    }

    #[test]
    fn test_speaker_roles() {
        assert_eq!(Speaker::Parent.role(), Role::User);
        assert_eq!(Speaker::Child.role(), Role::User);
        assert_eq!(Speaker::Mediator.role(), Role::Assistant);
    }

    #[test]
    fn test_speaker_from_str_accepts_names() {
        assert_eq!("timmy".parse::<Speaker>().unwrap(), Speaker::Child);
        assert_eq!("Parent".parse::<Speaker>().unwrap(), Speaker::Parent);
        assert_eq!("mr. french".parse::<Speaker>().unwrap(), Speaker::Mediator);
    }

    #[test]
    fn test_task_status_case_insensitive() {
        assert_eq!("pending".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert_eq!("COMPLETED".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert_eq!("In Progress".parse::<TaskStatus>().unwrap(), TaskStatus::Progress);
        assert!("finished?".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_status_serde_wire_form() {
        let json = serde_json::to_string(&TaskStatus::Pending).unwrap();
        assert_eq!(json, "\"Pending\"");
        let parsed: TaskStatus = serde_json::from_str("\"Completed\"").unwrap();
        assert_eq!(parsed, TaskStatus::Completed);
    }

    #[test]
    fn test_zone_round_trip() {
        for zone in [Zone::Red, Zone::Green, Zone::Blue] {
            let parsed: Zone = zone.to_string().parse().unwrap();
            assert_eq!(parsed, zone);
        }
        assert_eq!("BLUE".parse::<Zone>().unwrap(), Zone::Blue);
        assert!("purple".parse::<Zone>().is_err());
    }

    #[test]
    fn test_timestamp_datetime_round_trip() {
        let now = Utc::now();
        let ts = Timestamp::from_datetime(now);
        assert_eq!(ts.to_datetime().timestamp(), now.timestamp());
    }

    #[test]
    fn test_message_from_speaker() {
        let msg = Message::from_speaker(Channel::ParentChild, Speaker::Child, "hi dad");
        assert_eq!(msg.channel, Channel::ParentChild);
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.sender, "Timmy");
        assert_eq!(msg.content, "hi dad");
    }

    #[test]
    fn test_message_json_round_trip() {
        let msg = Message::from_speaker(Channel::ParentMediator, Speaker::Mediator, "Noted.");
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, msg.id);
        assert_eq!(parsed.role, Role::Assistant);
        assert_eq!(parsed.sender, "Mr. French");
    }

    #[test]
    fn test_task_json_round_trip() {
        let task = Task {
            id: Uuid::new_v4(),
            task: "Clean your room".to_string(),
            status: TaskStatus::Pending,
            due_date: "Today".to_string(),
            due_time: "tonight".to_string(),
            reward: "extra screen time".to_string(),
            recurrence: None,
            updated_at: Timestamp::now(),
        };
        let json = serde_json::to_string(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, task.id);
        assert_eq!(parsed.status, TaskStatus::Pending);
        assert_eq!(parsed.due_time, "tonight");
        assert!(parsed.recurrence.is_none());
    }
}

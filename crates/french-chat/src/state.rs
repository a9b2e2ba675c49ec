//! Per-request working memory threaded through the pipeline nodes.

use french_agent::{ActionOutcome, Analysis};
use french_core::types::{Channel, Message, Speaker};

/// Conversation state for one inbound request. Constructed fresh per turn,
/// discarded after the response is returned; nothing here survives across
/// requests except what was written to the history log.
#[derive(Debug)]
pub struct ConversationState {
    pub channel: Channel,
    pub speaker: Speaker,
    pub user_input: String,
    /// Messages produced during this request only (ingest + reply).
    pub turns: Vec<Message>,
    pub analysis: Option<Analysis>,
    pub action: Option<ActionOutcome>,
    pub reply: Option<String>,
    /// Who the generated reply is addressed to, if anyone.
    pub recipient: Option<Speaker>,
}

impl ConversationState {
    pub fn new(channel: Channel, speaker: Speaker, user_input: impl Into<String>) -> Self {
        let recipient = match channel {
            Channel::ParentChild => (speaker == Speaker::Parent).then_some(Speaker::Parent),
            Channel::ParentMediator | Channel::ChildMediator => Some(speaker),
        };
        Self {
            channel,
            speaker,
            user_input: user_input.into(),
            turns: Vec::new(),
            analysis: None,
            action: None,
            reply: None,
            recipient,
        }
    }

    pub fn push_turn(&mut self, message: Message) {
        self.turns.push(message);
    }

    /// Collapse the state into the caller-facing result.
    pub fn into_outcome(self) -> TurnOutcome {
        TurnOutcome {
            reply: self.reply,
            analysis: self.analysis,
        }
    }
}

/// What one conversation turn produced. `reply` is `None` for the
/// observe-only case (child speaking on the parent-child channel);
/// `analysis` is `None` when the turn terminated before the analyze node.
#[derive(Debug)]
pub struct TurnOutcome {
    pub reply: Option<String>,
    pub analysis: Option<Analysis>,
}

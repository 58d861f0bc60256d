use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Incoming,
    Outgoing,
}

/// One chat message as stored locally and as returned by the webhook.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Message {
    pub fn outgoing(id: String, to: &str, text: &str, timestamp: String) -> Self {
        Self {
            id,
            from: to.to_string(),
            text: text.to_string(),
            timestamp,
            direction: Direction::Outgoing,
        }
    }

    pub fn is_outgoing(&self) -> bool {
        self.direction == Direction::Outgoing
    }
}

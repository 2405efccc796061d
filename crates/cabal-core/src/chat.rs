use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::CHAT_CAPACITY;
use crate::time::Millis;

/// Sender name used for server-generated messages.
pub const SYSTEM_SENDER: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    pub message: String,
    pub timestamp: Millis,
    pub is_system: bool,
}

/// Bounded, append-only room chat. Oldest messages are evicted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::with_capacity(CHAT_CAPACITY)
    }
}

impl ChatLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push_player(&mut self, sender: &str, message: &str, now: Millis) {
        self.push(sender.to_string(), message.to_string(), false, now);
    }

    pub fn push_system(&mut self, message: impl Into<String>, now: Millis) {
        self.push(SYSTEM_SENDER.to_string(), message.into(), true, now);
    }

    fn push(&mut self, sender: String, message: String, is_system: bool, now: Millis) {
        self.messages.push_back(ChatMessage {
            id: Uuid::new_v4().to_string(),
            sender,
            message,
            timestamp: now,
            is_system,
        });
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.back()
    }
}

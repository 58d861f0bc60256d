//! In-memory view over the stored messages: contact summary, search filter
//! and the current selection.

use crate::api::models::Message;
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;

/// Maps a sender identifier to a display name.
pub trait NameResolver {
    fn display_name(&self, sender: &str) -> String;
}

/// Placeholder naming from the identifier's last four characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrailingDigits;

impl NameResolver for TrailingDigits {
    fn display_name(&self, sender: &str) -> String {
        let count = sender.chars().count();
        let tail: String = sender.chars().skip(count.saturating_sub(4)).collect();
        format!("Contact {tail}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub sender: String,
    pub name: String,
    pub last_message: String,
    pub last_time: String,
}

fn parse_time(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(ts).ok()
}

// Recency key for one message: parsed time first, store position breaks ties.
type Recency = (Option<DateTime<FixedOffset>>, usize);

/// Group messages by sender, most recent contact first.
pub fn derive_contacts(messages: &[Message], names: &dyn NameResolver) -> Vec<Contact> {
    let mut latest: HashMap<&str, (Recency, &Message)> = HashMap::new();
    for (pos, msg) in messages.iter().enumerate() {
        let key = (parse_time(&msg.timestamp), pos);
        latest
            .entry(msg.from.as_str())
            .and_modify(|(best, best_msg)| {
                if key >= *best {
                    *best = key;
                    *best_msg = msg;
                }
            })
            .or_insert((key, msg));
    }

    let mut ranked: Vec<(Recency, &Message)> = latest.into_values().collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked
        .into_iter()
        .map(|(_, msg)| Contact {
            sender: msg.from.clone(),
            name: names.display_name(&msg.from),
            last_message: msg.text.clone(),
            last_time: msg.timestamp.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Empty,
    Ready,
}

pub struct ViewState {
    names: Box<dyn NameResolver>,
    messages: Vec<Message>,
    contacts: Vec<Contact>,
    selected: Option<String>,
    query: String,
    loaded: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(Box::new(TrailingDigits))
    }
}

impl ViewState {
    pub fn new(names: Box<dyn NameResolver>) -> Self {
        Self {
            names,
            messages: Vec::new(),
            contacts: Vec::new(),
            selected: None,
            query: String::new(),
            loaded: false,
        }
    }

    /// Replace the message list and rebuild contacts. Picks the most recent
    /// contact only when nothing is selected; an existing selection is kept.
    pub fn reload(&mut self, messages: Vec<Message>) {
        self.contacts = derive_contacts(&messages, self.names.as_ref());
        self.messages = messages;
        self.loaded = true;
        if self.selected.is_none() {
            self.selected = self.contacts.first().map(|c| c.sender.clone());
        }
    }

    pub fn load_state(&self) -> LoadState {
        match (self.loaded, self.messages.is_empty()) {
            (false, _) => LoadState::Loading,
            (true, true) => LoadState::Empty,
            (true, false) => LoadState::Ready,
        }
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[cfg(test)]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn contact(&self, sender: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.sender == sender)
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn filtered_contacts(&self) -> Vec<&Contact> {
        let needle = self.query.to_lowercase();
        if needle.is_empty() {
            return self.contacts.iter().collect();
        }
        self.contacts
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle) || c.sender.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, sender: &str) {
        self.selected = Some(sender.to_string());
    }

    /// Messages of the selected sender in store order.
    pub fn selected_messages(&self) -> Vec<&Message> {
        let Some(sender) = self.selected.as_deref() else {
            return Vec::new();
        };
        self.messages.iter().filter(|m| m.from == sender).collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.contacts.clear();
        self.selected = None;
    }

    /// Drop the selection if it is `sender`, so the next reload falls back
    /// to the most recent contact.
    pub fn deselect(&mut self, sender: &str) {
        if self.selected.as_deref() == Some(sender) {
            self.selected = None;
        }
    }
}

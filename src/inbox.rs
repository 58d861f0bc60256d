use crate::api::models::Message;
use crate::error::Result;
use crate::storage::Store;
use crate::view::ViewState;
use chrono::{SecondsFormat, Utc};

/// `msg-<unix millis>`, bumped until no stored message uses it.
pub fn next_message_id(now_millis: i64, existing: &[Message]) -> String {
    let mut stamp = now_millis;
    loop {
        let id = format!("msg-{stamp}");
        if !existing.iter().any(|m| m.id == id) {
            return id;
        }
        stamp += 1;
    }
}

/// Operator-side access to the store: everything the window does besides
/// the sync loop goes through here.
pub struct Inbox {
    store: Store,
    pub view: ViewState,
}

impl Inbox {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            view: ViewState::default(),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Re-derive the view from whatever is stored now.
    pub fn refresh(&mut self) {
        let messages = self.store.load();
        self.view.reload(messages);
    }

    /// Store a local reply to the selected contact. Returns `None` when the
    /// text is blank or nobody is selected.
    pub fn send_reply(&mut self, text: &str) -> Result<Option<Message>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let Some(to) = self.view.selected().map(str::to_string) else {
            return Ok(None);
        };

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let now_millis = Utc::now().timestamp_millis();
        let mut sent = None;
        let messages = self.store.update(|messages| {
            let message = Message::outgoing(next_message_id(now_millis, messages), &to, text, timestamp.clone());
            messages.push(message.clone());
            sent = Some(message);
            true
        })?;
        self.view.reload(messages);
        if let Some(message) = &sent {
            log::info!("stored reply {} to {}", message.id, message.from);
        }
        Ok(sent)
    }

    pub fn clear_all(&mut self) -> Result<()> {
        self.store.clear()?;
        self.view.clear();
        log::info!("cleared all messages");
        Ok(())
    }

    pub fn delete_conversation(&mut self, sender: &str) -> Result<()> {
        let remaining = self.store.remove_sender(sender)?;
        self.view.deselect(sender);
        self.view.reload(remaining);
        log::info!("deleted conversation with {sender}");
        Ok(())
    }
}

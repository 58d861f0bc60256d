use crate::api::models::Message;
use crate::error::{InboxError, Result};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed slot holding the serialized message list.
pub const MESSAGES_KEY: &str = "inbox-messages";

const MAX_WRITE_ATTEMPTS: u32 = 5;

fn db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "InboxGtk")?;
    let dir = proj.data_dir().to_path_buf();
    Some(dir.join("inbox.sqlite"))
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Single-slot key-value store for the message list.
///
/// Every write is a compare-and-swap on a revision counter kept next to the
/// value, so the sync loop and operator actions can't silently drop each
/// other's writes.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn open_default() -> Result<Self> {
        let path = db_path().ok_or(InboxError::NoDataDir)?;
        Self::with_path(path)
    }

    pub fn with_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let store = Self { path: path.into() };
        ensure_dir(&store.path)?;
        store.init()?;
        Ok(store)
    }

    fn open_conn(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open_conn()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                revision INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Current list and its revision. An absent slot is revision 0; a value
    /// that doesn't parse reads as an empty list.
    pub fn read(&self) -> Result<(Vec<Message>, i64)> {
        let conn = self.open_conn()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, revision FROM kv WHERE key = ?1",
                params![MESSAGES_KEY],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((raw, revision)) = row else {
            return Ok((Vec::new(), 0));
        };
        let messages = serde_json::from_str::<Vec<Message>>(&raw).unwrap_or_else(|e| {
            log::warn!("stored message list is malformed, treating as empty: {e}");
            Vec::new()
        });
        Ok((messages, revision))
    }

    /// Like [`Store::read`] but never fails; used by the view loader.
    pub fn load(&self) -> Vec<Message> {
        match self.read() {
            Ok((messages, _)) => messages,
            Err(e) => {
                log::warn!("could not read message store: {e}");
                Vec::new()
            }
        }
    }

    /// Writes `messages` only if the slot is still at `expected`. Returns
    /// false when another writer got there first.
    fn write_if(&self, messages: &[Message], expected: i64) -> Result<bool> {
        let conn = self.open_conn()?;
        let value = serde_json::to_string(messages)?;
        let changed = conn.execute(
            r#"
            INSERT INTO kv (key, value, revision)
            VALUES (?1, ?2, 1)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                revision = kv.revision + 1
            WHERE kv.revision = ?3
            "#,
            params![MESSAGES_KEY, value, expected],
        )?;
        Ok(changed == 1)
    }

    /// Read-modify-write of the whole list. `apply` returns whether it changed
    /// anything; unchanged lists are not written back. On a revision conflict
    /// the list is re-read and `apply` runs again.
    pub fn update<F>(&self, mut apply: F) -> Result<Vec<Message>>
    where
        F: FnMut(&mut Vec<Message>) -> bool,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (mut messages, revision) = self.read()?;
            if !apply(&mut messages) {
                return Ok(messages);
            }
            if self.write_if(&messages, revision)? {
                return Ok(messages);
            }
            log::debug!("store revision {revision} moved during write, retry {attempt}");
        }
        Err(InboxError::Conflict(MAX_WRITE_ATTEMPTS))
    }

    pub fn append(&self, message: Message) -> Result<Vec<Message>> {
        self.update(|messages| {
            if messages.iter().any(|m| m.id == message.id) {
                return false;
            }
            messages.push(message.clone());
            true
        })
    }

    pub fn remove_sender(&self, sender: &str) -> Result<Vec<Message>> {
        self.update(|messages| {
            let before = messages.len();
            messages.retain(|m| m.from != sender);
            messages.len() != before
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.update(|messages| {
            messages.clear();
            true
        })?;
        Ok(())
    }

    #[cfg(test)]
    pub fn revision(&self) -> Result<i64> {
        Ok(self.read()?.1)
    }
}

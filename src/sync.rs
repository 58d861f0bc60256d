use crate::api::client::ApiClient;
use crate::api::models::Message;
use crate::error::{InboxError, Result};
use crate::storage::Store;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Union of `existing` and `incoming` keyed by id. Existing entries keep their
/// position and content; unseen incoming entries are appended in order.
/// Returns how many were appended.
pub fn merge_into(existing: &mut Vec<Message>, incoming: &[Message]) -> usize {
    let mut seen: HashSet<&str> = existing.iter().map(|m| m.id.as_str()).collect();
    let fresh: Vec<Message> = incoming
        .iter()
        .filter(|m| seen.insert(m.id.as_str()))
        .cloned()
        .collect();
    let added = fresh.len();
    existing.extend(fresh);
    added
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The endpoint returned no messages; the store was not touched.
    Empty,
    Merged { added: usize, total: usize },
}

impl SyncOutcome {
    /// Whether the store gained anything the view hasn't seen.
    pub fn changed(&self) -> bool {
        matches!(self, SyncOutcome::Merged { added, .. } if *added > 0)
    }
}

/// A window counts as foreground when it is shown and the compositor hasn't
/// suspended it (minimized or fully covered).
pub fn in_foreground(visible: bool, suspended: bool) -> bool {
    visible && !suspended
}

/// One fetch-merge pass against the store.
pub async fn run_cycle(client: &ApiClient, store: &Store) -> Result<SyncOutcome> {
    let batch = client.fetch_messages().await?;
    if batch.is_empty() {
        return Ok(SyncOutcome::Empty);
    }
    let store = store.clone();
    let (added, total) = tokio::task::spawn_blocking(move || -> Result<(usize, usize)> {
        let mut added = 0;
        let merged = store.update(|messages| {
            added = merge_into(messages, &batch);
            added > 0
        })?;
        Ok((added, merged.len()))
    })
    .await
    .map_err(|e| InboxError::Background(e.to_string()))??;
    Ok(SyncOutcome::Merged { added, total })
}

struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic sync driver. The UI ticks it on a timer; it decides whether a
/// cycle should start and hands back the work to run off the main thread.
pub struct SyncLoop {
    client: Arc<ApiClient>,
    store: Store,
    in_flight: Arc<AtomicBool>,
}

impl SyncLoop {
    pub fn new(client: ApiClient, store: Store) -> Self {
        Self {
            client: Arc::new(client),
            store,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the cycle to run, or `None` when the window is in the
    /// background or the previous cycle hasn't finished.
    pub fn begin(&self, foreground: bool) -> Option<impl Future<Output = Result<SyncOutcome>> + Send + use<>> {
        if !foreground {
            log::debug!("window in background, skipping sync cycle");
            return None;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            log::debug!("previous sync cycle still running");
            return None;
        }
        let guard = InFlight(self.in_flight.clone());
        let client = self.client.clone();
        let store = self.store.clone();
        Some(async move {
            let _guard = guard;
            let res = run_cycle(&client, &store).await;
            match &res {
                Ok(SyncOutcome::Merged { added, total }) => {
                    log::info!("sync merged {added} new message(s), {total} stored")
                }
                Ok(SyncOutcome::Empty) => log::debug!("sync returned no messages"),
                Err(e) => log::warn!("sync cycle skipped: {e}"),
            }
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Direction;
    use crate::app::AppConfig;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn msg(id: &str, from: &str, text: &str) -> Message {
        Message {
            id: id.into(),
            from: from.into(),
            text: text.into(),
            timestamp: "2024-05-01T10:00:00Z".into(),
            direction: Direction::Incoming,
        }
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn merge_appends_unseen_in_order() {
        let mut stored = vec![msg("a", "1", "x")];
        let added = merge_into(&mut stored, &[msg("b", "2", "y"), msg("a", "1", "z"), msg("c", "1", "w")]);
        assert_eq!(added, 2);
        assert_eq!(ids(&stored), ["a", "b", "c"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let batch = vec![msg("a", "1", "x"), msg("b", "2", "y")];
        let mut once = Vec::new();
        merge_into(&mut once, &batch);
        let mut twice = once.clone();
        assert_eq!(merge_into(&mut twice, &batch), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_commutes_for_disjoint_batches() {
        let a = vec![msg("a1", "1", "x"), msg("a2", "2", "y")];
        let b = vec![msg("b1", "3", "z")];

        let mut ab = Vec::new();
        merge_into(&mut ab, &a);
        merge_into(&mut ab, &b);
        let mut ba = Vec::new();
        merge_into(&mut ba, &b);
        merge_into(&mut ba, &a);

        let mut left = ids(&ab);
        let mut right = ids(&ba);
        left.sort();
        right.sort();
        assert_eq!(left, right);
    }

    #[test]
    fn first_seen_wins() {
        let mut stored = vec![msg("a", "1", "original")];
        merge_into(&mut stored, &[msg("a", "9", "rewritten")]);
        assert_eq!(stored, vec![msg("a", "1", "original")]);
    }

    #[test]
    fn duplicate_ids_inside_a_batch_collapse() {
        let mut stored = Vec::new();
        merge_into(&mut stored, &[msg("a", "1", "first"), msg("a", "1", "second")]);
        assert_eq!(stored, vec![msg("a", "1", "first")]);
    }

    #[test]
    fn only_shown_unsuspended_windows_poll() {
        assert!(in_foreground(true, false));
        assert!(!in_foreground(true, true));
        assert!(!in_foreground(false, false));
        assert!(!in_foreground(false, true));
    }

    #[test]
    fn only_new_messages_count_as_a_change() {
        assert!(SyncOutcome::Merged { added: 1, total: 4 }.changed());
        assert!(!SyncOutcome::Merged { added: 0, total: 4 }.changed());
        assert!(!SyncOutcome::Empty.changed());
    }

    async fn setup(body: serde_json::Value) -> (MockServer, ApiClient, Store, tempfile::TempDir) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        let config = AppConfig {
            endpoint_url: format!("{}/messages", server.uri()),
            ..AppConfig::default()
        };
        let client = ApiClient::new(&config).unwrap();
        let dir = tempdir().unwrap();
        let store = Store::with_path(dir.path().join("inbox.sqlite")).unwrap();
        (server, client, store, dir)
    }

    #[tokio::test]
    async fn cycle_merges_into_store() {
        let (_server, client, store, _dir) = setup(json!({"messages": [
            {"id": "1", "from": "6281", "text": "Halo", "timestamp": "2024-05-01T10:00:00Z"},
            {"id": "2", "from": "6282", "text": "Hi", "timestamp": "2024-05-01T10:01:00Z"}
        ]}))
        .await;
        store.append(msg("0", "6280", "local")).unwrap();

        let outcome = run_cycle(&client, &store).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Merged { added: 2, total: 3 });
        assert_eq!(ids(&store.load()), ["0", "1", "2"]);

        // Same payload again changes nothing, not even the revision.
        let revision = store.revision().unwrap();
        let outcome = run_cycle(&client, &store).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Merged { added: 0, total: 3 });
        assert_eq!(store.revision().unwrap(), revision);
    }

    #[tokio::test]
    async fn empty_list_leaves_store_untouched() {
        let (_server, client, store, _dir) = setup(json!({"messages": []})).await;
        assert_eq!(run_cycle(&client, &store).await.unwrap(), SyncOutcome::Empty);
        assert_eq!(store.revision().unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_response_is_skipped() {
        let (_server, client, store, _dir) = setup(json!({"messages": "broken"})).await;
        store.append(msg("0", "6280", "local")).unwrap();
        assert!(matches!(run_cycle(&client, &store).await, Err(InboxError::Malformed(_))));
        assert_eq!(ids(&store.load()), ["0"]);
    }

    #[tokio::test]
    async fn background_or_busy_loop_does_not_start() {
        let (_server, client, store, _dir) = setup(json!({"messages": [
            {"id": "1", "from": "6281", "text": "Halo"}
        ]}))
        .await;
        let sync = SyncLoop::new(client, store.clone());

        assert!(sync.begin(false).is_none());
        // Minimized windows are still "visible" to GTK but suspended.
        assert!(sync.begin(in_foreground(true, true)).is_none());

        let cycle = sync.begin(in_foreground(true, false)).expect("foreground loop should start");
        assert!(sync.begin(true).is_none());
        cycle.await.unwrap();

        // Finished cycle releases the slot.
        let again = sync.begin(true).expect("loop should start after the last cycle ended");
        drop(again);
        assert!(sync.begin(true).is_some());
        assert_eq!(ids(&store.load()), ["1"]);
    }
}

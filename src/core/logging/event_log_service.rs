use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use super::event_models::{EventKind, NewLogRecord, TrackedMessage};
use crate::core::clock::zoned_now;

// Cap how many message snapshots we keep in memory so we don't grow unbounded.
const MAX_TRACKED_MESSAGES: usize = 5_000;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("storage error: {0}")]
    Storage(String),
}

/// Port for the per-run append-only store.
///
/// An append must be durably committed before returning. A failure is fatal
/// to that append (no retry, no buffering) and the caller decides whether
/// the session continues.
#[async_trait]
pub trait EventLogStore: Send + Sync {
    /// Writes one immutable record and returns the store-assigned sequence id.
    async fn append(&self, record: NewLogRecord) -> Result<i64, EventLogError>;
}

/// Write-only view of the session's event history. One instance per run,
/// constructed at session start and passed by reference to every handler
/// that needs to log.
pub struct EventLogService<S: EventLogStore> {
    store: S,
    // Message ID -> snapshot for logging edits/deletes after cache eviction
    message_cache: DashMap<u64, TrackedMessage>,
}

impl<S: EventLogStore> EventLogService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            message_cache: DashMap::new(),
        }
    }

    pub async fn on_join(&self, actor: &str, channel: &str) -> Result<i64, EventLogError> {
        self.append(actor, channel, EventKind::Joined, "").await
    }

    pub async fn on_leave(&self, actor: &str, channel: &str) -> Result<i64, EventLogError> {
        self.append(actor, channel, EventKind::Left, "").await
    }

    /// Synthetic record written when the last member leaves a voice channel.
    pub async fn on_all_left(&self, channel: &str) -> Result<i64, EventLogError> {
        self.append("all", channel, EventKind::Left, "").await
    }

    pub async fn on_message_sent(
        &self,
        actor: &str,
        channel: &str,
        content: &str,
    ) -> Result<i64, EventLogError> {
        self.append(actor, channel, EventKind::MessageSent, content)
            .await
    }

    pub async fn on_message_edited(
        &self,
        actor: &str,
        channel: &str,
        before: &str,
        after: &str,
    ) -> Result<i64, EventLogError> {
        let payload = format!("BEFORE: {before}\nAFTER: {after}");
        self.append(actor, channel, EventKind::MessageEdited, &payload)
            .await
    }

    pub async fn on_message_deleted(
        &self,
        actor: &str,
        channel: &str,
        content: &str,
    ) -> Result<i64, EventLogError> {
        self.append(actor, channel, EventKind::MessageDeleted, content)
            .await
    }

    pub async fn on_message_bulk_deleted(
        &self,
        actor: &str,
        channel: &str,
        content: &str,
    ) -> Result<i64, EventLogError> {
        self.append(actor, channel, EventKind::MessageBulkDeleted, content)
            .await
    }

    async fn append(
        &self,
        actor: &str,
        channel: &str,
        kind: EventKind,
        payload: &str,
    ) -> Result<i64, EventLogError> {
        self.store
            .append(NewLogRecord {
                actor: actor.to_string(),
                channel: channel.to_string(),
                kind,
                payload: payload.to_string(),
                recorded_at: zoned_now(),
            })
            .await
    }

    /// Store a message snapshot so we can later log deletes/edits reliably.
    pub fn remember_message(&self, message: TrackedMessage) {
        self.message_cache.insert(message.message_id, message);

        // Simple eviction: drop an arbitrary entry once we cross the cap.
        if self.message_cache.len() > MAX_TRACKED_MESSAGES {
            if let Some(first_key) = self.message_cache.iter().next().map(|entry| *entry.key()) {
                self.message_cache.remove(&first_key);
            }
        }
    }

    /// Get a tracked message without removing it (used for edits).
    pub fn get_tracked_message(&self, message_id: u64) -> Option<TrackedMessage> {
        self.message_cache.get(&message_id).map(|m| m.clone())
    }

    /// Remove a tracked message (used for deletions).
    pub fn take_tracked_message(&self, message_id: u64) -> Option<TrackedMessage> {
        self.message_cache.remove(&message_id).map(|(_, msg)| msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Captures appended records; assigns sequence ids the way a real store
    /// would.
    #[derive(Default)]
    struct RecordingStore {
        records: Mutex<Vec<NewLogRecord>>,
    }

    #[async_trait]
    impl EventLogStore for RecordingStore {
        async fn append(&self, record: NewLogRecord) -> Result<i64, EventLogError> {
            let mut records = self.records.lock().unwrap();
            records.push(record);
            Ok(records.len() as i64)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl EventLogStore for FailingStore {
        async fn append(&self, _record: NewLogRecord) -> Result<i64, EventLogError> {
            Err(EventLogError::Storage("disk full".to_string()))
        }
    }

    fn make_service() -> EventLogService<RecordingStore> {
        EventLogService::new(RecordingStore::default())
    }

    #[tokio::test]
    async fn records_carry_kind_actor_channel_and_payload() {
        let service = make_service();

        service.on_join("squid", "Lobby").await.unwrap();
        service
            .on_message_sent("squid", "general", "booyah")
            .await
            .unwrap();

        let records = service.store.records.lock().unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].kind, EventKind::Joined);
        assert_eq!(records[0].actor, "squid");
        assert_eq!(records[0].channel, "Lobby");
        assert_eq!(records[0].payload, "");

        assert_eq!(records[1].kind, EventKind::MessageSent);
        assert_eq!(records[1].payload, "booyah");
    }

    #[tokio::test]
    async fn sequence_ids_increase_and_timestamps_never_go_backwards() {
        let service = make_service();

        let mut ids = Vec::new();
        for n in 0..5 {
            let id = service
                .on_message_sent("squid", "general", &format!("message {n}"))
                .await
                .unwrap();
            ids.push(id);
        }

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

        let records = service.store.records.lock().unwrap();
        assert!(records
            .windows(2)
            .all(|pair| pair[0].recorded_at <= pair[1].recorded_at));
    }

    #[tokio::test]
    async fn edited_payload_contains_both_versions() {
        let service = make_service();

        service
            .on_message_edited("squid", "general", "ngyes", "booyah")
            .await
            .unwrap();

        let records = service.store.records.lock().unwrap();
        assert_eq!(records[0].payload, "BEFORE: ngyes\nAFTER: booyah");
    }

    #[tokio::test]
    async fn all_left_is_a_synthetic_left_record() {
        let service = make_service();

        service.on_all_left("Lobby").await.unwrap();

        let records = service.store.records.lock().unwrap();
        assert_eq!(records[0].kind, EventKind::Left);
        assert_eq!(records[0].actor, "all");
        assert_eq!(records[0].channel, "Lobby");
    }

    #[tokio::test]
    async fn store_failure_surfaces_to_the_caller() {
        let service = EventLogService::new(FailingStore);

        let err = service.on_join("squid", "Lobby").await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn tracked_messages_round_trip_and_take_removes() {
        let service = make_service();

        service.remember_message(TrackedMessage {
            message_id: 42,
            channel_name: "general".to_string(),
            author_name: "squid".to_string(),
            content: "booyah".to_string(),
        });

        let peeked = service.get_tracked_message(42).unwrap();
        assert_eq!(peeked.content, "booyah");
        assert!(service.get_tracked_message(42).is_some());

        let taken = service.take_tracked_message(42).unwrap();
        assert_eq!(taken.author_name, "squid");
        assert!(service.take_tracked_message(42).is_none());
    }

    #[test]
    fn snapshot_cache_stays_bounded() {
        let service = make_service();

        for id in 0..(MAX_TRACKED_MESSAGES as u64 + 10) {
            service.remember_message(TrackedMessage {
                message_id: id,
                channel_name: "general".to_string(),
                author_name: "squid".to_string(),
                content: String::new(),
            });
        }

        assert!(service.message_cache.len() <= MAX_TRACKED_MESSAGES + 1);
    }
}

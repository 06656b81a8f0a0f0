use chrono::DateTime;
use chrono_tz::Tz;

/// What happened. The strings are the storage form in the `event` column and
/// are fixed; renaming a variant must not change them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Joined,
    Left,
    MessageSent,
    MessageEdited,
    MessageDeleted,
    MessageBulkDeleted,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Joined => "joined",
            EventKind::Left => "left",
            EventKind::MessageSent => "message-sent",
            EventKind::MessageEdited => "message-edited",
            EventKind::MessageDeleted => "message-deleted",
            EventKind::MessageBulkDeleted => "message-bulk-deleted",
        }
    }
}

/// One fully-formed append-only row. The store assigns the sequence id;
/// everything else is fixed before the record reaches it and never changes
/// afterwards.
#[derive(Debug, Clone)]
pub struct NewLogRecord {
    pub actor: String,
    pub channel: String,
    pub kind: EventKind,
    pub payload: String,
    pub recorded_at: DateTime<Tz>,
}

/// Minimal snapshot of a message that we keep in-memory so deletions/edits
/// can be logged even if Serenity's cache has already evicted the original
/// message. Only non-bot messages are ever remembered.
#[derive(Debug, Clone)]
pub struct TrackedMessage {
    pub message_id: u64,
    pub channel_name: String,
    pub author_name: String,
    pub content: String,
}

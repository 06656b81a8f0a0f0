use std::path::Path;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::core::logging::{EventLogError, EventLogStore, NewLogRecord};

/// Append-only store backing one bot session. Each run gets its own database
/// file named from the session start time; a file is never reopened by a
/// later run.
pub struct SqliteEventLogStore {
    pool: Pool<Sqlite>,
}

impl SqliteEventLogStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Creates `<data_dir>/stagekeeper.<YYYYmmdd_HHMMSS>.db`, connects, and
    /// runs the migration.
    pub async fn open_for_run(data_dir: &str, started_at: DateTime<Tz>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = format!(
            "{}/stagekeeper.{}.db",
            data_dir,
            started_at.format("%Y%m%d_%H%M%S")
        );
        if !Path::new(&path).exists() {
            std::fs::File::create(&path)?;
        }

        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}", path))
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                actor       TEXT NOT NULL,
                channel     TEXT NOT NULL,
                event       TEXT NOT NULL,
                payload     TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl EventLogStore for SqliteEventLogStore {
    async fn append(&self, record: NewLogRecord) -> Result<i64, EventLogError> {
        let result = sqlx::query(
            r#"
            INSERT INTO event_log (actor, channel, event, payload, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.actor)
        .bind(&record.channel)
        .bind(record.kind.as_str())
        .bind(&record.payload)
        .bind(record.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| EventLogError::Storage(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }
}

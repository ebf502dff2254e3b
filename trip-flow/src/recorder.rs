use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

use crate::{
    error::{Result, TripError},
    itinerary::{ItineraryDay, ParsedItinerary},
    session::{SlotValue, TripSession},
};

/// Days and recommendations as persisted with an interaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedItinerary {
    pub itinerary: Vec<ItineraryDay>,
    pub recommendations: Vec<String>,
}

/// The finalized conversation, written once per completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub session_id: String,
    pub travel_dates: Option<String>,
    pub duration: Option<SlotValue>,
    pub group_info: Option<String>,
    pub preferences: Option<String>,
    pub budget: Option<SlotValue>,
    pub conversation_history: Vec<String>,
    pub generated_itinerary: GeneratedItinerary,
}

impl InteractionRecord {
    pub fn from_session(session: &TripSession, parsed: &ParsedItinerary) -> Self {
        Self {
            session_id: session.id.clone(),
            travel_dates: session.travel_dates.clone(),
            duration: session.duration.clone(),
            group_info: session.group_info.clone(),
            preferences: session.preferences.clone(),
            budget: session.budget.clone(),
            conversation_history: session.conversation_history.clone(),
            generated_itinerary: GeneratedItinerary {
                itinerary: parsed.days.clone(),
                recommendations: parsed.recommendations.clone(),
            },
        }
    }
}

/// An interaction read back from the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInteraction {
    pub id: i64,
    #[serde(flatten)]
    pub record: InteractionRecord,
    pub created_at: DateTime<Utc>,
}

/// Sink for finalized interactions
#[async_trait]
pub trait InteractionRecorder: Send + Sync {
    /// Stores a record and returns its row id.
    async fn record(&self, record: &InteractionRecord) -> Result<i64>;

    /// All interactions, oldest first, optionally restricted to one session.
    async fn list(&self, session_id: Option<&str>) -> Result<Vec<StoredInteraction>>;

    /// Deletes the `count` oldest interactions and returns how many were removed.
    async fn clear_oldest(&self, count: u32) -> Result<u64>;
}

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT,
    travel_dates TEXT,
    duration TEXT,
    group_info TEXT,
    preferences TEXT,
    budget TEXT,
    conversation_history TEXT,
    generated_itinerary TEXT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
)
"#;

#[derive(sqlx::FromRow)]
struct InteractionRow {
    id: i64,
    session_id: Option<String>,
    travel_dates: Option<String>,
    duration: Option<String>,
    group_info: Option<String>,
    preferences: Option<String>,
    budget: Option<String>,
    conversation_history: Option<String>,
    generated_itinerary: Option<String>,
    created_at: Option<String>,
}

impl TryFrom<InteractionRow> for StoredInteraction {
    type Error = TripError;

    fn try_from(row: InteractionRow) -> Result<Self> {
        let conversation_history = match row.conversation_history.as_deref() {
            Some(json) => serde_json::from_str(json)?,
            None => Vec::new(),
        };
        let generated_itinerary = match row.generated_itinerary.as_deref() {
            Some(json) => serde_json::from_str(json)?,
            None => GeneratedItinerary::default(),
        };

        Ok(Self {
            id: row.id,
            record: InteractionRecord {
                session_id: row.session_id.unwrap_or_else(|| "default".to_string()),
                travel_dates: row.travel_dates,
                duration: row.duration.as_deref().map(stored_slot_value),
                group_info: row.group_info,
                preferences: row.preferences,
                budget: row.budget.as_deref().map(stored_slot_value),
                conversation_history,
                generated_itinerary,
            },
            created_at: row
                .created_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
        })
    }
}

/// Slot values are stored as JSON. Rows written as plain text read back as text.
fn stored_slot_value(raw: &str) -> SlotValue {
    serde_json::from_str(raw).unwrap_or_else(|_| SlotValue::Text(raw.to_string()))
}

/// Accepts RFC 3339 and SQLite's `CURRENT_TIMESTAMP` layout.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ts| ts.and_utc())
        })
}

/// SQLite-backed interaction log
#[derive(Clone)]
pub struct SqliteInteractionRecorder {
    pool: SqlitePool,
}

impl SqliteInteractionRecorder {
    /// Opens (creating if needed) the database at `database_url` and ensures the table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to an in-memory database sees a different database.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let recorder = Self { pool };
        recorder.migrate().await?;
        info!(database_url = %database_url, "Interaction recorder ready");
        Ok(recorder)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl InteractionRecorder for SqliteInteractionRecorder {
    async fn record(&self, record: &InteractionRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO interactions (
                session_id, travel_dates, duration, group_info, preferences,
                budget, conversation_history, generated_itinerary, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.session_id)
        .bind(&record.travel_dates)
        .bind(record.duration.as_ref().map(serde_json::to_string).transpose()?)
        .bind(&record.group_info)
        .bind(&record.preferences)
        .bind(record.budget.as_ref().map(serde_json::to_string).transpose()?)
        .bind(serde_json::to_string(&record.conversation_history)?)
        .bind(serde_json::to_string(&record.generated_itinerary)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list(&self, session_id: Option<&str>) -> Result<Vec<StoredInteraction>> {
        let rows: Vec<InteractionRow> = match session_id {
            Some(id) => {
                sqlx::query_as("SELECT * FROM interactions WHERE session_id = ? ORDER BY id")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM interactions ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(StoredInteraction::try_from).collect()
    }

    async fn clear_oldest(&self, count: u32) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM interactions
            WHERE rowid IN (
                SELECT rowid FROM interactions ORDER BY rowid ASC LIMIT ?
            )
            "#,
        )
        .bind(count)
        .execute(&self.pool)
        .await?;

        info!(removed = result.rows_affected(), "Cleared oldest interactions");
        Ok(result.rows_affected())
    }
}

/// In-memory interaction log
#[derive(Clone, Default)]
pub struct InMemoryInteractionRecorder {
    rows: Arc<Mutex<Vec<StoredInteraction>>>,
}

impl InMemoryInteractionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredInteraction>>> {
        self.rows
            .lock()
            .map_err(|e| TripError::RecorderError(e.to_string()))
    }
}

#[async_trait]
impl InteractionRecorder for InMemoryInteractionRecorder {
    async fn record(&self, record: &InteractionRecord) -> Result<i64> {
        let mut rows = self.lock()?;
        let id = rows.last().map(|r| r.id + 1).unwrap_or(1);
        rows.push(StoredInteraction {
            id,
            record: record.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list(&self, session_id: Option<&str>) -> Result<Vec<StoredInteraction>> {
        let rows = self.lock()?;
        Ok(rows
            .iter()
            .filter(|r| session_id.is_none_or(|id| r.record.session_id == id))
            .cloned()
            .collect())
    }

    async fn clear_oldest(&self, count: u32) -> Result<u64> {
        let mut rows = self.lock()?;
        let removed = rows.len().min(count as usize);
        rows.drain(..removed);
        Ok(removed as u64)
    }
}

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use nsi_aura_core::LogEntry;
use sqlx::{AnyPool, Row};

struct LogRow {
    id: i64,
    reservation_id: i64,
    timestamp: String,
    message: String,
    module: Option<String>,
    function: Option<String>,
    line: Option<i64>,
}

impl LogRow {
    fn from_row(row: &sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            reservation_id: row.try_get("reservation_id")?,
            timestamp: row.try_get("timestamp")?,
            message: row.try_get("message")?,
            module: row.try_get("module")?,
            function: row.try_get("function")?,
            line: row.try_get("line")?,
        })
    }

    fn into_domain(self) -> Result<LogEntry> {
        Ok(LogEntry {
            id: self.id,
            reservation_id: self.reservation_id,
            timestamp: DateTime::parse_from_rfc3339(&self.timestamp)
                .context("log timestamp")?
                .with_timezone(&Utc),
            message: self.message,
            module: self.module,
            function: self.function,
            line: self.line.map(|l| l as u32),
        })
    }
}

const SELECT_COLUMNS: &str = "id, reservation_id, timestamp, message, module, function, line";

/// Append one line to a reservation's log stream.
pub async fn append(
    pool: &AnyPool,
    reservation_id: i64,
    message: &str,
    module: Option<&str>,
    function: Option<&str>,
    line: Option<u32>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO log (reservation_id, timestamp, message, module, function, line) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(reservation_id)
    .bind(Utc::now().to_rfc3339())
    .bind(message)
    .bind(module)
    .bind(function)
    .bind(line.map(|l| l as i64))
    .execute(pool)
    .await?;
    Ok(())
}

/// Every log row for `reservation_id` with `id > after`, in order —
/// the primitive the SSE stream polls every 500 ms.
pub async fn list_since(pool: &AnyPool, reservation_id: i64, after: i64) -> Result<Vec<LogEntry>> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM log WHERE reservation_id = ? AND id > ? ORDER BY id ASC"
    ))
    .bind(reservation_id)
    .bind(after)
    .fetch_all(pool)
    .await?;

    rows.iter().map(|r| LogRow::from_row(r)?.into_domain()).collect()
}

use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_kind, to_u32},
    models::{SecurityEvent, SecurityEventKind},
    Database,
};

fn row_to_event(row: &Row) -> Result<SecurityEvent> {
    let occurred_at: String = row.get("occurred_at")?;
    let kind: String = row.get("kind")?;

    Ok(SecurityEvent {
        id: row.get("id")?,
        occurred_at: parse_datetime(&occurred_at, "occurred_at")?,
        kind: parse_kind(&kind)?,
        attempts: to_u32(row.get("attempts")?, "attempts")?,
        sequence: row.get("sequence")?,
        evidence_path: row.get("evidence_path")?,
    })
}

impl Database {
    pub async fn insert_security_event(&self, event: &SecurityEvent) -> Result<()> {
        let record = event.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO security_events (id, occurred_at, kind, attempts, sequence, evidence_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.occurred_at.to_rfc3339(),
                    record.kind.as_str(),
                    i64::from(record.attempts),
                    record.sequence,
                    record.evidence_path,
                ],
            )
            .with_context(|| "failed to insert security event")?;
            Ok(())
        })
        .await
    }

    /// Most recent first.
    pub async fn list_security_events(&self, limit: u32) -> Result<Vec<SecurityEvent>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, occurred_at, kind, attempts, sequence, evidence_path
                 FROM security_events
                 ORDER BY occurred_at DESC, rowid DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![i64::from(limit)])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_event(row)?);
            }

            Ok(events)
        })
        .await
    }

    pub async fn count_security_events(&self, kind: SecurityEventKind) -> Result<u64> {
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM security_events WHERE kind = ?1",
                params![kind.as_str()],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_db_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("gesturelock-test-{}", uuid::Uuid::new_v4()))
            .join("audit.sqlite3")
    }

    #[tokio::test]
    async fn stores_and_lists_events() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();
        assert_eq!(db.path(), path.as_path());

        let failed = SecurityEvent::new(SecurityEventKind::AttemptFailed, 1, "Stop_Left,Stop_Right,ThumbUp_Left");
        let mut lockout = SecurityEvent::new(SecurityEventKind::Lockout, 3, "Stop_Left,Stop_Right,ThumbUp_Left");
        lockout.evidence_path = Some("/tmp/alert.png".into());

        db.insert_security_event(&failed).await.unwrap();
        db.insert_security_event(&lockout).await.unwrap();

        let events = db.list_security_events(10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, lockout.id);
        assert_eq!(events[0].kind, SecurityEventKind::Lockout);
        assert_eq!(events[0].attempts, 3);
        assert_eq!(events[0].evidence_path.as_deref(), Some("/tmp/alert.png"));

        assert_eq!(db.count_security_events(SecurityEventKind::Lockout).await.unwrap(), 1);
        assert_eq!(db.count_security_events(SecurityEventKind::Unlocked).await.unwrap(), 0);
        assert_eq!(db.list_security_events(1).await.unwrap().len(), 1);

        drop(db);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

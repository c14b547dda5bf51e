//! SQLite-backed mirror

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::{migrations, LocalMirror, PendingState, SyncOutcome};
use crate::conflict::plan_resolution;
use crate::models::{
    Asset, ConflictAcknowledgement, ConflictRecord, FieldMap, Resolution, ScanEvent,
};
use crate::util::format_timestamp;
use crate::Result;

const LAST_SYNC_AT_KEY: &str = "last_sync_at";

/// Mirror persisted in a single SQLite file.
///
/// One connection behind a mutex; every multi-step mutation runs in a
/// transaction, so a crash mid-apply leaves the previous state intact.
pub struct SqliteMirror {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMirror").finish_non_exhaustive()
    }
}

impl SqliteMirror {
    /// Open (or create) the mirror at `path`. Runs migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a throwaway in-memory mirror
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Mirror journal mode: {mode}");
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn conversion_error(
    column: usize,
    error: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, error.into())
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn parse_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanEvent> {
    let captured_at: String = row.get(4)?;
    Ok(ScanEvent {
        client_event_id: row.get(0)?,
        symbology: row.get(1)?,
        raw_value: row.get(2)?,
        source_type: row.get(3)?,
        captured_at: parse_timestamp(4, &captured_at)?,
        synced: row.get::<_, i32>(5)? != 0,
    })
}

fn parse_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConflictRecord> {
    Ok(ConflictRecord {
        id: row.get(0)?,
        asset_id: row.get(1)?,
        field: row.get(2)?,
        local_value: row.get(3)?,
        server_value: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn parse_ack(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConflictAcknowledgement> {
    let resolution: String = row.get(1)?;
    let resolved_at: String = row.get(2)?;
    Ok(ConflictAcknowledgement {
        conflict_id: row.get(0)?,
        resolution: resolution
            .parse::<Resolution>()
            .map_err(|e| conversion_error(1, e))?,
        resolved_at: parse_timestamp(2, &resolved_at)?,
    })
}

fn parse_asset(row: &rusqlite::Row<'_>) -> rusqlite::Result<Asset> {
    let body: String = row.get(0)?;
    serde_json::from_str(&body).map_err(|e| conversion_error(0, e))
}

fn insert_event(conn: &Connection, event: &ScanEvent) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO scan_events
            (client_event_id, symbology, raw_value, source_type, captured_at, synced)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            event.client_event_id,
            event.symbology,
            event.raw_value,
            event.source_type,
            format_timestamp(&event.captured_at),
            i32::from(event.synced)
        ],
    )?;
    Ok(inserted == 1)
}

fn load_events(conn: &Connection, pending_only: bool) -> Result<Vec<ScanEvent>> {
    let sql = if pending_only {
        "SELECT client_event_id, symbology, raw_value, source_type, captured_at, synced
         FROM scan_events WHERE synced = 0 ORDER BY rowid"
    } else {
        "SELECT client_event_id, symbology, raw_value, source_type, captured_at, synced
         FROM scan_events ORDER BY rowid"
    };
    let mut stmt = conn.prepare(sql)?;
    let events = stmt
        .query_map([], parse_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

fn mark_events_synced(conn: &Connection, ids: &[String]) -> Result<()> {
    let mut stmt = conn.prepare("UPDATE scan_events SET synced = 1 WHERE client_event_id = ?")?;
    for id in ids {
        stmt.execute(params![id])?;
    }
    Ok(())
}

fn write_asset(conn: &Connection, asset: &Asset) -> Result<()> {
    let body = serde_json::to_string(asset)?;
    conn.execute(
        "INSERT INTO assets (id, body) VALUES (?, ?)
         ON CONFLICT(id) DO UPDATE SET body = excluded.body",
        params![asset.id(), body],
    )?;
    Ok(())
}

fn write_assets(conn: &Connection, changes: &[FieldMap]) -> Result<usize> {
    let mut written = 0;
    for change in changes {
        let Some(asset) = Asset::from_fields(change.clone()) else {
            tracing::debug!("Skipping asset change without a usable id");
            continue;
        };
        write_asset(conn, &asset)?;
        written += 1;
    }
    Ok(written)
}

fn load_asset(conn: &Connection, id: &str) -> Result<Option<Asset>> {
    let asset = conn
        .query_row("SELECT body FROM assets WHERE id = ?", params![id], parse_asset)
        .optional()?;
    Ok(asset)
}

fn insert_conflicts(conn: &Connection, conflicts: &[ConflictRecord]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO conflicts (id, asset_id, field, local_value, server_value, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )?;
    for conflict in conflicts {
        stmt.execute(params![
            conflict.id,
            conflict.asset_id,
            conflict.field,
            conflict.local_value,
            conflict.server_value,
            conflict.updated_at
        ])?;
    }
    Ok(())
}

fn load_acks(conn: &Connection) -> Result<Vec<ConflictAcknowledgement>> {
    let mut stmt = conn.prepare(
        "SELECT conflict_id, resolution, resolved_at FROM conflict_acks ORDER BY rowid",
    )?;
    let acks = stmt
        .query_map([], parse_ack)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(acks)
}

fn delete_acks(conn: &Connection, ids: &[String]) -> Result<()> {
    let mut stmt = conn.prepare("DELETE FROM conflict_acks WHERE conflict_id = ?")?;
    for id in ids {
        stmt.execute(params![id])?;
    }
    Ok(())
}

fn write_cursor(conn: &Connection, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_state (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![LAST_SYNC_AT_KEY, value],
    )?;
    Ok(())
}

fn load_cursor(conn: &Connection) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM sync_state WHERE key = ?",
            params![LAST_SYNC_AT_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

impl LocalMirror for SqliteMirror {
    fn pending_scan_events(&self) -> Result<Vec<ScanEvent>> {
        load_events(&self.conn.lock(), true)
    }

    fn scan_events(&self) -> Result<Vec<ScanEvent>> {
        load_events(&self.conn.lock(), false)
    }

    fn add_local_scan_event(&self, event: ScanEvent) -> Result<bool> {
        let inserted = insert_event(&self.conn.lock(), &event)?;
        if !inserted {
            tracing::debug!("Ignoring duplicate scan event");
        }
        Ok(inserted)
    }

    fn mark_synced(&self, client_event_ids: &[String]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        mark_events_synced(&tx, client_event_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_assets(&self, changes: &[FieldMap]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let written = write_assets(&tx, changes)?;
        tx.commit()?;
        Ok(written)
    }

    fn assets(&self) -> Result<Vec<Asset>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT body FROM assets ORDER BY id")?;
        let assets = stmt
            .query_map([], parse_asset)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assets)
    }

    fn asset(&self, id: &str) -> Result<Option<Asset>> {
        load_asset(&self.conn.lock(), id)
    }

    fn save_conflicts(&self, conflicts: &[ConflictRecord]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        insert_conflicts(&tx, conflicts)?;
        tx.commit()?;
        Ok(())
    }

    fn pending_conflicts(&self) -> Result<Vec<ConflictRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, asset_id, field, local_value, server_value, updated_at
             FROM conflicts ORDER BY seq",
        )?;
        let conflicts = stmt
            .query_map([], parse_conflict)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(conflicts)
    }

    fn resolve_conflict(
        &self,
        conflict_id: &str,
        use_server_value: bool,
    ) -> Result<ConflictAcknowledgement> {
        let resolution = Resolution::from_use_server_value(use_server_value);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let conflict = tx
            .query_row(
                "SELECT id, asset_id, field, local_value, server_value, updated_at
                 FROM conflicts WHERE id = ? ORDER BY seq LIMIT 1",
                params![conflict_id],
                parse_conflict,
            )
            .optional()?;

        if conflict.is_none() {
            let existing = tx
                .query_row(
                    "SELECT conflict_id, resolution, resolved_at
                     FROM conflict_acks WHERE conflict_id = ?",
                    params![conflict_id],
                    parse_ack,
                )
                .optional()?;
            if let Some(existing) = existing {
                return Ok(existing);
            }
        }

        let plan = plan_resolution(conflict_id, conflict.as_ref(), resolution, Utc::now());

        if let Some(event) = &plan.replay_event {
            insert_event(&tx, event)?;
        }
        if let Some(patch) = &plan.asset_patch {
            let existing = load_asset(&tx, &patch.asset_id)?;
            write_asset(&tx, &patch.apply(existing))?;
        }

        tx.execute("DELETE FROM conflicts WHERE id = ?", params![conflict_id])?;
        tx.execute(
            "DELETE FROM conflict_acks WHERE conflict_id = ?",
            params![conflict_id],
        )?;
        let ack = &plan.acknowledgement;
        tx.execute(
            "INSERT INTO conflict_acks (conflict_id, resolution, resolved_at) VALUES (?, ?, ?)",
            params![
                ack.conflict_id,
                ack.resolution.as_str(),
                format_timestamp(&ack.resolved_at)
            ],
        )?;
        tx.commit()?;

        Ok(plan.acknowledgement)
    }

    fn pending_conflict_acks(&self) -> Result<Vec<ConflictAcknowledgement>> {
        load_acks(&self.conn.lock())
    }

    fn mark_conflict_acks_synced(&self, conflict_ids: &[String]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        delete_acks(&tx, conflict_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn save_last_sync_at(&self, value: &str) -> Result<()> {
        write_cursor(&self.conn.lock(), value)
    }

    fn last_sync_at(&self) -> Result<Option<String>> {
        load_cursor(&self.conn.lock())
    }

    fn pending_state(&self) -> Result<PendingState> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let state = PendingState {
            scan_events: load_events(&tx, true)?,
            conflict_acks: load_acks(&tx)?,
            last_sync_at: load_cursor(&tx)?,
        };
        tx.commit()?;
        Ok(state)
    }

    fn apply_sync_outcome(&self, outcome: &SyncOutcome) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        mark_events_synced(&tx, &outcome.synced_event_ids)?;
        delete_acks(&tx, &outcome.delivered_ack_ids)?;
        let written = write_assets(&tx, &outcome.asset_changes)?;
        insert_conflicts(&tx, &outcome.conflicts)?;
        write_cursor(&tx, &outcome.server_time)?;
        tx.commit()?;

        tracing::debug!(
            events = outcome.synced_event_ids.len(),
            acks = outcome.delivered_ack_ids.len(),
            assets = written,
            conflicts = outcome.conflicts.len(),
            "Applied sync outcome"
        );
        Ok(())
    }
}

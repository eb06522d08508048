use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{instrument, warn};
use uuid::Uuid;

use agentgate_core::{time, Fingerprint};

use crate::error::{IdentityError, Result};
use crate::types::Identity;

const SCHEMA_VERSION: i32 = 1;

/// Persistent mapping from key-fingerprint to `Identity`, backed by an
/// embedded SQLite database. One row per identity; `memory` and `traits`
/// are stored as JSON columns. A single `Mutex<Connection>` serializes
/// writes so readers never observe a torn record, matching the rest of
/// this codebase's single-connection-manager pattern.
pub struct IdentityStore {
    conn: Mutex<Connection>,
}

impl IdentityStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests that don't need cross-process durability.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS identities (
                fingerprint         TEXT PRIMARY KEY NOT NULL,
                id                  TEXT NOT NULL,
                display_name        TEXT NOT NULL,
                tier                TEXT NOT NULL,
                created_at          INTEGER NOT NULL,
                calls_today         INTEGER NOT NULL,
                calls_total         INTEGER NOT NULL,
                last_call_at        INTEGER,
                last_call_date      TEXT,
                memory              TEXT NOT NULL,
                traits              TEXT NOT NULL,
                billing_customer_id TEXT
            );",
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// Deterministic, one-way digest of the upstream key. Never reversed —
    /// the raw key never reaches storage.
    pub fn fingerprint(&self, key: &str) -> Fingerprint {
        Fingerprint::of(key)
    }

    /// Return the existing identity for `fp`, or create and persist a fresh
    /// one with the documented defaults. The second element of the tuple is
    /// `true` when a new record was created.
    #[instrument(skip(self), fields(fingerprint = %fp.as_str()))]
    pub fn resolve_or_create(&self, fp: &Fingerprint) -> Result<(Identity, bool)> {
        let conn = self.conn.lock().expect("identity store mutex poisoned");
        if let Some(identity) = load_locked(&conn, fp)? {
            return Ok((identity, false));
        }
        let identity = Identity::new(fp.as_str(), Uuid::now_v7().to_string(), time::now_ms());
        save_locked(&conn, &identity)?;
        Ok((identity, true))
    }

    #[instrument(skip(self), fields(fingerprint = %fp.as_str()))]
    pub fn load(&self, fp: &Fingerprint) -> Result<Option<Identity>> {
        let conn = self.conn.lock().expect("identity store mutex poisoned");
        load_locked(&conn, fp)
    }

    /// Atomic replace of the row for `identity.fingerprint`. SQLite's
    /// transactional `INSERT ... ON CONFLICT` means readers never observe a
    /// partially-written record.
    #[instrument(skip(self, identity), fields(fingerprint = %identity.fingerprint))]
    pub fn save(&self, identity: &Identity) -> Result<()> {
        let conn = self.conn.lock().expect("identity store mutex poisoned");
        save_locked(&conn, identity)
    }

    /// Record a successful chat turn: append the two new memory entries,
    /// advance the counters, and persist — all against the row's *current*
    /// state, re-read under the same lock acquisition that performs the
    /// write. The caller typically holds a snapshot of the identity taken
    /// before an `await` on the upstream call; re-reading here (rather than
    /// writing back that stale snapshot) is what keeps concurrent calls for
    /// the same fingerprint from losing an increment to a last-write-wins
    /// save — counters are a true read-modify-write under the write lock.
    #[instrument(skip(self, user_content, assistant_content), fields(fingerprint = %fp.as_str()))]
    #[allow(clippy::too_many_arguments)]
    pub fn record_successful_call(
        &self,
        fp: &Fingerprint,
        memory_capacity: Option<usize>,
        user_content: &str,
        assistant_content: &str,
        sentiment: f64,
        today_str: &str,
        now_ms: i64,
    ) -> Result<Identity> {
        let conn = self.conn.lock().expect("identity store mutex poisoned");
        let mut identity = load_locked(&conn, fp)?
            .ok_or_else(|| IdentityError::NotFound(fp.as_str().to_string()))?;

        identity.record_successful_call(
            memory_capacity,
            user_content,
            assistant_content,
            sentiment,
            today_str,
            now_ms,
        );

        save_locked(&conn, &identity)?;
        Ok(identity)
    }

    /// Snapshot iteration over every stored identity, for admin aggregates.
    pub fn iter(&self) -> Result<Vec<Identity>> {
        let conn = self.conn.lock().expect("identity store mutex poisoned");
        let mut stmt = conn.prepare(SELECT_SQL)?;
        let rows = stmt
            .query_map([], row_to_identity)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().collect()
    }
}

const SELECT_SQL: &str = "SELECT fingerprint, id, display_name, tier, created_at, calls_today,
            calls_total, last_call_at, last_call_date, memory, traits, billing_customer_id
     FROM identities WHERE fingerprint = ?1";

/// A corrupt row (unparseable `memory`/`traits` JSON) is logged and treated
/// as "not found" rather than surfaced as a `StorageError` — the same
/// fresh-start discipline the spec requires for a whole-document parse
/// failure, applied here per-row.
fn load_locked(conn: &Connection, fp: &Fingerprint) -> Result<Option<Identity>> {
    let row = conn
        .query_row(
            "SELECT fingerprint, id, display_name, tier, created_at, calls_today,
                    calls_total, last_call_at, last_call_date, memory, traits, billing_customer_id
             FROM identities WHERE fingerprint = ?1",
            params![fp.as_str()],
            row_to_identity,
        )
        .optional()?;
    match row {
        None => Ok(None),
        Some(Ok(identity)) => Ok(Some(identity)),
        Some(Err(err)) => {
            warn!(fingerprint = %fp.as_str(), error = %err, "corrupt identity row, treating as not found");
            Ok(None)
        }
    }
}

fn save_locked(conn: &Connection, identity: &Identity) -> Result<()> {
    let memory_json = serde_json::to_string(&identity.memory)
        .map_err(|e| IdentityError::Corrupt(identity.fingerprint.clone(), e))?;
    let traits_json = serde_json::to_string(&identity.traits)
        .map_err(|e| IdentityError::Corrupt(identity.fingerprint.clone(), e))?;

    conn.execute(
        "INSERT INTO identities (
            fingerprint, id, display_name, tier, created_at, calls_today, calls_total,
            last_call_at, last_call_date, memory, traits, billing_customer_id
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
         ON CONFLICT(fingerprint) DO UPDATE SET
            display_name=excluded.display_name,
            tier=excluded.tier,
            calls_today=excluded.calls_today,
            calls_total=excluded.calls_total,
            last_call_at=excluded.last_call_at,
            last_call_date=excluded.last_call_date,
            memory=excluded.memory,
            traits=excluded.traits,
            billing_customer_id=excluded.billing_customer_id",
        params![
            identity.fingerprint,
            identity.id,
            identity.display_name,
            identity.tier.to_string(),
            identity.created_at,
            identity.calls_today,
            identity.calls_total,
            identity.last_call_at,
            identity.last_call_date,
            memory_json,
            traits_json,
            identity.billing_customer_id,
        ],
    )?;
    Ok(())
}

fn row_to_identity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Identity>> {
    use std::str::FromStr;

    let fingerprint: String = row.get(0)?;
    let tier_str: String = row.get(3)?;
    let memory_raw: String = row.get(9)?;
    let traits_raw: String = row.get(10)?;

    let tier = agentgate_core::Tier::from_str(&tier_str).unwrap_or_default();

    let memory = match serde_json::from_str(&memory_raw) {
        Ok(m) => m,
        Err(e) => return Ok(Err(IdentityError::Corrupt(fingerprint, e))),
    };
    let traits = match serde_json::from_str(&traits_raw) {
        Ok(t) => t,
        Err(e) => return Ok(Err(IdentityError::Corrupt(fingerprint.clone(), e))),
    };

    Ok(Ok(Identity {
        fingerprint,
        id: row.get(1)?,
        display_name: row.get(2)?,
        tier,
        created_at: row.get(4)?,
        calls_today: row.get(5)?,
        calls_total: row.get(6)?,
        last_call_at: row.get(7)?,
        last_call_date: row.get(8)?,
        memory,
        traits,
        billing_customer_id: row.get(11)?,
    }))
}

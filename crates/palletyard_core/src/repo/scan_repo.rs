//! Scan repository contract and SQLite implementation.

use crate::db::DbError;
use crate::model::scan::{ScanRecord, TruckKey};
use crate::model::slot::{SlotId, SlotPosition};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Scan store failure.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted scan data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable store operations needed by the yard engine.
pub trait ScanRepository {
    /// Inserts one scan; an existing (truck, pallet) row wins.
    ///
    /// Returns `true` when a row was written.
    fn insert_scan(&self, record: &ScanRecord) -> RepoResult<bool>;
    /// Deletes every row of `truck`, returning the number removed.
    fn delete_truck(&self, truck: &TruckKey) -> RepoResult<usize>;
    /// All rows ordered by insertion.
    fn list_scans(&self) -> RepoResult<Vec<ScanRecord>>;
    /// Deletes every row.
    fn delete_all(&self) -> RepoResult<usize>;
}

/// SQLite-backed scan repository over a migrated connection.
pub struct SqliteScanRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScanRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ScanRepository for SqliteScanRepository<'_> {
    fn insert_scan(&self, record: &ScanRecord) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO pallet_scans (
                truck,
                pallet,
                first_serial,
                last_serial,
                slot_id,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                record.truck.as_str(),
                record.pallet.as_str(),
                record.first_serial.as_str(),
                record.last_serial.as_str(),
                record.slot.to_string(),
                record.position.as_u8(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_truck(&self, truck: &TruckKey) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM pallet_scans WHERE truck = ?1;", [truck.as_str()])?;
        Ok(removed)
    }

    fn list_scans(&self) -> RepoResult<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                truck,
                pallet,
                first_serial,
                last_serial,
                slot_id,
                position,
                inserted_at
             FROM pallet_scans
             ORDER BY id ASC;",
        )?;

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_scan_row(row)?);
        }
        Ok(records)
    }

    fn delete_all(&self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM pallet_scans;", [])?;
        Ok(removed)
    }
}

fn parse_scan_row(row: &Row<'_>) -> RepoResult<ScanRecord> {
    let slot_text: String = row.get("slot_id")?;
    let slot = slot_text.parse::<SlotId>().map_err(|err| {
        RepoError::InvalidData(format!("{err} in pallet_scans.slot_id"))
    })?;

    let position_value: i64 = row.get("position")?;
    let position = u8::try_from(position_value)
        .ok()
        .and_then(SlotPosition::from_u8)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid position `{position_value}` in pallet_scans.position"
            ))
        })?;

    let truck: String = row.get("truck")?;
    Ok(ScanRecord {
        truck: TruckKey::new(truck),
        pallet: row.get("pallet")?,
        first_serial: row.get("first_serial")?,
        last_serial: row.get("last_serial")?,
        slot,
        position,
        inserted_at: row.get("inserted_at")?,
    })
}

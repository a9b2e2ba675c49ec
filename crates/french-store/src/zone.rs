//! Single-row store for the child's behavioral zone.

use std::str::FromStr;
use std::sync::Arc;

use rusqlite::OptionalExtension;

use french_core::error::FrenchError;
use french_core::types::{Timestamp, Zone};

use crate::db::Database;

/// Durable zone scalar. Reads default to Green when the row is unset.
pub struct ZoneStore {
    db: Arc<Database>,
}

impl ZoneStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Current zone, Green if never set.
    pub fn get(&self) -> Result<Zone, FrenchError> {
        self.db.with_conn(|conn| {
            let stored: Option<String> = conn
                .query_row("SELECT zone FROM zone WHERE id = 1", [], |row| row.get(0))
                .optional()
                .map_err(|e| FrenchError::Storage(format!("Failed to read zone: {}", e)))?;

            match stored {
                Some(s) => Zone::from_str(&s).map_err(FrenchError::Storage),
                None => Ok(Zone::Green),
            }
        })
    }

    /// Overwrite the zone (last write wins). Returns the stored value.
    pub fn set(&self, zone: Zone) -> Result<Zone, FrenchError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO zone (id, zone, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT (id) DO UPDATE SET zone = excluded.zone, updated_at = excluded.updated_at",
                rusqlite::params![zone.to_string(), Timestamp::now().0],
            )
            .map_err(|e| FrenchError::Storage(format!("Failed to set zone: {}", e)))?;
            Ok(zone)
        })
    }

    /// Reset back to the Green default.
    pub fn reset(&self) -> Result<Zone, FrenchError> {
        self.set(Zone::Green)
    }
}

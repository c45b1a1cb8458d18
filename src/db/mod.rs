use crate::config::{DatabaseLocation, StoreSettings};
use crate::errors::{AppError, AppResult};
use crate::extraction::UNKNOWN_BUSINESS_UNIT;
use crate::models::{RoiFields, RoiInputRecord};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use std::fs;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const SELECT_COLUMNS: &str = "use_case_title, business_unit, labor_impact_hours, labor_cost_hourly,
     cost_avoidance_annual, revenue_impact_annual, risk_mitigation_score, customer_reach_score,
     time_to_value_hours, implementation_cost_hourly, confidence_level, updated_at";

/// Durable ROI inputs keyed by use case title.
///
/// A store whose connection could not be opened, or has been closed, still
/// answers every call: the `try_*` methods return `AppError::Connectivity` and
/// the plain methods return `false`, `None`, or an empty collection.
#[derive(Debug)]
pub struct RoiStore {
    conn: Mutex<Option<Connection>>,
    location: Option<DatabaseLocation>,
}

impl RoiStore {
    pub fn open(settings: &StoreSettings) -> AppResult<Self> {
        let location = settings.location()?;
        let conn = open_connection(&location, settings.busy_timeout)
            .map_err(|error| AppError::Connectivity(format!("{}: {}", settings.describe(), error)))?;

        tracing::info!(target_db = %settings.describe(), "roi store connected");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            location: Some(location),
        })
    }

    /// Opens the store, degrading to a disconnected store when that fails.
    pub fn connect(settings: &StoreSettings) -> Self {
        match Self::open(settings) {
            Ok(store) => store,
            Err(error) => {
                tracing::warn!(error = %error, "roi store unavailable; inputs will only last for this session");
                Self::disconnected()
            }
        }
    }

    pub fn disconnected() -> Self {
        Self {
            conn: Mutex::new(None),
            location: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    pub fn location(&self) -> Option<&DatabaseLocation> {
        self.location.as_ref()
    }

    /// Upserts the inputs for `title`. Returns false on any failure.
    pub fn save(&self, title: &str, fields: &RoiFields, business_unit: Option<&str>) -> bool {
        match self.try_save(title, fields, business_unit) {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(use_case = %title, error = %error, "failed to save roi inputs");
                false
            }
        }
    }

    pub fn load(&self, title: &str) -> Option<RoiInputRecord> {
        self.try_load(title).unwrap_or_else(|error| {
            tracing::warn!(use_case = %title, error = %error, "failed to load roi inputs");
            None
        })
    }

    /// All saved inputs, most recently updated first.
    pub fn load_all(&self) -> Vec<RoiInputRecord> {
        self.try_load_all().unwrap_or_else(|error| {
            tracing::warn!(error = %error, "failed to load saved roi inputs");
            Vec::new()
        })
    }

    pub fn delete(&self, title: &str) -> bool {
        self.try_delete(title).unwrap_or_else(|error| {
            tracing::warn!(use_case = %title, error = %error, "failed to delete roi inputs");
            false
        })
    }

    pub fn list_keys(&self) -> Vec<String> {
        self.try_list_keys().unwrap_or_else(|error| {
            tracing::warn!(error = %error, "failed to list saved use cases");
            Vec::new()
        })
    }

    /// Releases the connection. Later calls are no-ops.
    pub fn close(&self) {
        let mut guard = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(conn) = guard.take() {
            if let Err((_, error)) = conn.close() {
                tracing::warn!(error = %error, "roi store did not close cleanly");
            }
        }
    }

    pub fn try_save(&self, title: &str, fields: &RoiFields, business_unit: Option<&str>) -> AppResult<RoiInputRecord> {
        if title.trim().is_empty() {
            return Err(AppError::Persistence("use case title must not be empty".to_string()));
        }
        let business_unit = business_unit
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_BUSINESS_UNIT)
            .to_string();
        let persisted = fields.with_persisted_defaults();

        let mut guard = self.lock()?;
        let conn = connected(&mut guard)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let latest: Option<String> = tx.query_row("SELECT MAX(updated_at) FROM roi_inputs", [], |row| row.get(0))?;
        let mut updated_at = Utc::now().trunc_subsecs(6);
        if let Some(raw) = latest {
            let latest = parse_time(&raw)?;
            if updated_at <= latest {
                updated_at = latest + chrono::Duration::microseconds(1);
            }
        }

        tx.execute(
            "INSERT INTO roi_inputs (
               use_case_title, business_unit, labor_impact_hours, labor_cost_hourly,
               cost_avoidance_annual, revenue_impact_annual, risk_mitigation_score,
               customer_reach_score, time_to_value_hours, implementation_cost_hourly,
               confidence_level, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(use_case_title) DO UPDATE SET
               business_unit = excluded.business_unit,
               labor_impact_hours = excluded.labor_impact_hours,
               labor_cost_hourly = excluded.labor_cost_hourly,
               cost_avoidance_annual = excluded.cost_avoidance_annual,
               revenue_impact_annual = excluded.revenue_impact_annual,
               risk_mitigation_score = excluded.risk_mitigation_score,
               customer_reach_score = excluded.customer_reach_score,
               time_to_value_hours = excluded.time_to_value_hours,
               implementation_cost_hourly = excluded.implementation_cost_hourly,
               confidence_level = excluded.confidence_level,
               updated_at = excluded.updated_at",
            params![
                title,
                business_unit,
                persisted.labor_impact_hours,
                persisted.labor_cost_hourly,
                persisted.cost_avoidance_annual,
                persisted.revenue_impact_annual,
                persisted.risk_mitigation_score,
                persisted.customer_reach_score,
                persisted.time_to_value_hours,
                persisted.implementation_cost_hourly,
                persisted.confidence_level,
                format_time(&updated_at),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(use_case = %title, "saved roi inputs");
        Ok(RoiInputRecord {
            use_case_title: title.to_string(),
            business_unit,
            fields: persisted,
            updated_at: Some(updated_at),
        })
    }

    pub fn try_load(&self, title: &str) -> AppResult<Option<RoiInputRecord>> {
        let mut guard = self.lock()?;
        let conn = connected(&mut guard)?;
        let sql = format!("SELECT {} FROM roi_inputs WHERE use_case_title = ?1", SELECT_COLUMNS);
        conn.query_row(&sql, [title], parse_input_row)
            .optional()
            .map_err(AppError::from)
    }

    pub fn try_load_all(&self) -> AppResult<Vec<RoiInputRecord>> {
        let mut guard = self.lock()?;
        let conn = connected(&mut guard)?;
        let sql = format!(
            "SELECT {} FROM roi_inputs ORDER BY updated_at DESC, use_case_title ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], parse_input_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn try_delete(&self, title: &str) -> AppResult<bool> {
        let mut guard = self.lock()?;
        let conn = connected(&mut guard)?;
        let removed = conn.execute("DELETE FROM roi_inputs WHERE use_case_title = ?1", [title])?;
        if removed > 0 {
            tracing::debug!(use_case = %title, "deleted roi inputs");
        }
        Ok(removed > 0)
    }

    pub fn try_list_keys(&self) -> AppResult<Vec<String>> {
        let mut guard = self.lock()?;
        let conn = connected(&mut guard)?;
        let mut stmt =
            conn.prepare("SELECT use_case_title FROM roi_inputs ORDER BY updated_at DESC, use_case_title ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

fn connected<'a>(guard: &'a mut MutexGuard<'_, Option<Connection>>) -> AppResult<&'a mut Connection> {
    guard
        .as_mut()
        .ok_or_else(|| AppError::Connectivity("roi store is not connected".to_string()))
}

fn open_connection(location: &DatabaseLocation, busy_timeout: Duration) -> AppResult<Connection> {
    let conn = match location {
        DatabaseLocation::Memory => Connection::open_in_memory()?,
        DatabaseLocation::Uri(uri) => Connection::open_with_flags(
            uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_URI,
        )?,
        DatabaseLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
            }
            Connection::open(path)?
        }
    };

    conn.busy_timeout(busy_timeout)?;
    if matches!(location, DatabaseLocation::File(_)) {
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    }
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(conn)
}

fn parse_input_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoiInputRecord> {
    Ok(RoiInputRecord {
        use_case_title: row.get(0)?,
        business_unit: row.get(1)?,
        fields: RoiFields {
            labor_impact_hours: row.get(2)?,
            labor_cost_hourly: row.get(3)?,
            cost_avoidance_annual: row.get(4)?,
            revenue_impact_annual: row.get(5)?,
            risk_mitigation_score: row.get(6)?,
            customer_reach_score: row.get(7)?,
            time_to_value_hours: row.get(8)?,
            implementation_cost_hourly: row.get(9)?,
            confidence_level: row.get(10)?,
        },
        updated_at: Some(parse_time(&row.get::<_, String>(11)?)?),
    })
}

fn format_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
            )
        })
}

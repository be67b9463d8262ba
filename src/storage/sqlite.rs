//! SQLite result store

use crate::error::{RelevanceError, Result};
use crate::processing::analyzer::AnalysisResult;
use crate::processing::scoring::Verdict;
use crate::storage::{ResultStore, StoredAnalysis};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const CREATE_RESULTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
    resume_name TEXT,
    jd_name TEXT,
    final_score REAL,
    verdict TEXT,
    matching_skills TEXT,
    missing_skills TEXT,
    ai_feedback TEXT
)";

const SELECT_COLUMNS: &str = "SELECT id, timestamp, resume_name, jd_name, final_score, verdict, \
     matching_skills, missing_skills, ai_feedback FROM results";

/// Raw column values before decoding
struct ResultRow {
    id: i64,
    timestamp: String,
    resume_name: String,
    jd_name: String,
    final_score: f64,
    verdict: String,
    matching_skills: String,
    missing_skills: String,
    ai_feedback: String,
}

impl ResultRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            resume_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            jd_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            final_score: row.get::<_, Option<f64>>(4)?.unwrap_or_default(),
            verdict: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            matching_skills: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            missing_skills: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            ai_feedback: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        })
    }

    fn decode(self) -> Result<StoredAnalysis> {
        let verdict = Verdict::from_label(&self.verdict).ok_or_else(|| {
            RelevanceError::Persistence(format!(
                "row {} has unknown verdict '{}'",
                self.id, self.verdict
            ))
        })?;

        Ok(StoredAnalysis {
            id: self.id,
            result: AnalysisResult {
                resume_name: self.resume_name,
                job_name: self.jd_name,
                final_score: self.final_score,
                verdict,
                matched_skills: decode_skills(&self.matching_skills)?,
                missing_skills: decode_skills(&self.missing_skills)?,
                feedback: self.ai_feedback,
                created_at: parse_timestamp(&self.timestamp)?,
            },
        })
    }
}

/// Results stored in a `results` table, one row per analysis
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        debug!("Opening result store at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_RESULTS_TABLE)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RelevanceError::Persistence("result store lock poisoned".to_string()))
    }
}

impl ResultStore for SqliteStore {
    fn save(&self, result: &AnalysisResult) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO results (timestamp, resume_name, jd_name, final_score, verdict, \
             matching_skills, missing_skills, ai_feedback) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                format_timestamp(&result.created_at),
                result.resume_name,
                result.job_name,
                result.final_score,
                result.verdict.label(),
                serde_json::to_string(&result.matched_skills)?,
                serde_json::to_string(&result.missing_skills)?,
                result.feedback,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Saved analysis {} for {}", id, result.resume_name);
        Ok(id)
    }

    fn fetch_all(&self) -> Result<Vec<StoredAnalysis>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY julianday(timestamp) DESC, timestamp DESC, id DESC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], ResultRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(ResultRow::decode).collect()
    }

    fn get(&self, id: i64) -> Result<Option<StoredAnalysis>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                ResultRow::from_row,
            )
            .optional()?;

        row.map(ResultRow::decode).transpose()
    }
}

/// Fixed-width UTC timestamps; `julianday` also reads them, so they order against `CURRENT_TIMESTAMP` rows
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    // SQLite CURRENT_TIMESTAMP form
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| RelevanceError::Persistence(format!("bad timestamp '{}': {}", raw, e)))
}

fn decode_skills(raw: &str) -> Result<BTreeSet<String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| RelevanceError::Persistence(format!("bad skill list '{}': {}", raw, e)))
}

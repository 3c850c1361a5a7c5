use chrono::{DateTime, Local};
use directories::ProjectDirs;
use rusqlite::{params, Connection, Result};
use std::path::PathBuf;

use crate::session::AnswerRecord;

pub const UNCATEGORIZED: &str = "uncategorized";

/// Aggregate performance for one content-outline category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: String,
    pub avg_seconds: f64,
    pub miss_rate: f64,
    pub attempts: i64,
}

/// Store of per-question outcomes across sessions, keyed by category.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    pub fn new() -> Result<Self> {
        let db_path = Self::get_db_path().unwrap_or_else(|| PathBuf::from("proctor_history.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        Ok(HistoryDb { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS answer_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL,
                was_correct BOOLEAN NOT NULL,
                seconds INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_answer_history_category ON answer_history(category)",
            [],
        )?;

        Ok(())
    }

    /// Database file under $HOME/.local/state/proctor.
    fn get_db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("proctor");
            Some(state_dir.join("history.db"))
        } else {
            ProjectDirs::from("", "", "proctor")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("history.db"))
        }
    }

    /// Record a finished session's answers in one transaction.
    pub fn record_answers(&mut self, answers: &[AnswerRecord]) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        for answer in answers {
            tx.execute(
                r#"
                INSERT INTO answer_history (category, was_correct, seconds, timestamp)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    answer.category.as_deref().unwrap_or(UNCATEGORIZED),
                    answer.is_correct,
                    answer.seconds as i64,
                    now,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Per-category averages across everything recorded, worst miss rate
    /// first.
    pub fn category_summary(&self) -> Result<Vec<CategorySummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                category,
                AVG(seconds) as avg_seconds,
                (SUM(CASE WHEN was_correct = 0 THEN 1 ELSE 0 END) * 100.0 / COUNT(*)) as miss_rate,
                COUNT(*) as attempts
            FROM answer_history
            GROUP BY category
            ORDER BY miss_rate DESC, category
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(CategorySummary {
                category: row.get(0)?,
                avg_seconds: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                miss_rate: row.get(2)?,
                attempts: row.get(3)?,
            })
        })?;

        let mut summary = Vec::new();
        for row in rows {
            summary.push(row?);
        }

        Ok(summary)
    }

    /// When the most recent recorded answer landed, if any.
    pub fn last_recorded_at(&self) -> Result<Option<DateTime<Local>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT MAX(timestamp) FROM answer_history")?;
        let latest: Option<String> = stmt.query_row([], |row| row.get(0))?;

        Ok(latest.and_then(|ts| {
            DateTime::parse_from_rfc3339(&ts)
                .ok()
                .map(|dt| dt.with_timezone(&Local))
        }))
    }

    /// Clear all history (for testing or reset purposes).
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM answer_history", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> HistoryDb {
        let conn = Connection::open_in_memory().unwrap();
        HistoryDb::init_schema(&conn).unwrap();
        HistoryDb { conn }
    }

    fn answer(category: Option<&str>, is_correct: bool, seconds: u64) -> AnswerRecord {
        AnswerRecord {
            index: 0,
            question: "q".into(),
            selected: "A. first".into(),
            correct_answer: "A".into(),
            is_correct,
            seconds,
            rationale: None,
            category: category.map(String::from),
        }
    }

    #[test]
    fn record_and_summarize_one_category() {
        let mut db = create_test_db();
        db.record_answers(&[
            answer(Some("Planning"), true, 10),
            answer(Some("Planning"), false, 20),
        ])
        .unwrap();

        let summary = db.category_summary().unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].category, "Planning");
        assert_eq!(summary[0].avg_seconds, 15.0);
        assert_eq!(summary[0].miss_rate, 50.0);
        assert_eq!(summary[0].attempts, 2);
    }

    #[test]
    fn missing_category_buckets_as_uncategorized() {
        let mut db = create_test_db();
        db.record_answers(&[answer(None, true, 5)]).unwrap();

        let summary = db.category_summary().unwrap();
        assert_eq!(summary[0].category, UNCATEGORIZED);
    }

    #[test]
    fn worst_miss_rate_sorts_first() {
        let mut db = create_test_db();
        db.record_answers(&[
            answer(Some("Execution"), true, 10),
            answer(Some("Risk"), false, 30),
            answer(Some("Risk"), false, 40),
        ])
        .unwrap();

        let summary = db.category_summary().unwrap();
        assert_eq!(summary[0].category, "Risk");
        assert_eq!(summary[0].miss_rate, 100.0);
        assert_eq!(summary[1].category, "Execution");
        assert_eq!(summary[1].miss_rate, 0.0);
    }

    #[test]
    fn aggregates_accumulate_across_sessions() {
        let mut db = create_test_db();
        db.record_answers(&[answer(Some("Risk"), true, 10)]).unwrap();
        db.record_answers(&[answer(Some("Risk"), false, 30)]).unwrap();

        let summary = db.category_summary().unwrap();
        assert_eq!(summary[0].attempts, 2);
        assert_eq!(summary[0].avg_seconds, 20.0);
        assert_eq!(summary[0].miss_rate, 50.0);
    }

    #[test]
    fn last_recorded_at_tracks_inserts() {
        let mut db = create_test_db();
        assert_eq!(db.last_recorded_at().unwrap(), None);

        db.record_answers(&[answer(None, true, 5)]).unwrap();
        let latest = db.last_recorded_at().unwrap().unwrap();
        assert!((Local::now() - latest).num_seconds() < 5);
    }

    #[test]
    fn clear_removes_everything() {
        let mut db = create_test_db();
        db.record_answers(&[answer(Some("Planning"), true, 5)]).unwrap();
        db.clear().unwrap();
        assert!(db.category_summary().unwrap().is_empty());
    }
}

//! File-backed persistence: one append-only JSON-lines history file per
//! exercise, plus a single profile blob (§6 EXTERNAL INTERFACES). Grounded
//! on the manager-pattern style of `data_management.rs`, minus the
//! sqlite backing — history here is just lines of JSON, which is all the
//! core's replay functions ever need.
//!
//! Each line on disk is a `StoredRecord { id, session }`, not a bare
//! `SessionResult` — ids are assigned once on append and persisted, so they
//! survive later deletes rather than renumbering by line position.

use crate::error::{BarcoachError, Result};
use crate::models::{SessionResult, UserProfile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A history record paired with its persisted storage id.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: u64,
    pub session: SessionResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: u64,
    session: SessionResult,
}

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HistoryStore { path: path.into() }
    }

    pub fn path_for(history_dir: &Path, exercise_id: &str) -> PathBuf {
        history_dir.join(format!("{}.jsonl", exercise_id))
    }

    /// Read every record, in the id each was assigned on append. Missing
    /// file reads as empty history.
    pub fn load(&self) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let mut out = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let stored: StoredRecord = serde_json::from_str(line)?;
            out.push(HistoryRecord { id: stored.id, session: stored.session });
        }
        Ok(out)
    }

    pub fn load_sessions(&self) -> Result<Vec<SessionResult>> {
        Ok(self.load()?.into_iter().map(|r| r.session).collect())
    }

    /// Append one record to the end of the file, creating parent
    /// directories and the file itself on first use. The new id is one
    /// past the highest id seen so far, so deleted ids are never reused.
    pub fn append(&self, session: &SessionResult) -> Result<u64> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let existing = self.load()?;
        let next_id = existing.iter().map(|r| r.id).max().unwrap_or(0) + 1;

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(&StoredRecord { id: next_id, session: session.clone() })?;
        writeln!(file, "{}", line)?;
        Ok(next_id)
    }

    /// Append several records in one pass (used by the shift-forward
    /// operator, which may add a run of REST records at once).
    pub fn append_all(&self, sessions: &[SessionResult]) -> Result<()> {
        for session in sessions {
            self.append(session)?;
        }
        Ok(())
    }

    /// Delete by persisted id, rewriting the file without that record. The
    /// ids of surviving records are left untouched.
    pub fn delete(&self, id: u64) -> Result<()> {
        let records = self.load()?;
        if !records.iter().any(|r| r.id == id) {
            return Err(BarcoachError::InvalidInput(format!("no history record with id {}", id)));
        }
        let remaining: Vec<HistoryRecord> = records.into_iter().filter(|r| r.id != id).collect();
        self.rewrite(&remaining)
    }

    /// Remove every record on the given dates whose session_type is REST
    /// (used by the shift-forward operator's negative-shift branch, which
    /// must never remove non-REST records).
    pub fn delete_rest_on_dates(&self, dates: &[chrono::NaiveDate]) -> Result<()> {
        let records = self.load()?;
        let remaining: Vec<HistoryRecord> = records
            .into_iter()
            .filter(|r| !(r.session.session_type == crate::models::SessionType::Rest && dates.contains(&r.session.date)))
            .collect();
        self.rewrite(&remaining)
    }

    fn rewrite(&self, records: &[HistoryRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = String::new();
        for record in records {
            content.push_str(&serde_json::to_string(&StoredRecord { id: record.id, session: record.session.clone() })?);
            content.push('\n');
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProfileStore { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<UserProfile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, profile: &UserProfile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(profile)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletedSet, SessionType};
    use chrono::NaiveDate;

    fn session(date: NaiveDate) -> SessionResult {
        SessionResult {
            date,
            exercise_id: "pull_up".into(),
            session_type: SessionType::S,
            variant: "pronated".into(),
            bodyweight_kg: 82.0,
            sets: vec![CompletedSet { reps: 8, weight_kg: 0.0, rest_s: Some(180), rir: None }],
            equipment: None,
            planned_sets: None,
            notes: None,
        }
    }

    #[test]
    fn test_append_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("pull_up.jsonl"));
        let id1 = store.append(&session(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())).unwrap();
        let id2 = store.append(&session(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap())).unwrap();
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_delete_by_id_rewrites_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("pull_up.jsonl"));
        store.append(&session(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())).unwrap();
        store.append(&session(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap())).unwrap();
        store.delete(1).unwrap();
        let records = store.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session.date, NaiveDate::from_ymd_opt(2026, 1, 3).unwrap());
    }

    #[test]
    fn test_delete_unknown_id_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("pull_up.jsonl"));
        assert!(store.delete(1).is_err());
    }

    #[test]
    fn test_ids_are_stable_across_delete_and_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("pull_up.jsonl"));
        store.append(&session(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())).unwrap();
        store.append(&session(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap())).unwrap();
        store.delete(1).unwrap();
        // id 2 survives delete with its original id, not renumbered to 1.
        let records = store.load().unwrap();
        assert_eq!(records[0].id, 2);
        // the next append gets id 3, never reusing the deleted id 1.
        let id3 = store.append(&session(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap())).unwrap();
        assert_eq!(id3, 3);
    }

    #[test]
    fn test_missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nonexistent.jsonl"));
        assert_eq!(store.load().unwrap().len(), 0);
    }

    #[test]
    fn test_profile_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profile.json"));
        let profile = UserProfile {
            height_cm: Some(180.0),
            sex: None,
            bodyweight_kg: 82.0,
            default_days_per_week: 3,
            exercise_days: Default::default(),
            baseline_max: Default::default(),
            target_max_reps: Default::default(),
            enabled_exercises: vec!["pull_up".into()],
            plan_start_date: Default::default(),
            rest_preference: None,
            injury_notes: None,
        };
        store.save(&profile).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.bodyweight_kg, 82.0);
    }
}

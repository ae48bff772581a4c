use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::identity::Snapshot;
use crate::model::CurrentEvaluation;

pub const QUESTIONS_FILE: &str = "question.json";
pub const FACILITIES_FILE: &str = "prüfstellen.json";
pub const EVALUATION_FILE: &str = "current-evaluation.json";

/// JSON artifacts in the data directory.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Pretty-print `value` into `name`, replacing the file in one rename so
    /// readers never see a partial write.
    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf, StoreError> {
        let path = self.path(name);
        fs::create_dir_all(&self.dir).map_err(|source| io_err(&self.dir, source))?;

        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })?;

        let tmp = self.path(&format!(".{name}.tmp"));
        fs::write(&tmp, json).map_err(|source| io_err(&tmp, source))?;
        fs::rename(&tmp, &path).map_err(|source| io_err(&path, source))?;

        info!("Data saved to {}", path.display());
        Ok(path)
    }

    /// Previous question corpus. A missing or unreadable file is an empty
    /// snapshot: every question then counts as new.
    pub fn load_snapshot(&self) -> Snapshot {
        let path = self.path(QUESTIONS_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("No previous corpus at {} ({}), enriching everything", path.display(), e);
                return Snapshot::empty();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Snapshot::from_value(value),
            Err(e) => {
                warn!("Previous corpus {} is not valid JSON ({}), ignoring it", path.display(), e);
                Snapshot::empty()
            }
        }
    }

    pub fn load_evaluation(&self) -> Option<CurrentEvaluation> {
        let raw = fs::read_to_string(self.path(EVALUATION_FILE)).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;

    #[test]
    fn writes_pretty_json_and_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path().join("data"));
        let path = store
            .write_json(EVALUATION_FILE, &CurrentEvaluation { exam_date: "14.11.2025".into() })
            .unwrap();

        let raw = fs::read_to_string(path).unwrap();
        assert_eq!(raw, "{\n  \"examDate\": \"14.11.2025\"\n}");
        assert_eq!(store.load_evaluation().unwrap().exam_date, "14.11.2025");
    }

    #[test]
    fn no_temp_file_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        store.write_json(QUESTIONS_FILE, &Vec::<Question>::new()).unwrap();
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![QUESTIONS_FILE.to_string()]);
    }

    #[test]
    fn missing_or_broken_snapshot_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        assert!(store.load_snapshot().is_empty());

        fs::write(store.path(QUESTIONS_FILE), "[{ not json").unwrap();
        assert!(store.load_snapshot().is_empty());
    }

    #[test]
    fn snapshot_roundtrips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let mut q = Question::new("1");
        q.question = "Q".into();
        q.id = crate::identity::content_id(&q);
        store.write_json(QUESTIONS_FILE, &vec![q.clone()]).unwrap();

        let snapshot = store.load_snapshot();
        assert_eq!(snapshot.find(&q.id), Some(&q));
    }
}

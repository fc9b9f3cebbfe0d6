//! Resumable results store.
//!
//! A single JSON document mapping example id to session record, read once at
//! startup and rewritten atomically (write-temp-then-rename) after updates.
//! Ids already present are treated as complete and skipped on resume; this is
//! the pipeline's only fault-tolerance mechanism.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::record::SessionRecord;

#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
    records: BTreeMap<String, SessionRecord>,
}

impl Checkpoint {
    /// Open the checkpoint at `path`, loading existing records if the file
    /// exists. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SessionRecord> {
        self.records.get(id)
    }

    /// Insert-only by design: completed claims are never overwritten.
    pub fn insert(&mut self, id: impl Into<String>, record: SessionRecord) {
        self.records.entry(id.into()).or_insert(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &BTreeMap<String, SessionRecord> {
        &self.records
    }

    /// Persist the store. Writes to a sibling temp file first, then renames
    /// over the target so a crash mid-write cannot corrupt completed results.
    pub fn save(&self) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&self.records)?;
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> SessionRecord {
        SessionRecord::Single(vec![text.to_string()])
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::load(dir.path().join("results.json")).unwrap();
        assert!(checkpoint.is_empty());
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        let mut checkpoint = Checkpoint::load(&path).unwrap();
        checkpoint.insert("1", record("[VERDICT]: TRUE"));
        checkpoint.insert("2", record("[VERDICT]: FALSE"));
        checkpoint.save().unwrap();

        let reloaded = Checkpoint::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("1"));
        assert_eq!(reloaded.get("2"), Some(&record("[VERDICT]: FALSE")));
    }

    #[test]
    fn insert_never_overwrites_completed_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut checkpoint = Checkpoint::load(dir.path().join("results.json")).unwrap();
        checkpoint.insert("1", record("first"));
        checkpoint.insert("1", record("second"));
        assert_eq!(checkpoint.get("1"), Some(&record("first")));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut checkpoint = Checkpoint::load(&path).unwrap();
        checkpoint.insert("1", record("x"));
        checkpoint.save().unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("results.json")]);
    }

    #[test]
    fn save_overwrites_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut checkpoint = Checkpoint::load(&path).unwrap();
        checkpoint.insert("1", record("x"));
        checkpoint.save().unwrap();
        checkpoint.insert("2", record("y"));
        checkpoint.save().unwrap();

        let reloaded = Checkpoint::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
    }
}

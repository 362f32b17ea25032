//! Append-only mapping store of resolution records.
//!
//! The on-disk format is a CSV file with one row per resolved ordinal:
//!
//! ```text
//! idx,raw_ref,best_doi,best_title,best_container_title,best_year,best_volume,best_page,best_article_number,score,decision
//! ```
//!
//! Rows are only ever appended. Each append is flushed and synced before it
//! returns, so an interrupted run leaves every completed record on disk.

use crate::error::{ResolveError, Result};
use crate::types::{Decision, MatchedWork, ResolutionRecord};
use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Column header of the CSV mapping file.
pub const MAPPING_HEADER: [&str; 11] = [
    "idx",
    "raw_ref",
    "best_doi",
    "best_title",
    "best_container_title",
    "best_year",
    "best_volume",
    "best_page",
    "best_article_number",
    "score",
    "decision",
];

const REQUIRED_COLUMNS: [&str; 3] = ["idx", "best_doi", "decision"];

/// Durable, append-only store of [`ResolutionRecord`]s.
pub trait MappingStore {
    /// All records, in append order.
    fn load(&self) -> Result<Vec<ResolutionRecord>>;

    /// Durably append one record.
    fn append(&mut self, record: &ResolutionRecord) -> Result<()>;

    /// Highest ordinal present, `None` for an empty store.
    fn max_ordinal(&self) -> Result<Option<u32>> {
        Ok(self.load()?.iter().map(|r| r.ordinal).max())
    }
}

impl<S: MappingStore + ?Sized> MappingStore for &mut S {
    fn load(&self) -> Result<Vec<ResolutionRecord>> {
        (**self).load()
    }

    fn append(&mut self, record: &ResolutionRecord) -> Result<()> {
        (**self).append(record)
    }

    fn max_ordinal(&self) -> Result<Option<u32>> {
        (**self).max_ordinal()
    }
}

/// In-memory store, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ResolutionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records appended so far.
    pub fn records(&self) -> &[ResolutionRecord] {
        &self.records
    }
}

impl MappingStore for MemoryStore {
    fn load(&self) -> Result<Vec<ResolutionRecord>> {
        Ok(self.records.clone())
    }

    fn append(&mut self, record: &ResolutionRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// CSV-file store.
#[derive(Debug, Clone)]
pub struct CsvMappingStore {
    path: PathBuf,
}

/// Raw mapping row; every column is optional text so that hand-edited or
/// partially written files still load.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MappingRow {
    idx: String,
    raw_ref: String,
    best_doi: String,
    best_title: String,
    best_container_title: String,
    best_year: String,
    best_volume: String,
    best_page: String,
    best_article_number: String,
    score: String,
    decision: String,
}

impl CsvMappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_empty_file(&self) -> Result<bool> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

impl MappingStore for CsvMappingStore {
    fn load(&self) -> Result<Vec<ResolutionRecord>> {
        if self.is_empty_file()? {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(&self.path)?;

        let headers = reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ResolveError::MissingColumn {
                    column: column.to_string(),
                    available: headers.iter().map(String::from).collect(),
                });
            }
        }

        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<MappingRow>().enumerate() {
            let row = row?;
            match row_to_record(row) {
                Some(record) => records.push(record),
                None => tracing::debug!(line = line + 2, "skipping mapping row without a valid idx"),
            }
        }
        Ok(records)
    }

    fn append(&mut self, record: &ResolutionRecord) -> Result<()> {
        let write_header = self.is_empty_file()?;
        let mut file: File = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        if !write_header && !ends_with_newline(&mut file)? {
            tracing::debug!(path = %self.path.display(), "mapping file lacks a final newline");
            file.write_all(b"\n")?;
        }

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&file);
            if write_header {
                writer.write_record(MAPPING_HEADER)?;
            }
            writer.write_record(record_to_row(record))?;
            writer.flush()?;
        }

        file.sync_data()?;
        Ok(())
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn record_to_row(record: &ResolutionRecord) -> [String; 11] {
    let matched = record.matched.clone().unwrap_or_default();
    [
        record.ordinal.to_string(),
        record.raw_text.clone(),
        record.accepted_identifier().unwrap_or_default().trim().to_lowercase(),
        matched.title.unwrap_or_default(),
        matched.container_title.unwrap_or_default(),
        matched.year.map(|y| y.to_string()).unwrap_or_default(),
        matched.volume.unwrap_or_default(),
        matched.page.unwrap_or_default(),
        matched.article_number.unwrap_or_default(),
        record.score.to_string(),
        record.decision.as_str().to_string(),
    ]
}

fn row_to_record(row: MappingRow) -> Option<ResolutionRecord> {
    let ordinal: u32 = row.idx.trim().parse().ok()?;

    let decision = Decision::from_str_loose(&row.decision).unwrap_or_else(|| {
        tracing::debug!(ordinal, decision = %row.decision, "unknown decision, treating as no_match");
        Decision::NoMatch
    });

    let doi = row.best_doi.trim().to_lowercase();
    let identifier = (decision == Decision::Accepted && !doi.is_empty()).then_some(doi);

    let matched = MatchedWork {
        title: nonempty(row.best_title),
        container_title: nonempty(row.best_container_title),
        year: row.best_year.trim().parse().ok(),
        volume: nonempty(row.best_volume),
        page: nonempty(row.best_page),
        article_number: nonempty(row.best_article_number),
    };

    Some(ResolutionRecord {
        ordinal,
        raw_text: row.raw_ref,
        score: row.score.trim().parse().unwrap_or(0),
        decision,
        identifier,
        matched: (!matched.is_empty()).then_some(matched),
    })
}

fn nonempty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ordinal: u32, decision: Decision, doi: Option<&str>) -> ResolutionRecord {
        ResolutionRecord {
            ordinal,
            raw_text: format!("[{}] A. Author, Chem. Rev. 2010, 110, 111.", ordinal),
            score: 40,
            decision,
            identifier: doi.map(String::from),
            matched: Some(MatchedWork {
                title: Some("A title, with a comma".to_string()),
                container_title: Some("Chemical Reviews".to_string()),
                year: Some(2010),
                volume: Some("110".to_string()),
                page: Some("111-131".to_string()),
                article_number: None,
            }),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvMappingStore::new(dir.path().join("resolved.csv"));
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.max_ordinal().unwrap(), None);
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.csv");
        let mut store = CsvMappingStore::new(&path);
        store
            .append(&record(1, Decision::Accepted, Some("10.1021/cr900056b")))
            .unwrap();
        store.append(&record(2, Decision::NoMatch, None)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("idx,raw_ref").count(), 1);
        assert_eq!(text.lines().count(), 3);

        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![
            record(1, Decision::Accepted, Some("10.1021/cr900056b")),
            record(2, Decision::NoMatch, None),
        ]);
        assert_eq!(store.max_ordinal().unwrap(), Some(2));
    }

    #[test]
    fn test_identifier_only_persisted_when_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.csv");
        let mut store = CsvMappingStore::new(&path);
        store
            .append(&record(7, Decision::LowConfidence, Some("10.1/nope")))
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("10.1/nope"));
        assert_eq!(store.load().unwrap()[0].identifier, None);
    }

    #[test]
    fn test_load_tolerates_foreign_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.csv");
        std::fs::write(
            &path,
            "idx,best_doi,decision,note\n\
             3,10.1/ABC,Accepted,checked\n\
             oops,10.1/x,accepted,\n\
             9,,no_match,\n\
             5,10.1/y,weird,\n",
        )
        .unwrap();

        let store = CsvMappingStore::new(&path);
        let loaded = store.load().unwrap();
        let ordinals: Vec<u32> = loaded.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![3, 9, 5]);
        assert_eq!(loaded[0].identifier.as_deref(), Some("10.1/abc"));
        assert_eq!(loaded[0].score, 0);
        assert_eq!(loaded[2].decision, Decision::NoMatch);
        assert_eq!(store.max_ordinal().unwrap(), Some(9));
    }

    #[test]
    fn test_load_requires_core_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.csv");
        std::fs::write(&path, "idx,score\n1,10\n").unwrap();

        let err = CsvMappingStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ResolveError::MissingColumn { ref column, .. } if column == "best_doi"));
    }

    #[test]
    fn test_append_after_foreign_rows_keeps_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.csv");
        let mut store = CsvMappingStore::new(&path);
        store.append(&record(1, Decision::NoMatch, None)).unwrap();

        let mut reopened = CsvMappingStore::new(&path);
        reopened.append(&record(2, Decision::NoMatch, None)).unwrap();
        assert_eq!(reopened.load().unwrap().len(), 2);
    }

    #[test]
    fn test_append_after_unterminated_last_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.csv");
        std::fs::write(&path, "idx,raw_ref,best_doi,score,decision\n1,[1] edited by hand,10.1/a,50,accepted").unwrap();

        let mut store = CsvMappingStore::new(&path);
        store.append(&record(2, Decision::NoMatch, None)).unwrap();

        let loaded = store.load().unwrap();
        let ordinals: Vec<u32> = loaded.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
        assert_eq!(loaded[0].identifier.as_deref(), Some("10.1/a"));
        assert_eq!(loaded[1].decision, Decision::NoMatch);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.max_ordinal().unwrap(), None);
        store.append(&record(4, Decision::NoMatch, None)).unwrap();
        store.append(&record(2, Decision::NoMatch, None)).unwrap();
        assert_eq!(store.records().len(), 2);
        assert_eq!(store.max_ordinal().unwrap(), Some(4));
    }
}

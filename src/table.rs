//! Minimal in-memory table for extracted CSV data.

use crate::error::{ResolveError, Result};
use std::io::Read;
use std::path::Path;

/// Delimiters tried when sniffing an input file.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// A header row plus string cells; every row has exactly `headers.len()`
/// cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        if row.len() > self.headers.len() {
            tracing::warn!(
                row = self.rows.len() + 1,
                cells = row.len(),
                columns = self.headers.len(),
                dropped = ?&row[self.headers.len()..],
                "row is wider than the header, dropping extra cells"
            );
        }
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Index of the column named `name` (surrounding whitespace ignored).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Like [`column_index`](Self::column_index), but a missing column is an
    /// error listing the available ones.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ResolveError::MissingColumn {
                column: name.to_string(),
                available: self.headers.clone(),
            })
    }

    /// Index of `name`, appending an empty column if it does not exist.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Read a delimited text file, detecting the delimiter from its header.
    pub fn read_path(path: &Path) -> Result<Self> {
        let mut text = String::new();
        std::fs::File::open(path)?.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    /// Parse delimited text, detecting the delimiter from its header.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let header_line = text.lines().next().unwrap_or_default();
        Self::parse_with_delimiter(text, sniff_delimiter(header_line))
    }

    /// Parse delimited text with a known delimiter.
    pub fn parse_with_delimiter(text: &str, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut table = Table::new(headers);
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(String::from).collect());
        }
        Ok(table)
    }

    /// Write as comma-separated text.
    pub fn write_path(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Pick the candidate delimiter occurring most often in the header line,
/// ignoring quoted sections. Defaults to a comma.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut quoted = false;
    for b in header_line.bytes() {
        if b == b'"' {
            quoted = !quoted;
            continue;
        }
        if quoted {
            continue;
        }
        if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|d| *d == b) {
            counts[i] += 1;
        }
    }

    counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
        .map(|(i, _)| CANDIDATE_DELIMITERS[i])
        .unwrap_or(b',')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("Material,Refs.,doi"), b',');
        assert_eq!(sniff_delimiter("Material;Refs.;doi"), b';');
        assert_eq!(sniff_delimiter("Material\tRefs.\tdoi"), b'\t');
        assert_eq!(sniff_delimiter("\"T [C], set\";Refs.;doi"), b';');
        assert_eq!(sniff_delimiter("single"), b',');
    }

    #[test]
    fn test_parse_semicolon_table_pads_short_rows() {
        let table = Table::parse("Material;Refs.;doi\nH2O;[28,224-226];\nO3;[5]\n").unwrap();
        assert_eq!(table.headers, vec!["Material", "Refs.", "doi"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "[28,224-226]");
        assert_eq!(table.rows[1], vec!["O3", "[5]", ""]);
    }

    #[test]
    fn test_wide_row_truncated_to_header() {
        let table = Table::parse("Material,Refs.\nH2O,[1],stray,cells\nO3,[2]\n").unwrap();
        assert_eq!(table.rows[0], vec!["H2O", "[1]"]);
        assert_eq!(table.rows[1], vec!["O3", "[2]"]);
    }

    #[test]
    fn test_quoted_commas_survive() {
        let table = Table::parse("Material,Refs.\nH2O,\"[28,224-226]\"\n").unwrap();
        assert_eq!(table.rows[0][1], "[28,224-226]");
    }

    #[test]
    fn test_ensure_and_require_column() {
        let mut table = Table::parse("a,b\n1,2\n").unwrap();
        assert_eq!(table.ensure_column("b"), 1);
        assert_eq!(table.ensure_column("doi"), 2);
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
        assert!(matches!(
            table.require_column("Refs."),
            Err(ResolveError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut table = Table::new(vec!["Refs.".to_string(), "doi".to_string()]);
        table.push_row(vec!["[1,2]".to_string(), "10.1/a".to_string()]);
        table.write_path(&path).unwrap();

        assert_eq!(Table::read_path(&path).unwrap(), table);
    }
}

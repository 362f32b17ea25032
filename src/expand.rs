//! Row expansion: one output row per referenced ordinal, with the resolved
//! identifier attached.
//!
//! For each source row, in order:
//!
//! 1. A row that already carries an identifier is kept unchanged.
//! 2. Otherwise its reference-list cell is parsed into ordinals and one
//!    expanded row is built per ordinal, with the reference cell rewritten to
//!    `[n]`.
//! 3. Expanded rows whose ordinal has no accepted identifier are omitted. If
//!    none of a row's ordinals resolved, the whole row is dropped and counted.

use crate::error::Result;
use crate::ordinals::parse_reference_list;
use crate::table::Table;
use crate::types::ResolutionRecord;
use std::collections::HashMap;

/// Identifier columns looked for when none is named explicitly.
pub const IDENTIFIER_COLUMN_CANDIDATES: [&str; 2] = ["doi", "doi_list"];

/// Default name of the reference-list column.
pub const DEFAULT_REFS_COLUMN: &str = "Refs.";

/// Column settings for [`expand_table`].
#[derive(Debug, Clone)]
pub struct ExpandConfig {
    /// Column holding reference lists such as `[28,224-226]`.
    pub refs_column: String,
    /// Identifier column; auto-detected (or created as `doi`) when `None`.
    pub identifier_column: Option<String>,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            refs_column: DEFAULT_REFS_COLUMN.to_string(),
            identifier_column: None,
        }
    }
}

impl ExpandConfig {
    pub fn with_refs_column(mut self, column: impl Into<String>) -> Self {
        self.refs_column = column.into();
        self
    }

    /// An explicit identifier column always wins over auto-detection.
    pub fn with_identifier_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.identifier_column = (!column.trim().is_empty()).then(|| column.trim().to_string());
        self
    }
}

/// Counts reported after an expansion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    /// Rows that already had an identifier and were kept as-is.
    pub kept: usize,
    /// Expanded rows emitted.
    pub expanded: usize,
    /// Source rows dropped because none of their ordinals resolved.
    pub dropped: usize,
}

/// Accepted identifiers by ordinal.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMap {
    by_ordinal: HashMap<u32, String>,
}

impl IdentifierMap {
    /// Build from mapping records. When an ordinal appears more than once the
    /// last record wins, whatever its decision.
    pub fn from_records(records: &[ResolutionRecord]) -> Self {
        let mut latest: HashMap<u32, &ResolutionRecord> = HashMap::new();
        for record in records {
            if let Some(previous) = latest.insert(record.ordinal, record) {
                if previous != record {
                    tracing::warn!(
                        ordinal = record.ordinal,
                        "conflicting mapping records, using the last one"
                    );
                }
            }
        }

        let by_ordinal = latest
            .into_iter()
            .filter_map(|(ordinal, record)| {
                record
                    .accepted_identifier()
                    .map(|id| (ordinal, id.to_string()))
            })
            .collect();
        Self { by_ordinal }
    }

    pub fn get(&self, ordinal: u32) -> Option<&str> {
        self.by_ordinal.get(&ordinal).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_ordinal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ordinal.is_empty()
    }
}

/// A source row bound to one ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedRow {
    pub ordinal: u32,
    pub identifier: Option<String>,
    pub cells: Vec<String>,
}

/// Resolve which column holds identifiers: explicit name, else the first
/// present candidate, else `doi`.
pub fn identifier_column_name(table: &Table, config: &ExpandConfig) -> String {
    if let Some(explicit) = &config.identifier_column {
        return explicit.clone();
    }
    IDENTIFIER_COLUMN_CANDIDATES
        .iter()
        .find(|c| table.column_index(c).is_some())
        .unwrap_or(&IDENTIFIER_COLUMN_CANDIDATES[0])
        .to_string()
}

/// Expand one row into per-ordinal rows. The row must already have the
/// identifier column.
pub fn expand_row(
    row: &[String],
    refs_index: usize,
    id_index: usize,
    identifiers: &IdentifierMap,
) -> Vec<ExpandedRow> {
    let list = parse_reference_list(&row[refs_index]);
    for bad in &list.rejected {
        tracing::warn!(cell = %row[refs_index], entry = %bad, "skipping unparseable reference entry");
    }

    list.ordinals
        .into_iter()
        .map(|ordinal| {
            let identifier = identifiers.get(ordinal).map(String::from);
            let mut cells = row.to_vec();
            cells[refs_index] = format!("[{}]", ordinal);
            cells[id_index] = identifier.clone().unwrap_or_default();
            ExpandedRow {
                ordinal,
                identifier,
                cells,
            }
        })
        .collect()
}

/// Expand every row of `table`. Output rows keep source row order, then
/// ascending ordinal.
pub fn expand_table(
    table: &Table,
    identifiers: &IdentifierMap,
    config: &ExpandConfig,
) -> Result<(Table, ExpansionReport)> {
    let refs_index = table.require_column(&config.refs_column)?;

    let mut source = table.clone();
    let id_column = identifier_column_name(&source, config);
    let id_index = source.ensure_column(&id_column);

    let mut output = Table::new(source.headers.clone());
    let mut report = ExpansionReport::default();

    for row in &source.rows {
        if !row[id_index].trim().is_empty() {
            output.push_row(row.clone());
            report.kept += 1;
            continue;
        }

        let resolved: Vec<ExpandedRow> = expand_row(row, refs_index, id_index, identifiers)
            .into_iter()
            .filter(|r| r.identifier.is_some())
            .collect();

        if resolved.is_empty() {
            report.dropped += 1;
            continue;
        }
        for expanded in resolved {
            output.push_row(expanded.cells);
            report.expanded += 1;
        }
    }

    Ok((output, report))
}

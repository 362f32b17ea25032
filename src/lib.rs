//! # refdoi
//!
//! Recover DOIs for title-less bibliographic references and attach them to
//! extracted table rows.
//!
//! Provides:
//! - **Parsing**: split a `[n]`-numbered reference list into structured
//!   [`Reference`]s
//! - **Scoring**: rank Crossref candidates against a reference
//! - **Resolution**: a resumable, append-only driver that persists one
//!   decision per reference
//! - **Expansion**: turn table rows citing `[28,224-226]` into one row per
//!   resolved reference
//! - **CLI**: `refdoi` binary (feature `cli`)
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn example() -> refdoi::error::Result<()> {
//! use refdoi::{CrossrefClient, CsvMappingStore, ResolveConfig, Resolver, StartPoint};
//!
//! let text = std::fs::read_to_string("references.txt")?;
//! let references = refdoi::parse_references(&text);
//!
//! let client = CrossrefClient::from_env();
//! let store = CsvMappingStore::new("resolved_refs.csv");
//! let config = ResolveConfig::default().with_start(StartPoint::Resume);
//!
//! let summary = Resolver::new(client, store, config).run(&references).await?;
//! println!("{} accepted of {}", summary.accepted, summary.attempted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Expanding a table
//!
//! ```
//! use refdoi::{expand_table, ExpandConfig, IdentifierMap, Table};
//!
//! let table = Table::parse("Material,Refs.\nH2O,\"[1,2]\"\n").unwrap();
//! let identifiers = IdentifierMap::default();
//! let (out, report) = expand_table(&table, &identifiers, &ExpandConfig::default()).unwrap();
//! assert!(out.rows.is_empty());
//! assert_eq!(report.dropped, 1);
//! ```

pub mod client;
pub mod error;
pub mod expand;
pub mod journals;
pub mod ordinals;
pub mod parse;
pub mod query;
pub mod rate_limit;
pub mod references;
pub mod registry;
pub mod resolver;
pub mod score;
pub mod search;
pub mod store;
pub mod table;
pub mod types;

// Re-export key types at the crate root.
pub use client::CrossrefClient;
pub use error::ResolveError;
pub use expand::{expand_table, ExpandConfig, ExpansionReport, IdentifierMap};
pub use ordinals::parse_reference_list;
pub use query::WorksQuery;
pub use references::parse_references;
pub use registry::{MockRegistry, Registry};
pub use resolver::{HaltReason, ResolveConfig, Resolver, RunSummary, StartPoint};
pub use store::{CsvMappingStore, MappingStore, MemoryStore};
pub use table::Table;
pub use types::*;

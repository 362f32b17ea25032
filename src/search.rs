//! Crossref works search.
//!
//! Covers the raw `/works` search and the two-stage candidate lookup used by
//! the resolver.

use crate::client::CrossrefClient;
use crate::error::Result;
use crate::parse::parse_works_response;
use crate::query::{bibliographic_query, structured_query, WorksQuery};
use crate::registry::{QueryFuture, Registry};
use crate::types::{Candidate, Reference};

impl CrossrefClient {
    /// Run one `/works` search.
    pub async fn search_works(&self, query: &WorksQuery) -> Result<Vec<Candidate>> {
        let body = self.get("works", &query.params()).await?;
        parse_works_response(&body)
    }

    /// Find candidates for a parsed reference.
    ///
    /// Tries a field-by-field query first; if that fails or finds nothing,
    /// falls back to a free-form bibliographic query. Only a failure of the
    /// fallback is reported as an error.
    pub async fn find_candidates(&self, reference: &Reference, rows: u32) -> Result<Vec<Candidate>> {
        if reference.is_empty() {
            tracing::debug!(ordinal = reference.ordinal, "nothing to search for");
            return Ok(Vec::new());
        }

        let structured = structured_query(reference, rows);
        if structured.has_terms() {
            match self.search_works(&structured).await {
                Ok(items) if !items.is_empty() => return Ok(items),
                Ok(_) => {
                    tracing::debug!(ordinal = reference.ordinal, "structured query found nothing");
                }
                Err(e) => {
                    tracing::debug!(ordinal = reference.ordinal, error = %e, "structured query failed");
                }
            }
        }

        match bibliographic_query(reference, rows) {
            Some(fallback) => self.search_works(&fallback).await,
            None => Ok(Vec::new()),
        }
    }
}

impl Registry for CrossrefClient {
    fn name(&self) -> &str {
        "Crossref"
    }

    fn query<'a>(&'a self, reference: &'a Reference, rows: u32) -> QueryFuture<'a> {
        Box::pin(self.find_candidates(reference, rows))
    }
}

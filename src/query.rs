//! Crossref `/works` query builder.
//!
//! # Example
//!
//! ```
//! use refdoi::WorksQuery;
//!
//! let query = WorksQuery::new()
//!     .rows(5)
//!     .container_title("Chemical Reviews")
//!     .published_in(2010)
//!     .volume("110");
//! assert_eq!(
//!     query.to_string(),
//!     "rows=5&query.container-title=Chemical Reviews&filter=from-pub-date:2010-01-01,until-pub-date:2010-12-31,volume:110"
//! );
//! ```

use crate::journals;
use crate::types::Reference;

/// Fields requested for every candidate.
pub const SELECT_FIELDS: &str =
    "DOI,title,container-title,short-container-title,issued,volume,page,author,article-number";

/// Builder for Crossref `/works` query parameters.
#[derive(Debug, Clone, Default)]
pub struct WorksQuery {
    params: Vec<(String, String)>,
    filters: Vec<String>,
}

impl WorksQuery {
    /// Create a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of candidates to return.
    pub fn rows(mut self, rows: u32) -> Self {
        self.params.push(("rows".to_string(), rows.to_string()));
        self
    }

    /// Restrict the returned fields.
    pub fn select(mut self, fields: &str) -> Self {
        self.params.push(("select".to_string(), fields.to_string()));
        self
    }

    /// Search the journal (container) title.
    pub fn container_title(mut self, title: &str) -> Self {
        self.params
            .push(("query.container-title".to_string(), title.to_string()));
        self
    }

    /// Search author names.
    pub fn author(mut self, name: &str) -> Self {
        self.params.push(("query.author".to_string(), name.to_string()));
        self
    }

    /// Free-form bibliographic search.
    pub fn bibliographic(mut self, text: &str) -> Self {
        self.params
            .push(("query.bibliographic".to_string(), text.to_string()));
        self
    }

    /// Restrict to works published in `year`.
    pub fn published_in(mut self, year: u16) -> Self {
        self.filters.push(format!("from-pub-date:{}-01-01", year));
        self.filters.push(format!("until-pub-date:{}-12-31", year));
        self
    }

    /// Add a volume filter.
    pub fn volume(mut self, volume: &str) -> Self {
        self.filters.push(format!("volume:{}", volume));
        self
    }

    /// Add a page filter.
    pub fn page(mut self, page: &str) -> Self {
        self.filters.push(format!("page:{}", page));
        self
    }

    /// Whether any search term or filter has been added.
    pub fn has_terms(&self) -> bool {
        !self.filters.is_empty()
            || self
                .params
                .iter()
                .any(|(key, _)| key.starts_with("query."))
    }

    /// Build the final parameter list, with filters merged into `filter`.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = self.params.clone();
        if !self.filters.is_empty() {
            params.push(("filter".to_string(), self.filters.join(",")));
        }
        params
    }
}

impl std::fmt::Display for WorksQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .params()
            .into_iter()
            .filter(|(key, _)| key != "select")
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        f.write_str(&parts.join("&"))
    }
}

/// Field-by-field query: expanded journal title, first author, and year,
/// volume and page filters.
pub fn structured_query(reference: &Reference, rows: u32) -> WorksQuery {
    let mut query = WorksQuery::new().rows(rows).select(SELECT_FIELDS);

    if let Some(journal) = reference.journal.as_deref() {
        query = query.container_title(journals::expand(journal));
    }
    if let Some(author) = reference.authors.first() {
        query = query.author(author);
    }
    if let Some(year) = reference.year {
        query = query.published_in(year);
    }
    if let Some(volume) = reference.volume.as_deref() {
        query = query.volume(volume);
    }
    if let Some(page) = reference.page_or_article.as_deref() {
        query = query.page(page);
    }
    query
}

/// Fallback query: all known fields joined into one bibliographic string,
/// filtered by year only. `None` when the reference has nothing to search.
pub fn bibliographic_query(reference: &Reference, rows: u32) -> Option<WorksQuery> {
    let year = reference.year.map(|y| y.to_string());
    let authors = reference
        .authors
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let text = [
        Some(authors.as_str()),
        reference.journal.as_deref(),
        year.as_deref(),
        reference.volume.as_deref(),
        reference.page_or_article.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(", ");

    if text.is_empty() {
        return None;
    }

    let mut query = WorksQuery::new()
        .rows(rows)
        .select(SELECT_FIELDS)
        .bibliographic(&text);
    if let Some(year) = reference.year {
        query = query.published_in(year);
    }
    Some(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Reference {
        Reference {
            ordinal: 4,
            raw_text: String::new(),
            authors: vec!["Smith".into(), "Jones".into()],
            year: Some(2020),
            journal: Some("J. Vac. Sci. Technol. A".into()),
            volume: Some("38".into()),
            page_or_article: Some("020804".into()),
        }
    }

    #[test]
    fn test_structured_query_expands_journal() {
        let q = structured_query(&reference(), 7);
        let params = q.params();
        assert!(params.contains(&(
            "query.container-title".to_string(),
            "Journal of Vacuum Science & Technology A".to_string()
        )));
        assert!(params.contains(&("query.author".to_string(), "Smith".to_string())));
        assert!(params.contains(&("rows".to_string(), "7".to_string())));
        assert!(params.contains(&(
            "filter".to_string(),
            "from-pub-date:2020-01-01,until-pub-date:2020-12-31,volume:38,page:020804"
                .to_string()
        )));
    }

    #[test]
    fn test_structured_query_without_fields_has_no_terms() {
        let q = structured_query(&Reference::new(1, "[1]"), 7);
        assert!(!q.has_terms());
        assert!(!q.params().iter().any(|(k, _)| k == "filter"));
    }

    #[test]
    fn test_bibliographic_query() {
        let q = bibliographic_query(&reference(), 5).unwrap();
        assert_eq!(
            q.to_string(),
            "rows=5&query.bibliographic=Smith, Jones, J. Vac. Sci. Technol. A, 2020, 38, 020804&filter=from-pub-date:2020-01-01,until-pub-date:2020-12-31"
        );
    }

    #[test]
    fn test_bibliographic_query_empty_reference() {
        assert!(bibliographic_query(&Reference::new(1, "[1]"), 5).is_none());
    }

    #[test]
    fn test_display_skips_select() {
        let q = WorksQuery::new().select(SELECT_FIELDS).author("Hawking");
        assert_eq!(q.to_string(), "query.author=Hawking");
    }
}

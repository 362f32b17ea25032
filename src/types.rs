//! Public types shared by the parser, scorer, resolver and expansion engine.
//!
//! These types depend only on serde, so they can be serialized to JSON for
//! diagnostics or stored in the mapping file without extra glue.

use serde::{Deserialize, Serialize};

/// A parsed, title-less bibliographic reference.
///
/// Every field except `ordinal` and `raw_text` is best-effort: a field the
/// parser could not recover is `None` (or an empty author list) rather than
/// an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Bracketed reference number (`[28]` → 28).
    pub ordinal: u32,
    /// The full reference text as it appeared, marker included.
    pub raw_text: String,
    /// Author last names in citation order.
    pub authors: Vec<String>,
    /// Publication year.
    pub year: Option<u16>,
    /// Journal name or abbreviation, as written.
    pub journal: Option<String>,
    /// Volume number.
    pub volume: Option<String>,
    /// First page or article number.
    pub page_or_article: Option<String>,
}

impl Reference {
    /// A reference carrying only an ordinal and its raw text.
    pub fn new(ordinal: u32, raw_text: impl Into<String>) -> Self {
        Self {
            ordinal,
            raw_text: raw_text.into(),
            authors: Vec::new(),
            year: None,
            journal: None,
            volume: None,
            page_or_article: None,
        }
    }

    /// True when no field usable for a registry query was recovered.
    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
            && self.year.is_none()
            && self.journal.is_none()
            && self.volume.is_none()
            && self.page_or_article.is_none()
    }
}

/// An author of a registry work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Family (last) name.
    pub family_name: String,
    /// Given (first) name and initials.
    pub given_name: Option<String>,
}

/// A registry search result considered during scoring.
///
/// Candidates are transient: only the best one's metadata is ever persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// DOI, lower-cased.
    pub doi: String,
    pub title: Option<String>,
    /// Full journal name.
    pub container_title: Option<String>,
    /// Abbreviated journal name, when the registry has one.
    pub short_container_title: Option<String>,
    pub year: Option<u16>,
    pub volume: Option<String>,
    /// Page range, e.g. `"1234-1240"`.
    pub page: Option<String>,
    pub article_number: Option<String>,
    pub authors: Vec<Author>,
}

/// Outcome of scoring a reference against its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    LowConfidence,
    NoMatch,
}

impl Decision {
    /// String used in the mapping file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::LowConfidence => "low_confidence",
            Self::NoMatch => "no_match",
        }
    }

    /// Parse from string (case-insensitive, surrounding whitespace ignored).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "accepted" => Some(Self::Accepted),
            "low_confidence" => Some(Self::LowConfidence),
            "no_match" => Some(Self::NoMatch),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of the best-scoring candidate, kept for manual review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedWork {
    pub title: Option<String>,
    pub container_title: Option<String>,
    pub year: Option<u16>,
    pub volume: Option<String>,
    pub page: Option<String>,
    pub article_number: Option<String>,
}

impl From<&Candidate> for MatchedWork {
    fn from(candidate: &Candidate) -> Self {
        Self {
            title: candidate.title.clone(),
            container_title: candidate.container_title.clone(),
            year: candidate.year,
            volume: candidate.volume.clone(),
            page: candidate.page.clone(),
            article_number: candidate.article_number.clone(),
        }
    }
}

impl MatchedWork {
    /// True when no metadata field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One persisted resolution outcome, keyed by ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub ordinal: u32,
    pub raw_text: String,
    pub score: u32,
    pub decision: Decision,
    /// Set only when `decision` is [`Decision::Accepted`].
    pub identifier: Option<String>,
    /// Best candidate's metadata, if any candidate was returned.
    pub matched: Option<MatchedWork>,
}

impl ResolutionRecord {
    /// The accepted identifier, if any.
    pub fn accepted_identifier(&self) -> Option<&str> {
        match self.decision {
            Decision::Accepted => self
                .identifier
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty()),
            _ => None,
        }
    }
}

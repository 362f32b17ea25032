//! Candidate scoring.
//!
//! Scores are the sum of independent signals, each of which only fires when
//! the corresponding reference field is present:
//!
//! | Signal         | Points                 |
//! |----------------|------------------------|
//! | year           | 15                     |
//! | journal        | 20                     |
//! | volume         | 10                     |
//! | page           | 15                     |
//! | article number | 15                     |
//! | authors        | 5 each, at most 10     |

use crate::journals::{journals_match, normalize};
use crate::references::MAX_AUTHORS;
use crate::types::{Candidate, Decision, Reference};

pub const YEAR_POINTS: u32 = 15;
pub const JOURNAL_POINTS: u32 = 20;
pub const VOLUME_POINTS: u32 = 10;
pub const PAGE_POINTS: u32 = 15;
pub const ARTICLE_NUMBER_POINTS: u32 = 15;
pub const AUTHOR_POINTS: u32 = 5;
pub const AUTHOR_POINTS_CAP: u32 = 10;

/// Default minimum score for an accepted match.
pub const DEFAULT_MIN_SCORE: u32 = 35;

/// Score one candidate against a reference.
pub fn score_candidate(reference: &Reference, candidate: &Candidate) -> u32 {
    let mut score = 0;

    if reference.year.is_some() && candidate.year == reference.year {
        score += YEAR_POINTS;
    }

    if let Some(journal) = reference.journal.as_deref() {
        let titles: Vec<&str> = [
            candidate.container_title.as_deref(),
            candidate.short_container_title.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if journals_match(journal, &titles) {
            score += JOURNAL_POINTS;
        }
    }

    if let (Some(want), Some(have)) = (reference.volume.as_deref(), candidate.volume.as_deref()) {
        if !want.trim().is_empty() && want.trim() == have.trim() {
            score += VOLUME_POINTS;
        }
    }

    if let Some(token) = reference.page_or_article.as_deref() {
        if candidate
            .page
            .as_deref()
            .is_some_and(|pages| page_contains(pages, token))
        {
            score += PAGE_POINTS;
        }

        let want_digits = only_digits(token);
        if !want_digits.is_empty()
            && candidate
                .article_number
                .as_deref()
                .is_some_and(|n| only_digits(n) == want_digits)
        {
            score += ARTICLE_NUMBER_POINTS;
        }
    }

    score + author_points(reference, candidate)
}

/// Whether `token` appears as a whole token of a page range such as
/// `"1234-1240"` or `"020804-1"`.
fn page_contains(pages: &str, token: &str) -> bool {
    let token = token.trim();
    !token.is_empty()
        && pages
            .split(|c: char| !c.is_alphanumeric())
            .any(|part| part == token)
}

fn only_digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn author_points(reference: &Reference, candidate: &Candidate) -> u32 {
    let families: Vec<String> = candidate
        .authors
        .iter()
        .map(|a| normalize(&a.family_name))
        .filter(|f| !f.is_empty())
        .collect();

    let matches = reference
        .authors
        .iter()
        .take(MAX_AUTHORS)
        .map(|name| normalize(name))
        .filter(|name| !name.is_empty() && families.contains(name))
        .count() as u32;

    (matches * AUTHOR_POINTS).min(AUTHOR_POINTS_CAP)
}

/// Map a best score to a decision.
///
/// The threshold is inclusive: `score == min_score` is accepted.
pub fn decide(score: u32, min_score: u32) -> Decision {
    if score >= min_score {
        Decision::Accepted
    } else if score > 0 {
        Decision::LowConfidence
    } else {
        Decision::NoMatch
    }
}

/// The best candidate for one registry query.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'c> {
    /// Highest-scoring candidate, `None` when the registry returned nothing.
    pub best: Option<&'c Candidate>,
    pub score: u32,
    pub decision: Decision,
}

/// Pick the highest-scoring candidate; ties go to the earliest one in
/// registry order.
pub fn select_best<'c>(
    reference: &Reference,
    candidates: &'c [Candidate],
    min_score: u32,
) -> Selection<'c> {
    let mut best: Option<(&Candidate, u32)> = None;
    for candidate in candidates {
        let score = score_candidate(reference, candidate);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, score)) => Selection {
            best: Some(candidate),
            score,
            decision: decide(score, min_score),
        },
        None => Selection {
            best: None,
            score: 0,
            decision: Decision::NoMatch,
        },
    }
}

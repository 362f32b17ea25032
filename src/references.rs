//! Reference-list parsing.
//!
//! Turns a plain-text reference list where every entry starts with a
//! bracketed ordinal (`[12] A. Smith, B. Jones, J. Appl. Phys. 2019, 125,
//! 123456.`) and may wrap over several lines into structured [`Reference`]s.
//!
//! Field extraction is best-effort and independent: a field that cannot be
//! recovered is left as `None` and never prevents the others from being
//! extracted.

use crate::types::Reference;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::iter::Peekable;
use std::str::Lines;

/// Maximum number of author last names kept per reference.
pub const MAX_AUTHORS: usize = 3;

static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\[(\d+)\]\s*").unwrap());
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());
static VOLUME_BETWEEN_COMMAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([0-9]+)\s*,").unwrap());
static VOLUME_AFTER_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;]\s*([0-9]+)\b").unwrap());
static PAGE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)[-\u{2013}\u{2014}]\d+$").unwrap());
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{3,}").unwrap());
static NAME_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}[\p{L}\-']+").unwrap());

/// Lazily yields one [`Reference`] per bracketed block, in source order.
///
/// The iterator is `Clone`, so a sequence can be restarted from any point
/// without re-reading the text.
#[derive(Debug, Clone)]
pub struct ReferenceBlocks<'a> {
    lines: Peekable<Lines<'a>>,
    position: u32,
}

impl<'a> ReferenceBlocks<'a> {
    /// Start iterating over the blocks of `text`.
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().peekable(),
            position: 0,
        }
    }
}

impl Iterator for ReferenceBlocks<'_> {
    type Item = Reference;

    fn next(&mut self) -> Option<Reference> {
        // Skip blank lines between blocks.
        while self.lines.peek().is_some_and(|l| l.trim().is_empty()) {
            self.lines.next();
        }
        let first = self.lines.next()?;

        let mut block = first.trim().to_string();
        while let Some(next) = self.lines.peek() {
            if MARKER.is_match(next) {
                break;
            }
            let next = next.trim();
            if !next.is_empty() {
                block.push(' ');
                block.push_str(next);
            }
            self.lines.next();
        }

        self.position += 1;
        Some(parse_block(&block, self.position))
    }
}

/// Parse a whole reference list, ordered by ordinal.
///
/// A block without a `[n]` marker (such as a "References" heading) is dropped
/// when a numbered block has the ordinal its position would give it.
/// Remaining duplicate or out-of-order ordinals are logged and kept as they
/// are; the sort is stable, so duplicates stay in source order.
pub fn parse_references(text: &str) -> Vec<Reference> {
    let mut refs: Vec<Reference> = ReferenceBlocks::new(text).collect();

    let numbered: HashSet<u32> = refs
        .iter()
        .filter(|r| is_numbered(&r.raw_text))
        .map(|r| r.ordinal)
        .collect();
    refs.retain(|r| {
        let shadowed = !is_numbered(&r.raw_text) && numbered.contains(&r.ordinal);
        if shadowed {
            tracing::warn!(
                ordinal = r.ordinal,
                text = %r.raw_text,
                "dropping unnumbered text in favour of the numbered reference"
            );
        }
        !shadowed
    });

    for pair in refs.windows(2) {
        if pair[1].ordinal == pair[0].ordinal {
            tracing::warn!(ordinal = pair[1].ordinal, "duplicate reference ordinal");
        } else if pair[1].ordinal < pair[0].ordinal {
            tracing::warn!(
                ordinal = pair[1].ordinal,
                previous = pair[0].ordinal,
                "reference ordinals out of order"
            );
        }
    }

    refs.sort_by_key(|r| r.ordinal);
    refs
}

/// Parse a single joined block. `position` (1-based) is the fallback ordinal
/// when the block carries no `[n]` marker.
pub fn parse_block(block: &str, position: u32) -> Reference {
    let (ordinal, body) = split_marker(block);
    let ordinal = ordinal.unwrap_or(position);

    let year_token = extract_year(body);
    let journal = year_token.and_then(|y| extract_journal(body, y));
    let volume = year_token.and_then(|y| extract_volume(body, y));

    Reference {
        ordinal,
        raw_text: block.trim().to_string(),
        authors: extract_authors(body, journal.as_deref(), year_token),
        year: year_token.and_then(|y| y.parse().ok()),
        journal,
        volume,
        page_or_article: extract_page_or_article(body),
    }
}

/// Split a leading `[n]` marker from the block body.
fn split_marker(block: &str) -> (Option<u32>, &str) {
    match MARKER.captures(block) {
        Some(caps) => {
            let body = &block[caps.get(0).map_or(0, |m| m.end())..];
            let ordinal = caps[1].parse().ok().filter(|n| *n > 0);
            (ordinal, body.trim())
        }
        None => (None, block.trim()),
    }
}

/// True when the block starts with a usable `[n]` marker.
fn is_numbered(block: &str) -> bool {
    split_marker(block).0.is_some()
}

/// First plausible publication year (1900-2099).
fn extract_year(body: &str) -> Option<&str> {
    YEAR.find(body).map(|m| m.as_str())
}

/// Journal: the comma-delimited segment immediately preceding the year.
fn extract_journal(body: &str, year: &str) -> Option<String> {
    let pos = body.find(year)?;
    let left = body[..pos].trim_end();
    let comma = left.rfind(',')?;
    let journal = left[comma + 1..].trim().trim_end_matches('.').trim();
    if journal.is_empty() || journal.chars().all(|c| !c.is_alphabetic()) {
        return None;
    }
    Some(journal.to_string())
}

/// Volume: the number right after the year separator (`..., 2020, 38, ...`).
fn extract_volume(body: &str, year: &str) -> Option<String> {
    let pos = body.find(year)?;
    let tail = &body[pos + year.len()..];
    VOLUME_BETWEEN_COMMAS
        .captures(tail)
        .or_else(|| VOLUME_AFTER_SEPARATOR.captures(tail))
        .map(|caps| caps[1].to_string())
}

/// Page or article number: the trailing comma-delimited token, provided it
/// holds at least three consecutive digits. For page ranges only the first
/// page is kept.
fn extract_page_or_article(body: &str) -> Option<String> {
    let parts: Vec<&str> = body
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 2 {
        return None;
    }

    let last = parts[parts.len() - 1].trim_end_matches('.');
    let compact: String = last
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let token = match PAGE_RANGE.captures(&compact) {
        Some(caps) => caps[1].to_string(),
        None => compact.replace('-', ""),
    };

    DIGIT_RUN.is_match(&token).then_some(token)
}

/// Up to [`MAX_AUTHORS`] last names from the segment before the journal
/// (or before the year when no journal was found).
///
/// Each comma-delimited author chunk contributes its last word of two or more
/// letters, so bare initials (`J.`) are never taken as names.
fn extract_authors(body: &str, journal: Option<&str>, year: Option<&str>) -> Vec<String> {
    let stop = journal
        .and_then(|j| body.find(j))
        .or_else(|| year.and_then(|y| body.find(y)))
        .unwrap_or(body.len());

    body[..stop]
        .split(',')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| NAME_WORD.find_iter(chunk).last())
        .map(|m| m.as_str().to_string())
        .take(MAX_AUTHORS)
        .collect()
}

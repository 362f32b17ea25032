//! Reference-list cell grammar.
//!
//! A table cell such as `"[28,224-226]"`, `"[ 184 ]"`, `"207; 233"` or
//! `"208"` names one or more reference ordinals. The cell is tokenized, split
//! into comma/semicolon separated entries, and each entry is expanded:
//!
//! ```text
//! cell   := text* ( "[" list "]" text* )+  |  list
//! list   := entry ( sep entry )*
//! entry  := number+  |  number dash number
//! sep    := "," | ";"
//! dash   := "-" | "–" | "—" | "‒" | "−"
//! ```
//!
//! When a cell contains bracket groups, only the text inside the brackets is
//! read. Entries that do not fit the grammar are reported and skipped; the
//! remaining entries of the cell are still used.

use std::collections::BTreeSet;

/// Ranges wider than this are treated as malformed rather than expanded.
pub const MAX_RANGE_SPAN: u32 = 10_000;

/// A lexical token of a reference-list cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(u32),
    Dash,
    Separator,
    Open,
    Close,
    /// Anything else: words, stray punctuation, numbers too large to be
    /// ordinals.
    Other(String),
}

/// Split a cell into tokens. Whitespace only separates tokens.
pub fn tokenize(cell: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = cell.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '[' => tokens.push(Token::Open),
            ']' => tokens.push(Token::Close),
            ',' | ';' => tokens.push(Token::Separator),
            '-' | '\u{2013}' | '\u{2014}' | '\u{2012}' | '\u{2212}' => tokens.push(Token::Dash),
            c if c.is_ascii_digit() => {
                let mut digits = c.to_string();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                }
                match digits.parse() {
                    Ok(n) => tokens.push(Token::Number(n)),
                    Err(_) => tokens.push(Token::Other(digits)),
                }
            }
            _ => {
                let mut word = c.to_string();
                while let Some(w) = chars.peek().copied().filter(|w| !is_boundary(*w)) {
                    word.push(w);
                    chars.next();
                }
                tokens.push(Token::Other(word));
            }
        }
    }
    tokens
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace()
        || c.is_ascii_digit()
        || matches!(
            c,
            '[' | ']' | ',' | ';' | '-' | '\u{2013}' | '\u{2014}' | '\u{2012}' | '\u{2212}'
        )
}

/// One valid list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Single(u32),
    /// Inclusive range, always `start <= end`.
    Range(u32, u32),
}

impl Entry {
    fn ordinals(self) -> impl Iterator<Item = u32> {
        match self {
            Entry::Single(n) => n..=n,
            Entry::Range(a, b) => a..=b,
        }
    }
}

/// Ordinals parsed from one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceList {
    /// Distinct ordinals in ascending order.
    pub ordinals: Vec<u32>,
    /// Entries that could not be parsed, rendered back to text.
    pub rejected: Vec<String>,
}

/// Parse a reference-list cell into its ordinal set.
pub fn parse_reference_list(cell: &str) -> ReferenceList {
    let tokens = tokenize(cell);
    let mut entries = Vec::new();
    let mut rejected = Vec::new();

    for group in list_groups(&tokens) {
        for raw in group.split(|t| *t == Token::Separator) {
            if raw.is_empty() {
                continue;
            }
            match parse_entry(raw) {
                Some(entry) => entries.extend(entry),
                None => rejected.push(render(raw)),
            }
        }
    }

    let ordinals: BTreeSet<u32> = entries.into_iter().flat_map(Entry::ordinals).collect();
    ReferenceList {
        ordinals: ordinals.into_iter().collect(),
        rejected,
    }
}

/// The token runs to read: the contents of each bracket group if there are
/// any, otherwise the whole cell. An unclosed group runs to the end.
fn list_groups(tokens: &[Token]) -> Vec<&[Token]> {
    if !tokens.contains(&Token::Open) {
        return vec![tokens];
    }

    let mut groups = Vec::new();
    let mut start = None;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Open => start = Some(i + 1),
            Token::Close => {
                if let Some(s) = start.take() {
                    groups.push(&tokens[s..i]);
                }
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        groups.push(&tokens[s..]);
    }
    groups
}

/// Expand one separator-delimited entry. `None` means malformed.
fn parse_entry(tokens: &[Token]) -> Option<Vec<Entry>> {
    match tokens {
        [Token::Number(a), Token::Dash, Token::Number(b)] => {
            let (lo, hi) = if a <= b { (*a, *b) } else { (*b, *a) };
            (lo > 0 && hi - lo <= MAX_RANGE_SPAN).then(|| vec![Entry::Range(lo, hi)])
        }
        _ => tokens
            .iter()
            .map(|t| match t {
                Token::Number(n) if *n > 0 => Some(Entry::Single(*n)),
                _ => None,
            })
            .collect(),
    }
}

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| match t {
            Token::Number(n) => n.to_string(),
            Token::Dash => "-".to_string(),
            Token::Separator => ",".to_string(),
            Token::Open => "[".to_string(),
            Token::Close => "]".to_string(),
            Token::Other(s) => s.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordinals(cell: &str) -> Vec<u32> {
        parse_reference_list(cell).ordinals
    }

    #[test]
    fn test_bracketed_list_with_range() {
        assert_eq!(ordinals("[28,224-226]"), vec![28, 224, 225, 226]);
    }

    #[test]
    fn test_padded_single() {
        assert_eq!(ordinals("[ 184 ]"), vec![184]);
    }

    #[test]
    fn test_bare_number() {
        assert_eq!(ordinals("208"), vec![208]);
        assert_eq!(ordinals("207,233"), vec![207, 233]);
    }

    #[test]
    fn test_equivalent_spellings_normalize() {
        let expected = vec![28, 224, 225, 226];
        for cell in [
            "[28,224-226]",
            "[ 28 , 224 - 226 ]",
            "28, 224\u{2013}226",
            "[28; 224\u{2014}226]",
            "[28] [224-226]",
            "[226-224, 28]",
        ] {
            assert_eq!(ordinals(cell), expected, "cell {:?}", cell);
        }
    }

    #[test]
    fn test_duplicates_collapsed_and_sorted() {
        assert_eq!(ordinals("[12, 3, 12, 2-4]"), vec![2, 3, 4, 12]);
    }

    #[test]
    fn test_text_outside_brackets_ignored() {
        assert_eq!(ordinals("see [5], also ref. 99"), vec![5]);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let list = parse_reference_list("[12, 3-, abc, -7, 1-2-3, 40]");
        assert_eq!(list.ordinals, vec![12, 40]);
        assert_eq!(list.rejected.len(), 4);
        assert!(list.rejected.contains(&"3 -".to_string()));
        assert!(list.rejected.contains(&"abc".to_string()));
    }

    #[test]
    fn test_all_malformed_yields_empty() {
        let list = parse_reference_list("[n/a]");
        assert!(list.ordinals.is_empty());
        assert_eq!(list.rejected, vec!["n/a".to_string()]);
    }

    #[test]
    fn test_empty_cell() {
        assert_eq!(parse_reference_list(""), ReferenceList::default());
        assert_eq!(parse_reference_list("  [ ] "), ReferenceList::default());
    }

    #[test]
    fn test_zero_and_huge_ranges_rejected() {
        assert!(ordinals("0").is_empty());
        assert!(ordinals("0-3").is_empty());
        assert!(ordinals("1-4000000000").is_empty());
        assert!(ordinals("99999999999").is_empty());
    }

    #[test]
    fn test_whitespace_separated_numbers() {
        assert_eq!(ordinals("[28 30]"), vec![28, 30]);
    }

    #[test]
    fn test_unclosed_bracket() {
        assert_eq!(ordinals("[4, 5"), vec![4, 5]);
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("[2a–3]"),
            vec![
                Token::Open,
                Token::Number(2),
                Token::Other("a".to_string()),
                Token::Dash,
                Token::Number(3),
                Token::Close,
            ]
        );
    }
}

//! Journal-name normalization and abbreviation expansion.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s&]").unwrap());
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Known abbreviations, keyed by their [`normalize`]d form.
///
/// Extend as new source lists turn up unmatched journals.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("sci rep", "Scientific Reports"),
    ("chem commun", "Chemical Communications"),
    ("dalton trans", "Dalton Transactions"),
    ("phys chem chem phys", "Physical Chemistry Chemical Physics"),
    ("appl phys lett", "Applied Physics Letters"),
    ("appl surf sci", "Applied Surface Science"),
    ("acs nano", "ACS Nano"),
    ("acs mater au", "ACS Materials Au"),
    ("acs appl electron mater", "ACS Applied Electronic Materials"),
    ("chem rev", "Chemical Reviews"),
    (
        "j photochem photobiol c photochem rev",
        "Journal of Photochemistry and Photobiology C: Photochemistry Reviews",
    ),
    ("j mater chem c", "Journal of Materials Chemistry C"),
    ("j nanophotonics", "Journal of Nanophotonics"),
    ("j vac sci technol a", "Journal of Vacuum Science & Technology A"),
    ("j vac sci technol b", "Journal of Vacuum Science & Technology B"),
    (
        "j vac sci technol b microelectron nanometer struct process meas phenom",
        "Journal of Vacuum Science & Technology B",
    ),
    ("j chem phys", "The Journal of Chemical Physics"),
    ("j appl phys", "Journal of Applied Physics"),
    ("j phys chem c", "The Journal of Physical Chemistry C"),
    ("j phys chem lett", "The Journal of Physical Chemistry Letters"),
    ("laser photonics rev", "Laser & Photonics Reviews"),
    ("rsc adv", "RSC Advances"),
    ("nat methods", "Nature Methods"),
    ("j fluoresc", "Journal of Fluorescence"),
    ("j clin microbiol", "Journal of Clinical Microbiology"),
    ("j clinmicrobiol", "Journal of Clinical Microbiology"),
    (
        "mater sci semicond process",
        "Materials Science in Semiconductor Processing",
    ),
    ("mater sci eng r rep", "Materials Science and Engineering: R: Reports"),
    ("recl trav chim pays bas", "Recueil des Travaux Chimiques des Pays-Bas"),
];

static ABBREVIATION_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ABBREVIATIONS.iter().copied().collect());

/// Lower-case, trim and collapse whitespace.
pub fn normalize_whitespace(s: &str) -> String {
    SPACES.replace_all(s.trim(), " ").to_lowercase()
}

/// Lower-case and replace punctuation (everything but word characters,
/// whitespace and `&`) with spaces, collapsing runs of whitespace.
///
/// `"J. Vac. Sci. Technol. A"` → `"j vac sci technol a"`.
pub fn normalize(s: &str) -> String {
    let lowered = normalize_whitespace(s);
    let stripped = NON_WORD.replace_all(&lowered, " ");
    SPACES.replace_all(stripped.trim(), " ").into_owned()
}

/// Expand a known abbreviation to the full journal title.
///
/// Unknown names are returned unchanged.
pub fn expand(journal: &str) -> &str {
    ABBREVIATION_MAP
        .get(normalize(journal).as_str())
        .copied()
        .unwrap_or(journal)
}

/// Whether a reference's journal matches one of a candidate's titles.
///
/// Both the expanded and the as-written forms of the reference journal are
/// compared against every non-empty candidate title; a match is either string
/// containing the other after [`normalize`].
pub fn journals_match(reference_journal: &str, candidate_titles: &[&str]) -> bool {
    let mut wanted = vec![normalize(expand(reference_journal))];
    let as_written = normalize(reference_journal);
    if !wanted.contains(&as_written) {
        wanted.push(as_written);
    }

    candidate_titles
        .iter()
        .map(|title| normalize(title))
        .filter(|title| !title.is_empty())
        .any(|title| {
            wanted
                .iter()
                .filter(|w| !w.is_empty())
                .any(|w| title.contains(w.as_str()) || w.contains(title.as_str()))
        })
}

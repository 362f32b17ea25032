//! Crossref `/works` response parsing.

use crate::error::ResolveError;
use crate::types::{Author, Candidate};
use serde::Deserialize;

/// Crossref works response wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct WorksResponse {
    pub message: WorksMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorksMessage {
    #[serde(default)]
    pub items: Vec<WorkItem>,
}

/// Custom deserializer for fields Crossref sends as either string or integer
/// (volume, page, article number).
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct OptionVisitor;

    impl<'de> Visitor<'de> for OptionVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, integer, or null")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(ValueVisitor).map(Some)
        }
    }

    struct ValueVisitor;

    impl<'de> Visitor<'de> for ValueVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_option(OptionVisitor)
}

/// A single work from a Crossref response.
#[derive(Debug, Deserialize)]
pub(crate) struct WorkItem {
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(rename = "container-title", default)]
    pub container_title: Vec<String>,
    #[serde(rename = "short-container-title", default)]
    pub short_container_title: Vec<String>,
    pub issued: Option<DateParts>,
    #[serde(deserialize_with = "deserialize_string_or_number", default)]
    pub volume: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_number", default)]
    pub page: Option<String>,
    #[serde(
        rename = "article-number",
        deserialize_with = "deserialize_string_or_number",
        default
    )]
    pub article_number: Option<String>,
    #[serde(default)]
    pub author: Vec<WorkAuthor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DateParts {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i64>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkAuthor {
    pub family: Option<String>,
    pub given: Option<String>,
    /// Organisational authors carry only a name.
    pub name: Option<String>,
}

/// Parse a Crossref works JSON response into candidates, keeping registry
/// order. Items without a DOI are dropped.
pub fn parse_works_response(json: &str) -> crate::error::Result<Vec<Candidate>> {
    let response: WorksResponse = serde_json::from_str(json)
        .map_err(|e| ResolveError::Parse(format!("Invalid Crossref JSON: {}", e)))?;

    Ok(response
        .message
        .items
        .into_iter()
        .filter_map(item_to_candidate)
        .collect())
}

/// Convert a Crossref work to a [`Candidate`].
fn item_to_candidate(item: WorkItem) -> Option<Candidate> {
    let doi = item.doi?.trim().to_lowercase();
    if doi.is_empty() {
        return None;
    }

    let authors = item
        .author
        .into_iter()
        .filter_map(|a| {
            let family = a.family.or(a.name)?.trim().to_string();
            (!family.is_empty()).then(|| Author {
                family_name: family,
                given_name: a.given.map(|g| g.trim().to_string()),
            })
        })
        .collect();

    Some(Candidate {
        doi,
        title: first_nonempty(item.title),
        container_title: first_nonempty(item.container_title),
        short_container_title: first_nonempty(item.short_container_title),
        year: item.issued.as_ref().and_then(issued_year),
        volume: trimmed(item.volume),
        page: trimmed(item.page),
        article_number: trimmed(item.article_number),
        authors,
    })
}

/// Year from `issued.date-parts[0][0]`.
fn issued_year(issued: &DateParts) -> Option<u16> {
    issued
        .date_parts
        .first()
        .and_then(|parts| parts.first().copied().flatten())
        .and_then(|y| u16::try_from(y).ok())
}

fn first_nonempty(values: Vec<String>) -> Option<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "status": "ok",
        "message-type": "work-list",
        "message": {
            "items": [{
                "DOI": "10.1116/6.0000001",
                "title": ["Review Article: Atomic layer deposition"],
                "container-title": ["Journal of Vacuum Science & Technology A"],
                "short-container-title": ["J. Vac. Sci. Technol. A"],
                "issued": {"date-parts": [[2020, 3, 1]]},
                "volume": "38",
                "page": "020804",
                "author": [
                    {"given": "Jane", "family": "Smith", "sequence": "first"},
                    {"name": "ALD Consortium", "sequence": "additional"}
                ]
            }]
        }
    }"#;

    #[test]
    fn test_parse_works_response() {
        let candidates = parse_works_response(SAMPLE_RESPONSE).unwrap();
        assert_eq!(candidates.len(), 1);

        let c = &candidates[0];
        assert_eq!(c.doi, "10.1116/6.0000001");
        assert_eq!(c.year, Some(2020));
        assert_eq!(c.volume.as_deref(), Some("38"));
        assert_eq!(c.page.as_deref(), Some("020804"));
        assert_eq!(c.short_container_title.as_deref(), Some("J. Vac. Sci. Technol. A"));
        assert_eq!(c.authors.len(), 2);
        assert_eq!(c.authors[0].family_name, "Smith");
        assert_eq!(c.authors[0].given_name.as_deref(), Some("Jane"));
        assert_eq!(c.authors[1].family_name, "ALD Consortium");
    }

    #[test]
    fn test_numeric_volume_and_null_year() {
        let json = r#"{"message": {"items": [{
            "DOI": " 10.1000/ABC ",
            "volume": 12,
            "article-number": 4501,
            "issued": {"date-parts": [[null]]}
        }]}}"#;

        let candidates = parse_works_response(json).unwrap();
        assert_eq!(candidates[0].doi, "10.1000/abc");
        assert_eq!(candidates[0].volume.as_deref(), Some("12"));
        assert_eq!(candidates[0].article_number.as_deref(), Some("4501"));
        assert_eq!(candidates[0].year, None);
    }

    #[test]
    fn test_items_without_doi_dropped_order_kept() {
        let json = r#"{"message": {"items": [
            {"DOI": "10.1/a"},
            {"title": ["no doi"]},
            {"DOI": ""},
            {"DOI": "10.1/b"}
        ]}}"#;

        let dois: Vec<String> = parse_works_response(json)
            .unwrap()
            .into_iter()
            .map(|c| c.doi)
            .collect();
        assert_eq!(dois, vec!["10.1/a", "10.1/b"]);
    }

    #[test]
    fn test_missing_items_is_empty() {
        let candidates = parse_works_response(r#"{"message": {}}"#).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_works_response("<html>busy</html>").unwrap_err();
        assert!(matches!(err, ResolveError::Parse(_)));
    }
}

//! Wire models for the terminology server `concepts` endpoint

use serde::{Deserialize, Serialize};

/// A term attached to a concept (`fsn` or `pt`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// One concept returned for an ECL query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EclConcept {
    pub concept_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsn: Option<Term>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pt: Option<Term>,
}

impl EclConcept {
    /// Fully specified name, falling back to the preferred term and finally the id.
    pub fn display(&self) -> &str {
        self.fsn
            .as_ref()
            .or(self.pt.as_ref())
            .map(|t| t.term.as_str())
            .unwrap_or(self.concept_id.as_str())
    }
}

/// Paged response shape (`items` + `searchAfter` cursor)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptPage {
    pub items: Vec<EclConcept>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub search_after: Option<String>,
}

/// Servers answer either with a page object or a bare list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ConceptsResponse {
    Page(ConceptPage),
    List(Vec<EclConcept>),
}

impl ConceptsResponse {
    pub(crate) fn into_page(self) -> ConceptPage {
        match self {
            ConceptsResponse::Page(page) => page,
            ConceptsResponse::List(items) => ConceptPage {
                total: Some(items.len() as u64),
                items,
                search_after: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paged_response() {
        let body = r#"{
            "items": [
                {"conceptId": "44054006", "active": true,
                 "fsn": {"term": "Diabetes mellitus type 2 (disorder)", "lang": "en"},
                 "pt": {"term": "Diabetes mellitus type 2", "lang": "en"}}
            ],
            "total": 1,
            "limit": 50,
            "offset": 0,
            "searchAfter": "WzQ0MDU0MDA2XQ=="
        }"#;

        let page = serde_json::from_str::<ConceptsResponse>(body)
            .unwrap()
            .into_page();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, Some(1));
        assert_eq!(page.search_after.as_deref(), Some("WzQ0MDU0MDA2XQ=="));
        assert_eq!(page.items[0].display(), "Diabetes mellitus type 2 (disorder)");
    }

    #[test]
    fn parses_bare_list() {
        let body = r#"[{"conceptId": "46635009", "fsn": {"term": "Diabetes mellitus type 1 (disorder)"}}]"#;

        let page = serde_json::from_str::<ConceptsResponse>(body)
            .unwrap()
            .into_page();
        assert_eq!(page.items[0].concept_id, "46635009");
        assert!(page.search_after.is_none());
    }

    #[test]
    fn display_falls_back_to_preferred_term_then_id() {
        let concept = EclConcept {
            concept_id: "73211009".to_string(),
            active: None,
            fsn: None,
            pt: Some(Term {
                term: "Diabetes mellitus".to_string(),
                lang: None,
            }),
        };
        assert_eq!(concept.display(), "Diabetes mellitus");

        let bare = EclConcept {
            pt: None,
            ..concept
        };
        assert_eq!(bare.display(), "73211009");
    }
}

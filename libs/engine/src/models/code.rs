use serde_json::{json, Value as JsonValue};

/// One coded concept: the unit of value set membership.
///
/// Equality, hashing and ordering are structural over
/// `(system, version, code, display)`; no case or whitespace normalization is
/// applied. Ordering follows the same field order, which is the order used
/// whenever codes are emitted as a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code {
    system: String,
    version: String,
    code: String,
    display: String,
}

impl Code {
    pub fn new(
        system: impl Into<String>,
        version: impl Into<String>,
        code: impl Into<String>,
        display: impl Into<String>,
    ) -> Self {
        Self {
            system: system.into(),
            version: version.into(),
            code: code.into(),
            display: display.into(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    /// JSON shape used in `expansion.contains` and extensional `concept` lists.
    pub fn serialize(&self, with_system_and_version: bool) -> JsonValue {
        if with_system_and_version {
            json!({
                "system": self.system,
                "version": self.version,
                "code": self.code,
                "display": self.display,
            })
        } else {
            json!({
                "code": self.code,
                "display": self.display,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ICD10CM: &str = "http://hl7.org/fhir/sid/icd-10-cm";

    #[test]
    fn equality_is_structural_across_construction_paths() {
        let literal = Code::new(ICD10CM, "2024", "E11", "Type 2 diabetes mellitus");
        let from_row = Code::new(
            String::from(ICD10CM),
            String::from("2024"),
            "E11".to_string(),
            "Type 2 diabetes mellitus".to_string(),
        );

        assert_eq!(literal, from_row);

        let mut set = HashSet::new();
        set.insert(literal);
        assert!(!set.insert(from_row));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn every_field_participates_in_identity() {
        let base = Code::new(ICD10CM, "2024", "E11", "Type 2 diabetes mellitus");

        assert_ne!(base, Code::new(ICD10CM, "2023", "E11", "Type 2 diabetes mellitus"));
        assert_ne!(base, Code::new(ICD10CM, "2024", "e11", "Type 2 diabetes mellitus"));
        assert_ne!(base, Code::new(ICD10CM, "2024", "E11", "Type 2 diabetes mellitus "));
        assert_ne!(base, Code::new("http://snomed.info/sct", "2024", "E11", "Type 2 diabetes mellitus"));
    }

    #[test]
    fn serialize_with_and_without_system() {
        let code = Code::new(ICD10CM, "2024", "E11.9", "Type 2 diabetes mellitus without complications");

        assert_eq!(
            code.serialize(true),
            json!({
                "system": ICD10CM,
                "version": "2024",
                "code": "E11.9",
                "display": "Type 2 diabetes mellitus without complications"
            })
        );
        assert_eq!(
            code.serialize(false),
            json!({
                "code": "E11.9",
                "display": "Type 2 diabetes mellitus without complications"
            })
        );
    }

    #[test]
    fn ordering_is_system_version_code_display() {
        let mut codes = vec![
            Code::new("b", "1", "A", "x"),
            Code::new("a", "2", "A", "x"),
            Code::new("a", "1", "B", "x"),
            Code::new("a", "1", "A", "y"),
            Code::new("a", "1", "A", "x"),
        ];
        codes.sort();

        let keys: Vec<_> = codes
            .iter()
            .map(|c| format!("{}|{}|{}|{}", c.system(), c.version(), c.code(), c.display()))
            .collect();
        assert_eq!(keys, vec!["a|1|A|x", "a|1|A|y", "a|1|B|x", "a|2|A|x", "b|1|A|x"]);
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored rule row as authored by a curator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub uuid: Uuid,
    pub position: i32,
    pub description: Option<String>,
    pub property: String,
    pub operator: String,
    pub value: String,
    /// `true` for additive rules, `false` for subtractive ones
    pub include: bool,
    pub terminology_version_uuid: Uuid,
}

/// Explicit membership row of an extensional value set version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionalMemberRecord {
    pub code: String,
    pub display: String,
    pub terminology_version_uuid: Uuid,
}

/// Code/display pair returned by terminology lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConceptRow {
    pub code: String,
    pub display: String,
}

impl ConceptRow {
    pub fn new(code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display: display.into(),
        }
    }
}

//! Rule dispatch table
//!
//! The same operator string means different queries in different
//! terminologies. Every supported `(terminology, property, operator)`
//! combination is listed in [`RuleOperation::resolve`]; anything it does not
//! match is unsupported.

use crate::models::{RelationshipLabel, TerminologyKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOperation {
    /// Transitive closure over a hierarchical code system's parent/child edges
    Descendants { include_self: bool },
    /// One hop down a hierarchical code system
    Children,
    /// Explicit list of codes
    CodeIn,
    /// Concepts whose named property takes one of the listed values
    PropertyMatch { property: String },
    /// One is-a hop in SNOMED CT
    SnomedChildren,
    /// Is-a closure in SNOMED CT
    SnomedDescendants { include_self: bool },
    /// SNOMED CT reference set membership
    RefsetMembers,
    /// Expression constraint delegated to the terminology server
    Ecl,
    /// RxNorm atoms by source vocabulary (SAB)
    RxNormSource,
    /// RxNorm atoms by term type (TTY)
    RxNormTermType,
    /// RxNorm concepts related to an anchor through a REL or RELA label
    RxNormRelationship(RelationshipLabel),
}

fn is_membership(operator: &str) -> bool {
    matches!(operator, "in" | "=")
}

impl RuleOperation {
    pub fn resolve(kind: TerminologyKind, property: &str, operator: &str) -> Option<Self> {
        use TerminologyKind::*;

        let property = property.trim();
        let operator = operator.trim();

        match kind {
            Icd10Cm | Icd10Pcs => match (property, operator) {
                ("code" | "concept", "descendent-of") => {
                    Some(RuleOperation::Descendants { include_self: false })
                }
                ("code" | "concept", "self-and-descendents") => {
                    Some(RuleOperation::Descendants { include_self: true })
                }
                ("code" | "concept", "is-a" | "direct-child") => Some(RuleOperation::Children),
                ("code", op) if is_membership(op) => Some(RuleOperation::CodeIn),
                _ => None,
            },
            Other => match (property, operator) {
                ("code", op) if is_membership(op) => Some(RuleOperation::CodeIn),
                (property, op) if is_membership(op) && !property.is_empty() => {
                    Some(RuleOperation::PropertyMatch {
                        property: property.to_string(),
                    })
                }
                _ => None,
            },
            SnomedCt => match (property, operator) {
                ("concept", "is-a" | "direct-child") => Some(RuleOperation::SnomedChildren),
                ("concept", "descendent-of") => {
                    Some(RuleOperation::SnomedDescendants { include_self: false })
                }
                ("concept", "self-and-descendents") => {
                    Some(RuleOperation::SnomedDescendants { include_self: true })
                }
                ("concept", "in") => Some(RuleOperation::RefsetMembers),
                ("ecl", _) => Some(RuleOperation::Ecl),
                _ => None,
            },
            RxNorm => {
                if !is_membership(operator) {
                    return None;
                }
                match property {
                    "SAB" => Some(RuleOperation::RxNormSource),
                    "TTY" => Some(RuleOperation::RxNormTermType),
                    other => RelationshipLabel::parse(other).map(RuleOperation::RxNormRelationship),
                }
            }
        }
    }

    /// Metric label
    pub fn name(&self) -> &'static str {
        match self {
            RuleOperation::Descendants { include_self: false } => "descendent_of",
            RuleOperation::Descendants { include_self: true } => "self_and_descendents",
            RuleOperation::Children => "direct_child",
            RuleOperation::CodeIn => "code_in",
            RuleOperation::PropertyMatch { .. } => "property_match",
            RuleOperation::SnomedChildren => "snomed_direct_child",
            RuleOperation::SnomedDescendants { include_self: false } => "snomed_descendent_of",
            RuleOperation::SnomedDescendants { include_self: true } => {
                "snomed_self_and_descendents"
            }
            RuleOperation::RefsetMembers => "refset_members",
            RuleOperation::Ecl => "ecl",
            RuleOperation::RxNormSource => "rxnorm_sab",
            RuleOperation::RxNormTermType => "rxnorm_tty",
            RuleOperation::RxNormRelationship(_) => "rxnorm_relationship",
        }
    }
}

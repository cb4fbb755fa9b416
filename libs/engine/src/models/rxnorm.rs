//! RxNorm atoms, relationship anchors and the relationship label vocabulary

use std::fmt;

/// Term types that duplicate a concept's leading atom
pub const SYNONYM_TERM_TYPES: &[&str] = &["SY", "TMSY"];

/// Source vocabulary of the normalized RxNorm atoms
pub const RXNORM_SAB: &str = "RXNORM";

const REL_LABELS: &[&str] = &["CHD", "PAR", "RB", "RN", "RO", "RQ", "SIB", "SY"];

const RELA_LABELS: &[&str] = &[
    "consists_of",
    "constitutes",
    "contained_in",
    "contains",
    "dose_form_of",
    "doseformgroup_of",
    "form_of",
    "has_dose_form",
    "has_doseformgroup",
    "has_form",
    "has_ingredient",
    "has_ingredients",
    "has_part",
    "has_precise_ingredient",
    "has_quantified_form",
    "has_tradename",
    "ingredient_of",
    "ingredients_of",
    "inverse_isa",
    "isa",
    "part_of",
    "precise_ingredient_of",
    "quantified_form_of",
    "reformulated_to",
    "reformulation_of",
    "tradename_of",
];

/// One `rxnconso` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxNormAtom {
    pub rxcui: String,
    pub rxaui: String,
    pub sab: String,
    pub tty: String,
    pub name: String,
}

impl RxNormAtom {
    pub fn is_synonym(&self) -> bool {
        SYNONYM_TERM_TYPES.contains(&self.tty.as_str())
    }
}

/// Starting point of a relationship walk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RxNormAnchor {
    /// `CUI:` prefixed value, matched against RXCUI
    Concept(String),
    /// Unprefixed value, matched against RXAUI
    Atom(String),
}

impl RxNormAnchor {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value.strip_prefix("CUI:") {
            Some(rxcui) => RxNormAnchor::Concept(rxcui.trim().to_string()),
            None => RxNormAnchor::Atom(value.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RxNormAnchor::Concept(id) | RxNormAnchor::Atom(id) => id,
        }
    }
}

/// `rxnrel` column a relationship label is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelColumn {
    Rel,
    Rela,
}

/// A recognised relationship label.
///
/// Upper-case REL codes (`RB`, `RN`, ...) walk the `rel` column; named
/// relationships (`has_ingredient`, ...) walk the more specific `rela` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationshipLabel {
    pub column: RelColumn,
    pub label: &'static str,
}

impl RelationshipLabel {
    pub fn parse(property: &str) -> Option<Self> {
        let property = property.trim();
        if let Some(label) = REL_LABELS.iter().find(|l| **l == property) {
            return Some(Self {
                column: RelColumn::Rel,
                label: *label,
            });
        }
        RELA_LABELS
            .iter()
            .find(|l| l.eq_ignore_ascii_case(property))
            .map(|label| Self {
                column: RelColumn::Rela,
                label: *label,
            })
    }
}

impl fmt::Display for RelationshipLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

/// Rank of a term type when choosing the atom that represents a concept
pub fn term_type_rank(tty: &str) -> usize {
    const LEADERS: &[&str] = &[
        "IN", "PIN", "MIN", "SCD", "SBD", "GPCK", "BPCK", "SCDC", "SBDC", "SCDF", "SBDF", "SCDFP",
        "SBDFP", "SCDG", "SBDG", "SCDGP", "BN", "DF", "DFG", "PSN", "ET",
    ];
    LEADERS
        .iter()
        .position(|t| *t == tty)
        .unwrap_or(LEADERS.len())
}

//! Domain models shared by the stores, the rule evaluators and the orchestrator

pub mod code;
pub mod rule;
pub mod rxnorm;
pub mod terminology;
pub mod value_set;

pub use code::Code;
pub use rule::{ConceptRow, ExtensionalMemberRecord, RuleRecord};
pub use rxnorm::{RelColumn, RelationshipLabel, RxNormAnchor, RxNormAtom};
pub use terminology::{TerminologyKind, TerminologyVersion};
pub use value_set::{
    ExpansionSnapshot, StoredExpansion, ValueSet, ValueSetType, ValueSetVersionRecord,
    VersionStatus,
};

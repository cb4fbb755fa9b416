//! Value set expansion engine
//!
//! Computes the concrete membership of FHIR value set versions:
//! - Intensional versions evaluate include/exclude rules against SNOMED CT,
//!   RxNorm, ICD-10 and other loaded terminologies
//! - Results are combined per terminology (AND of includes minus excludes)
//!   and across terminologies (OR)
//! - Every computed expansion is appended as an immutable snapshot
//! - Extensional versions pass their explicit members through unchanged

// Allow clippy lints that are acceptable for this domain-specific codebase
#![allow(
    clippy::too_many_arguments,      // Store queries take many filter arguments
    clippy::type_complexity,         // Grouped rule maps are spelled out in full
)]

pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod ecl;
pub mod error;
pub mod expansion;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod rules;

pub use cache::LookupCache;
pub use config::Config;
pub use context::EngineContext;
pub use db::{
    ConceptStore, ExpansionStore, MemoryStore, PgStore, RxNormStore, SnomedStore,
    TerminologyQueryService, ValueSetStore,
};
pub use error::{Error, Result};
pub use expansion::ValueSetVersion;
pub use models::Code;
pub use rules::{Rule, RuleOperation};

use super::Code;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const SNOMED_CT_URI: &str = "http://snomed.info/sct";
pub const RXNORM_URI: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
pub const ICD10_CM_URI: &str = "http://hl7.org/fhir/sid/icd-10-cm";
pub const ICD10_PCS_URI: &str = "http://www.cms.gov/Medicare/Coding/ICD10";

/// A loaded release of a terminology, the binding target of every rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminologyVersion {
    pub uuid: Uuid,
    /// Human name, e.g. `SNOMED CT` or `ICD-10 CM`
    pub terminology: String,
    pub version: String,
    pub fhir_uri: String,
}

impl TerminologyVersion {
    pub fn kind(&self) -> TerminologyKind {
        TerminologyKind::from_name(&self.terminology)
    }

    /// Build a member code of this terminology release.
    pub fn code(&self, code: impl Into<String>, display: impl Into<String>) -> Code {
        Code::new(&self.fhir_uri, &self.version, code, display)
    }
}

/// Evaluation family of a terminology.
///
/// Selects which operators a rule may use and how they are queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminologyKind {
    SnomedCt,
    RxNorm,
    Icd10Cm,
    Icd10Pcs,
    Other,
}

impl TerminologyKind {
    /// Classify a terminology by name; spacing, hyphens and case are ignored.
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        match normalized.as_str() {
            "SNOMEDCT" | "SNOMEDCTUS" | "SNOMED" => TerminologyKind::SnomedCt,
            "RXNORM" => TerminologyKind::RxNorm,
            "ICD10CM" => TerminologyKind::Icd10Cm,
            "ICD10PCS" => TerminologyKind::Icd10Pcs,
            _ => TerminologyKind::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TerminologyKind::SnomedCt => "snomed-ct",
            TerminologyKind::RxNorm => "rxnorm",
            TerminologyKind::Icd10Cm => "icd-10-cm",
            TerminologyKind::Icd10Pcs => "icd-10-pcs",
            TerminologyKind::Other => "other",
        }
    }
}

impl fmt::Display for TerminologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use super::Code;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How membership of a value set is defined. Fixed for the lifetime of the value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSetType {
    /// Membership computed from include/exclude rules
    Intensional,
    /// Membership listed explicitly
    Extensional,
}

impl ValueSetType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueSetType::Intensional => "intensional",
            ValueSetType::Extensional => "extensional",
        }
    }
}

impl FromStr for ValueSetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "intensional" => Ok(ValueSetType::Intensional),
            "extensional" => Ok(ValueSetType::Extensional),
            other => Err(Error::Validation(format!("Unknown value set type '{other}'"))),
        }
    }
}

impl fmt::Display for ValueSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionStatus {
    #[serde(rename = "draft")]
    Draft,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "reviewed")]
    Reviewed,
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "retired")]
    Retired,
}

impl VersionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::Pending => "pending",
            VersionStatus::InProgress => "in progress",
            VersionStatus::Reviewed => "reviewed",
            VersionStatus::Active => "active",
            VersionStatus::Retired => "retired",
        }
    }
}

impl FromStr for VersionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(VersionStatus::Draft),
            "pending" => Ok(VersionStatus::Pending),
            "in progress" | "in-progress" => Ok(VersionStatus::InProgress),
            "reviewed" => Ok(VersionStatus::Reviewed),
            "active" => Ok(VersionStatus::Active),
            "retired" => Ok(VersionStatus::Retired),
            other => Err(Error::Validation(format!(
                "Unknown value set version status '{other}'"
            ))),
        }
    }
}

/// Value set metadata shared by all of its versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSet {
    pub uuid: Uuid,
    pub name: String,
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub contact: Option<String>,
    pub description: Option<String>,
    pub immutable: bool,
    pub experimental: bool,
    pub purpose: Option<String>,
    #[serde(rename = "type")]
    pub value_set_type: ValueSetType,
}

/// Stored row of a value set version together with its owning value set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSetVersionRecord {
    pub uuid: Uuid,
    pub value_set: ValueSet,
    pub version: i32,
    pub status: VersionStatus,
    pub effective_start: Option<NaiveDate>,
    pub effective_end: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Header of one persisted expansion snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionSnapshot {
    pub uuid: Uuid,
    pub value_set_version_uuid: Uuid,
    pub timestamp: DateTime<Utc>,
    pub size: usize,
}

/// A snapshot header with its member codes
#[derive(Debug, Clone)]
pub struct StoredExpansion {
    pub snapshot: ExpansionSnapshot,
    pub codes: HashSet<Code>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_spellings() {
        assert_eq!("in progress".parse::<VersionStatus>().unwrap(), VersionStatus::InProgress);
        assert_eq!("in-progress".parse::<VersionStatus>().unwrap(), VersionStatus::InProgress);
        assert_eq!("active".parse::<VersionStatus>().unwrap(), VersionStatus::Active);
        assert!("superseded".parse::<VersionStatus>().is_err());
    }

    #[test]
    fn value_set_type_round_trips_through_text() {
        for ty in [ValueSetType::Intensional, ValueSetType::Extensional] {
            assert_eq!(ty.as_str().parse::<ValueSetType>().unwrap(), ty);
        }
        assert!(matches!(
            "rule-based".parse::<ValueSetType>(),
            Err(Error::Validation(_))
        ));
    }
}

//! JSON shape of a value set version for API consumers

use super::ValueSetVersion;
use crate::{
    models::{Code, ValueSetType, VersionStatus},
    rules::Rule,
    Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct ValueSetDocument<'a> {
    identifier: Uuid,
    name: &'a str,
    title: Option<&'a str>,
    publisher: Option<&'a str>,
    contact: Option<&'a str>,
    description: Option<&'a str>,
    immutable: bool,
    experimental: bool,
    purpose: Option<&'a str>,
    effective_start: Option<NaiveDate>,
    effective_end: Option<NaiveDate>,
    version: i32,
    version_uuid: Uuid,
    status: VersionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    expansion: Option<ExpansionDocument>,
    compose: ComposeDocument<'a>,
}

#[derive(Debug, Default, Serialize)]
struct ExpansionDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contains: Option<Vec<JsonValue>>,
}

#[derive(Debug, Serialize)]
struct ComposeDocument<'a> {
    include: Vec<IncludeBlock<'a>>,
    exclude: Option<Vec<IncludeBlock<'a>>>,
}

#[derive(Debug, Serialize)]
struct IncludeBlock<'a> {
    system: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Vec<FilterDocument<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    concept: Option<Vec<JsonValue>>,
}

#[derive(Debug, Serialize)]
struct FilterDocument<'a> {
    property: &'a str,
    op: &'a str,
    value: &'a str,
}

fn sorted_codes<'a>(codes: impl IntoIterator<Item = &'a Code>) -> Vec<&'a Code> {
    let mut codes: Vec<&Code> = codes.into_iter().collect();
    codes.sort();
    codes
}

/// One block per terminology holding its rules as filters, in position order
fn filter_blocks<'a>(
    rules: impl Iterator<Item = (&'a String, Vec<&'a Rule>)>,
) -> Vec<IncludeBlock<'a>> {
    let mut blocks: Vec<IncludeBlock<'a>> = rules
        .filter(|(_, rules)| !rules.is_empty())
        .map(|(_, mut rules)| {
            rules.sort_by(|a, b| a.position.cmp(&b.position).then(a.uuid.cmp(&b.uuid)));
            let first: &'a Rule = rules[0];
            IncludeBlock {
                system: &first.terminology.fhir_uri,
                version: &first.terminology.version,
                filter: Some(
                    rules
                        .into_iter()
                        .map(|rule| FilterDocument {
                            property: &rule.property,
                            op: &rule.operator,
                            value: &rule.value,
                        })
                        .collect(),
                ),
                concept: None,
            }
        })
        .collect();
    blocks.sort_by(|a, b| (a.system, a.version).cmp(&(b.system, b.version)));
    blocks
}

impl ValueSetVersion {
    /// Serialize the version with its composition and, for intensional value
    /// sets, whatever expansion has been computed or loaded.
    pub fn serialize(&self) -> Result<JsonValue> {
        let value_set = &self.value_set;

        let (expansion, compose) = match value_set.value_set_type {
            ValueSetType::Intensional => {
                let expansion = if self.has_expansion() {
                    ExpansionDocument {
                        identifier: self.snapshot.as_ref().map(|s| s.uuid),
                        timestamp: self.snapshot.as_ref().map(|s| s.timestamp),
                        total: Some(self.expansion.len()),
                        contains: Some(
                            sorted_codes(&self.expansion)
                                .into_iter()
                                .map(|code| code.serialize(true))
                                .collect(),
                        ),
                    }
                } else {
                    ExpansionDocument::default()
                };

                let include = filter_blocks(self.include_rules().into_iter());
                let exclude = filter_blocks(self.exclude_rules().into_iter());
                let compose = ComposeDocument {
                    include,
                    exclude: if exclude.is_empty() { None } else { Some(exclude) },
                };
                (Some(expansion), compose)
            }
            ValueSetType::Extensional => {
                let include = self
                    .extensional_codes
                    .iter()
                    .map(|((system, version), codes)| IncludeBlock {
                        system,
                        version,
                        filter: None,
                        concept: Some(
                            sorted_codes(codes)
                                .into_iter()
                                .map(|code| code.serialize(false))
                                .collect(),
                        ),
                    })
                    .collect();
                (
                    None,
                    ComposeDocument {
                        include,
                        exclude: None,
                    },
                )
            }
        };

        let document = ValueSetDocument {
            identifier: value_set.uuid,
            name: &value_set.name,
            title: value_set.title.as_deref(),
            publisher: value_set.publisher.as_deref(),
            contact: value_set.contact.as_deref(),
            description: value_set.description.as_deref(),
            immutable: value_set.immutable,
            experimental: value_set.experimental,
            purpose: value_set.purpose.as_deref(),
            effective_start: self.effective_start,
            effective_end: self.effective_end,
            version: self.version,
            version_uuid: self.uuid,
            status: self.status,
            expansion,
            compose,
        };

        Ok(serde_json::to_value(document).map_err(anyhow::Error::from)?)
    }
}

//! Include/exclude rules and their terminology-specific evaluation
//!
//! A [`Rule`] is bound to one terminology release. Its `(property, operator)`
//! pair is resolved against that terminology's family by
//! [`RuleOperation::resolve`], and the resulting operation picks the
//! evaluator in [`generic`], [`snomed`] or [`rxnorm`].

pub mod generic;
pub mod hierarchy;
pub mod operation;
pub mod rxnorm;
pub mod snomed;

pub use operation::RuleOperation;

use crate::{
    context::EngineContext,
    metrics,
    models::{Code, RuleRecord, TerminologyKind, TerminologyVersion},
    Error, Result,
};
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

/// Split a rule value into its comma separated entries, trimmed, empties dropped.
pub fn split_values(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub uuid: Uuid,
    pub position: i32,
    pub description: Option<String>,
    pub property: String,
    pub operator: String,
    pub value: String,
    pub include: bool,
    pub terminology: TerminologyVersion,
    results: HashSet<Code>,
}

impl Rule {
    pub fn new(record: RuleRecord, terminology: TerminologyVersion) -> Self {
        Self {
            uuid: record.uuid,
            position: record.position,
            description: record.description,
            property: record.property,
            operator: record.operator,
            value: record.value,
            include: record.include,
            terminology,
            results: HashSet::new(),
        }
    }

    pub fn kind(&self) -> TerminologyKind {
        self.terminology.kind()
    }

    pub fn values(&self) -> Vec<String> {
        split_values(&self.value)
    }

    /// The operation this rule's property and operator select for its terminology
    pub fn operation(&self) -> Result<RuleOperation> {
        RuleOperation::resolve(self.kind(), &self.property, &self.operator).ok_or_else(|| {
            Error::UnsupportedRule {
                rule: self.uuid,
                terminology: self.terminology.terminology.clone(),
                property: self.property.clone(),
                operator: self.operator.clone(),
            }
        })
    }

    /// Codes matched by this rule. Reads the stores and, for `ecl`, the
    /// terminology server; changes nothing.
    ///
    /// An unsupported rule is an error unless `engine.strict_rules` is off, in
    /// which case it matches nothing.
    pub async fn evaluate(&self, ctx: &EngineContext) -> Result<HashSet<Code>> {
        let kind = self.kind();
        let operation = match self.operation() {
            Ok(operation) => operation,
            Err(_) if !ctx.config.strict_rules => {
                tracing::warn!(
                    rule = %self.uuid,
                    terminology = %self.terminology.terminology,
                    property = %self.property,
                    operator = %self.operator,
                    "Unsupported rule contributes no codes"
                );
                metrics::record_rule_evaluation(kind.as_str(), "unsupported", "skipped", 0.0);
                return Ok(HashSet::new());
            }
            Err(e) => {
                metrics::record_rule_evaluation(kind.as_str(), "unsupported", "error", 0.0);
                return Err(e);
            }
        };

        let started = Instant::now();
        let result = self.run(ctx, &operation).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(codes) => {
                metrics::record_rule_evaluation(kind.as_str(), operation.name(), "success", elapsed);
                tracing::debug!(
                    rule = %self.uuid,
                    terminology = %self.terminology.terminology,
                    operation = operation.name(),
                    include = self.include,
                    count = codes.len(),
                    "Rule evaluated"
                );
            }
            Err(e) => {
                metrics::record_rule_evaluation(kind.as_str(), operation.name(), "error", elapsed);
                tracing::warn!(
                    rule = %self.uuid,
                    operation = operation.name(),
                    error = %e,
                    "Rule evaluation failed"
                );
            }
        }
        result
    }

    /// Evaluate and keep the codes in [`results`](Self::results).
    pub async fn execute(&mut self, ctx: &EngineContext) -> Result<()> {
        let codes = self.evaluate(ctx).await?;
        self.results = codes;
        Ok(())
    }

    pub fn results(&self) -> &HashSet<Code> {
        &self.results
    }

    pub(crate) fn set_results(&mut self, results: HashSet<Code>) {
        self.results = results;
    }

    async fn run(&self, ctx: &EngineContext, operation: &RuleOperation) -> Result<HashSet<Code>> {
        let terminology = &self.terminology;
        let values = self.values();

        match operation {
            RuleOperation::Ecl => {
                let expression = self.value.trim();
                if expression.is_empty() {
                    return Ok(HashSet::new());
                }
                snomed::ecl(ctx, terminology, expression).await
            }
            _ if values.is_empty() => Ok(HashSet::new()),
            RuleOperation::Descendants { include_self } => {
                generic::descendants(ctx, terminology, &values, *include_self).await
            }
            RuleOperation::Children => generic::children(ctx, terminology, &values).await,
            RuleOperation::CodeIn => generic::code_in(ctx, terminology, &values).await,
            RuleOperation::PropertyMatch { property } => {
                generic::property_match(ctx, terminology, property, &values).await
            }
            RuleOperation::SnomedChildren => snomed::children(ctx, terminology, &values).await,
            RuleOperation::SnomedDescendants { include_self } => {
                snomed::descendants(ctx, terminology, &values, *include_self).await
            }
            RuleOperation::RefsetMembers => {
                snomed::refset_members(ctx, terminology, &values).await
            }
            RuleOperation::RxNormSource => rxnorm::by_source(ctx, terminology, &values).await,
            RuleOperation::RxNormTermType => {
                rxnorm::by_term_type(ctx, terminology, &values).await
            }
            RuleOperation::RxNormRelationship(label) => {
                rxnorm::related(ctx, terminology, *label, &values).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_trimmed_and_empties_dropped() {
        assert_eq!(split_values(" E11, E10 ,,E13 "), vec!["E11", "E10", "E13"]);
        assert!(split_values(" , ").is_empty());
    }

    #[test]
    fn unsupported_rules_name_their_shape() {
        let rule = Rule::new(
            RuleRecord {
                uuid: Uuid::new_v4(),
                position: 0,
                description: None,
                property: "code".to_string(),
                operator: "regex".to_string(),
                value: "E1.*".to_string(),
                include: true,
                terminology_version_uuid: Uuid::new_v4(),
            },
            TerminologyVersion {
                uuid: Uuid::new_v4(),
                terminology: "ICD-10 CM".to_string(),
                version: "2024".to_string(),
                fhir_uri: "http://hl7.org/fhir/sid/icd-10-cm".to_string(),
            },
        );

        match rule.operation() {
            Err(Error::UnsupportedRule {
                terminology,
                operator,
                ..
            }) => {
                assert_eq!(terminology, "ICD-10 CM");
                assert_eq!(operator, "regex");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

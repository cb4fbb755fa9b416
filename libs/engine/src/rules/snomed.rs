//! SNOMED CT evaluators: local is-a traversal, reference sets and ECL delegation

use super::hierarchy::{descendants as closure, IsAHierarchy};
use crate::{
    context::EngineContext,
    models::{Code, ConceptRow, TerminologyVersion},
    Result,
};
use std::collections::HashSet;

fn to_codes(terminology: &TerminologyVersion, rows: Vec<ConceptRow>) -> HashSet<Code> {
    rows.into_iter()
        .map(|row| terminology.code(row.code, row.display))
        .collect()
}

pub(crate) async fn children(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    parents: &[String],
) -> Result<HashSet<Code>> {
    let rows = ctx
        .snomed
        .find_is_a_children(terminology.uuid, parents, &ctx.config.snomed_is_a_type)
        .await?;
    Ok(to_codes(terminology, rows))
}

pub(crate) async fn descendants(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    seeds: &[String],
    include_self: bool,
) -> Result<HashSet<Code>> {
    let hierarchy = IsAHierarchy {
        store: ctx.snomed.as_ref(),
        release: terminology.uuid,
        is_a_type: &ctx.config.snomed_is_a_type,
    };
    let mut rows = closure(&hierarchy, seeds).await?;
    if include_self {
        let seeds = ctx.snomed.find_active_concepts(terminology.uuid, seeds).await?;
        rows.extend(seeds);
    }
    Ok(to_codes(terminology, rows))
}

pub(crate) async fn refset_members(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    refsets: &[String],
) -> Result<HashSet<Code>> {
    let mut codes = HashSet::new();
    for refset in refsets {
        let rows = ctx.snomed.find_refset_members(terminology.uuid, refset).await?;
        codes.extend(to_codes(terminology, rows));
    }
    Ok(codes)
}

/// Send the whole rule value to the terminology server as one expression.
pub(crate) async fn ecl(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    expression: &str,
) -> Result<HashSet<Code>> {
    let service = ctx.query_service()?;
    let rows = service.query_expression(expression).await?;
    Ok(to_codes(terminology, rows))
}

//! ICD-10 CM/PCS and other code systems stored as concepts plus a hierarchy

use super::hierarchy::{descendants as closure, ConceptHierarchy};
use crate::{
    context::EngineContext,
    models::{Code, TerminologyVersion},
    Result,
};
use std::collections::HashSet;

pub(crate) async fn descendants(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    seeds: &[String],
    include_self: bool,
) -> Result<HashSet<Code>> {
    let hierarchy = ConceptHierarchy {
        store: ctx.concepts.as_ref(),
        terminology: terminology.uuid,
    };
    let mut rows = closure(&hierarchy, seeds).await?;
    if include_self {
        rows.extend(ctx.concepts.find_concepts(terminology.uuid, seeds).await?);
    }
    Ok(rows
        .into_iter()
        .map(|row| terminology.code(row.code, row.display))
        .collect())
}

pub(crate) async fn children(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    parents: &[String],
) -> Result<HashSet<Code>> {
    let rows = ctx.concepts.find_children(terminology.uuid, parents).await?;
    Ok(rows
        .into_iter()
        .map(|row| terminology.code(row.code, row.display))
        .collect())
}

pub(crate) async fn code_in(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    codes: &[String],
) -> Result<HashSet<Code>> {
    let rows = ctx.concepts.find_concepts(terminology.uuid, codes).await?;
    Ok(rows
        .into_iter()
        .map(|row| terminology.code(row.code, row.display))
        .collect())
}

pub(crate) async fn property_match(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    property: &str,
    values: &[String],
) -> Result<HashSet<Code>> {
    let rows = ctx
        .concepts
        .find_by_property(terminology.uuid, property, values)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| terminology.code(row.code, row.display))
        .collect())
}

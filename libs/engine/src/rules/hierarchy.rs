//! Breadth-first closure over a child relation

use crate::{
    db::{ConceptStore, SnomedStore},
    models::ConceptRow,
    Result,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// One step down a hierarchy
#[async_trait]
pub trait ChildLookup: Send + Sync {
    async fn children(&self, parents: &[String]) -> Result<Vec<ConceptRow>>;
}

/// Parent/child edges of one release of a generic code system
pub struct ConceptHierarchy<'a> {
    pub store: &'a dyn ConceptStore,
    pub terminology: Uuid,
}

#[async_trait]
impl ChildLookup for ConceptHierarchy<'_> {
    async fn children(&self, parents: &[String]) -> Result<Vec<ConceptRow>> {
        self.store.find_children(self.terminology, parents).await
    }
}

/// SNOMED CT relationships of the configured is-a type within one release
pub struct IsAHierarchy<'a> {
    pub store: &'a dyn SnomedStore,
    pub release: Uuid,
    pub is_a_type: &'a str,
}

#[async_trait]
impl ChildLookup for IsAHierarchy<'_> {
    async fn children(&self, parents: &[String]) -> Result<Vec<ConceptRow>> {
        self.store
            .find_is_a_children(self.release, parents, self.is_a_type)
            .await
    }
}

/// Every descendant of `seeds`, seeds excluded unless one descends from another.
///
/// Issues one query per depth level. Codes already expanded are not queried
/// again, so cycles terminate.
pub async fn descendants(lookup: &dyn ChildLookup, seeds: &[String]) -> Result<Vec<ConceptRow>> {
    let mut expanded: HashSet<String> = seeds.iter().cloned().collect();
    let mut found: BTreeMap<String, String> = BTreeMap::new();
    let mut frontier: Vec<String> = expanded.iter().cloned().collect();
    frontier.sort();
    let mut depth = 0usize;

    while !frontier.is_empty() {
        depth += 1;
        let children = lookup.children(&frontier).await?;

        let mut next = Vec::new();
        for row in children {
            if expanded.insert(row.code.clone()) {
                next.push(row.code.clone());
            }
            found.entry(row.code).or_insert(row.display);
        }
        next.sort();
        frontier = next;
    }

    tracing::trace!(seeds = seeds.len(), depth, found = found.len(), "Closure complete");

    Ok(found
        .into_iter()
        .map(|(code, display)| ConceptRow { code, display })
        .collect())
}

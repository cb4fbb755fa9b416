//! RxNorm evaluators: source vocabulary, term type and relationship walks
//!
//! A concept carries many atoms. Stores already drop synonym term types;
//! here the remaining atoms are reduced to one leader per RXCUI so a concept
//! yields exactly one code. The leader is chosen among all atoms of the
//! concept, not only those a rule matched, so every rule selecting a concept
//! produces the same code.

use crate::{
    context::EngineContext,
    models::{
        rxnorm::{term_type_rank, RXNORM_SAB},
        Code, RelationshipLabel, RxNormAnchor, RxNormAtom, TerminologyVersion,
    },
    Result,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Best atom per RXCUI: `RXNORM` atoms first, then lowest term type rank,
/// then name, then RXAUI
pub(crate) fn leader_atoms(atoms: impl IntoIterator<Item = RxNormAtom>) -> Vec<RxNormAtom> {
    let mut leaders: BTreeMap<String, RxNormAtom> = BTreeMap::new();
    for atom in atoms.into_iter().filter(|a| !a.is_synonym()) {
        let key = |a: &RxNormAtom| {
            (
                a.sab != RXNORM_SAB,
                term_type_rank(&a.tty),
                a.name.clone(),
                a.rxaui.clone(),
            )
        };
        match leaders.get(&atom.rxcui) {
            Some(current) if key(current) <= key(&atom) => {}
            _ => {
                leaders.insert(atom.rxcui.clone(), atom);
            }
        }
    }
    leaders.into_values().collect()
}

/// One code per matched RXCUI, displayed by the concept's leader atom
async fn to_codes(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    matched: Vec<RxNormAtom>,
) -> Result<HashSet<Code>> {
    if matched.is_empty() {
        return Ok(HashSet::new());
    }
    let rxcuis: Vec<String> = matched
        .iter()
        .map(|atom| atom.rxcui.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let concept_atoms = ctx.rxnorm.find_concept_atoms(&rxcuis).await?;

    Ok(leader_atoms(matched.into_iter().chain(concept_atoms))
        .into_iter()
        .map(|atom| terminology.code(atom.rxcui, atom.name))
        .collect())
}

pub(crate) async fn by_source(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    sabs: &[String],
) -> Result<HashSet<Code>> {
    let atoms = ctx.rxnorm.find_atoms_by_source(sabs).await?;
    to_codes(ctx, terminology, atoms).await
}

pub(crate) async fn by_term_type(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    ttys: &[String],
) -> Result<HashSet<Code>> {
    let atoms = ctx.rxnorm.find_atoms_by_term_type(ttys).await?;
    to_codes(ctx, terminology, atoms).await
}

/// Concepts related to any of the anchors through `label`
pub(crate) async fn related(
    ctx: &EngineContext,
    terminology: &TerminologyVersion,
    label: RelationshipLabel,
    anchors: &[String],
) -> Result<HashSet<Code>> {
    let mut atoms = Vec::new();
    for value in anchors {
        let anchor = RxNormAnchor::parse(value);
        atoms.extend(ctx.rxnorm.find_related_atoms(&anchor, label).await?);
    }
    to_codes(ctx, terminology, atoms).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(rxcui: &str, rxaui: &str, tty: &str, name: &str) -> RxNormAtom {
        sourced("RXNORM", rxcui, rxaui, tty, name)
    }

    fn sourced(sab: &str, rxcui: &str, rxaui: &str, tty: &str, name: &str) -> RxNormAtom {
        RxNormAtom {
            rxcui: rxcui.to_string(),
            rxaui: rxaui.to_string(),
            sab: sab.to_string(),
            tty: tty.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn one_leader_per_concept() {
        let leaders = leader_atoms(vec![
            atom("198440", "1", "PSN", "Acetaminophen 500mg tablet"),
            atom("198440", "2", "SCD", "acetaminophen 500 MG Oral Tablet"),
            atom("198440", "3", "SY", "APAP 500 MG Oral Tablet"),
            atom("161", "4", "IN", "acetaminophen"),
        ]);

        assert_eq!(leaders.len(), 2);
        assert_eq!(leaders[0].rxcui, "161");
        assert_eq!(leaders[1].tty, "SCD");
    }

    #[test]
    fn ties_break_on_name() {
        let leaders = leader_atoms(vec![
            atom("1", "b", "SCD", "zeta"),
            atom("1", "a", "SCD", "alpha"),
        ]);
        assert_eq!(leaders[0].name, "alpha");
    }

    #[test]
    fn rxnorm_atoms_lead_over_other_sources() {
        let leaders = leader_atoms(vec![
            sourced("MTHSPL", "198440", "9", "DP", "Acetaminophen 500mg Tablet"),
            atom("198440", "2", "SCD", "acetaminophen 500 MG Oral Tablet"),
        ]);
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].sab, "RXNORM");

        let leaders = leader_atoms(vec![
            sourced("VANDF", "5", "b", "CD", "zinc oxide 20% topical paste"),
            sourced("MTHSPL", "5", "a", "DP", "Zinc Oxide Paste"),
        ]);
        assert_eq!(leaders[0].name, "Zinc Oxide Paste");
    }
}

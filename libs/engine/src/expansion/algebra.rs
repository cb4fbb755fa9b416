//! Set algebra applied to evaluated rule results
//!
//! Within a terminology, include rules are ANDed and every exclude rule is
//! subtracted from that intersection. Across terminologies the per-terminology
//! sets are ORed.

use crate::{models::Code, Error, Result};
use std::collections::HashSet;

/// Contribution of one terminology to an expansion.
///
/// # Errors
/// * `MissingIncludeRule` - `includes` is empty
pub fn combine_terminology(
    terminology: &str,
    includes: &[&HashSet<Code>],
    excludes: &[&HashSet<Code>],
) -> Result<HashSet<Code>> {
    let Some((first, rest)) = includes.split_first() else {
        return Err(Error::MissingIncludeRule {
            terminology: terminology.to_string(),
        });
    };

    let mut running: HashSet<Code> = (*first).clone();
    for other in rest {
        running.retain(|code| other.contains(code));
    }

    for exclude in excludes {
        let removed: HashSet<Code> = running.intersection(exclude).cloned().collect();
        running.retain(|code| !removed.contains(code));
    }

    Ok(running)
}

/// Union of per-terminology contributions
pub fn union_all<I>(parts: I) -> HashSet<Code>
where
    I: IntoIterator<Item = HashSet<Code>>,
{
    let mut expansion = HashSet::new();
    for part in parts {
        expansion.extend(part);
    }
    expansion
}

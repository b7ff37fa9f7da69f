//! Branch/tag resolver (spec component E).
//!
//! A symbol can name a revision id that was never actually committed: the
//! common case is a symbol pointing straight at a branch number (an odd
//! number of dotted components, [`comma_v::Num::Branch`]) rather than at
//! any specific commit on it. [`RcsFile::load`] already represents those as
//! placeholder [`Revision`]s with no date; this pass finds, for each one,
//! the highest dated revision whose id continues it, and moves the
//! placeholder's symbols onto that revision as named branch heads.

use std::path::PathBuf;

use crate::{
    error::Error,
    rcsfile::{Revision, RcsFile},
};

/// Resolves every placeholder revision in `file`, mutating it in place.
pub fn resolve(file: &mut RcsFile) -> Result<(), Error> {
    let placeholder_ids: Vec<comma_v::Num> = file
        .revisions
        .iter()
        .filter(|(_, revision)| revision.is_placeholder())
        .map(|(id, _)| id.clone())
        .collect();

    for id in placeholder_ids {
        let placeholder = file
            .revisions
            .get(&id)
            .expect("placeholder id came from this same map")
            .clone();

        match highest_dated_descendant(file, &id) {
            Some(target_id) => {
                let target = file
                    .revisions
                    .get_mut(&target_id)
                    .expect("descendant id came from this same map");
                for symbol in placeholder.symbols {
                    if !target.branch_names.contains(&symbol) {
                        target.branch_names.push(symbol);
                    }
                }
                file.revisions.remove(&id);
            }
            None => {
                return Err(Error::ComplexBranchStructure {
                    path: PathBuf::from(&file.name),
                    symbol: placeholder
                        .symbols
                        .iter()
                        .next()
                        .cloned()
                        .unwrap_or_default(),
                    revision: id.to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Finds the highest (per [`comma_v::Num`]'s integer-tuple ordering, a
/// tighter "better sort" than the naive string comparison `spec.md`'s own
/// design notes call out elsewhere) dated revision whose id begins with
/// `id` followed by a `.`.
fn highest_dated_descendant(file: &RcsFile, id: &comma_v::Num) -> Option<comma_v::Num> {
    let prefix = format!("{}.", id);
    file.revisions
        .values()
        .filter(|revision: &&Revision| !revision.is_placeholder())
        .filter(|revision| revision.id.to_string().starts_with(&prefix))
        .map(|revision| revision.id.clone())
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use comma_v::Num;
    use std::{
        collections::{BTreeMap, BTreeSet},
        str::FromStr,
    };

    fn dated(id: &str) -> Revision {
        Revision {
            id: Num::from_str(id).unwrap(),
            author: "alice".to_string(),
            date: Some(std::time::SystemTime::UNIX_EPOCH),
            state: None,
            log: Vec::new(),
            text: Vec::new(),
            branches: Vec::new(),
            next: None,
            diff_base: None,
            branch: Some(format!("{}.x", id)),
            branch_point: None,
            symbols: BTreeSet::new(),
            branch_names: Vec::new(),
        }
    }

    fn placeholder(id: &str, symbol: &str) -> Revision {
        Revision {
            id: Num::from_str(id).unwrap(),
            author: String::new(),
            date: None,
            state: None,
            log: Vec::new(),
            text: Vec::new(),
            branches: Vec::new(),
            next: None,
            diff_base: None,
            branch: None,
            branch_point: None,
            symbols: [symbol.to_string()].into_iter().collect(),
            branch_names: Vec::new(),
        }
    }

    #[test]
    fn moves_symbol_onto_highest_dated_descendant() {
        let mut revisions = BTreeMap::new();
        revisions.insert(Num::from_str("1.3.2").unwrap(), placeholder("1.3.2", "REL_1"));
        revisions.insert(Num::from_str("1.3.2.1").unwrap(), dated("1.3.2.1"));
        revisions.insert(Num::from_str("1.3.2.2").unwrap(), dated("1.3.2.2"));

        let mut file = RcsFile {
            name: "f".to_string(),
            executable: false,
            head: None,
            revisions,
        };

        resolve(&mut file).unwrap();

        assert!(!file.revisions.contains_key(&Num::from_str("1.3.2").unwrap()));
        let target = file.revisions.get(&Num::from_str("1.3.2.2").unwrap()).unwrap();
        assert_eq!(target.branch_names, vec!["REL_1".to_string()]);
    }

    #[test]
    fn fatal_when_no_dated_descendant_exists() {
        let mut revisions = BTreeMap::new();
        revisions.insert(Num::from_str("1.3.2").unwrap(), placeholder("1.3.2", "REL_1"));

        let mut file = RcsFile {
            name: "f".to_string(),
            executable: false,
            head: None,
            revisions,
        };

        assert!(resolve(&mut file).is_err());
    }
}

//! Per-file revision graph construction (spec component C, graph half) and
//! its integration with delta replay (component D).
//!
//! `comma_v::parse` turns a `,v` file into a flat grammar-level `File`: a
//! `HashMap<Num, Delta>` plus a `HashMap<Num, DeltaText>`, with no implied
//! traversal order. [`RcsFile::load`] walks that flat structure the way
//! `co` itself would: starting at `head`, descending the trunk via `next`,
//! and recursing into `branches` wherever they sprout, threading the
//! accumulated base text down the same traversal so each delta's diff base
//! is always already resolved by the time it is needed (spec §4.D).

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use comma_v::Num;

use crate::{error::Error, replay};

/// One historical version of a single `,v` file, fully materialized.
#[derive(Debug, Clone)]
pub struct Revision {
    pub id: Num,
    pub author: String,
    /// `None` only for a symbol-only placeholder: a revision id that a
    /// symbol names but that was never actually committed.
    pub date: Option<std::time::SystemTime>,
    pub state: Option<String>,
    pub log: Vec<u8>,
    pub text: Vec<u8>,
    /// Child revision ids that are branch heads rooted here.
    pub branches: Vec<Num>,
    /// Successor id in storage order (trunk: the previous, more historical
    /// revision; branch: the next commit down the branch).
    pub next: Option<Num>,
    /// The revision whose text plus this revision's delta yields this
    /// revision's own text. `None` only for the head.
    pub diff_base: Option<Num>,
    /// This revision's branch label (`None` ⇒ trunk), e.g. `"1.3.x"`.
    pub branch: Option<String>,
    /// The trunk (or parent-branch) revision this branch sprouted from.
    pub branch_point: Option<Num>,
    /// Symbolic names (tags) attached directly to this revision.
    pub symbols: BTreeSet<String>,
    /// Named branches whose current tip is this revision, populated by
    /// [`crate::resolve::resolve`] out of symbol-only placeholders that
    /// pointed at a branch number with no revision of its own.
    pub branch_names: Vec<String>,
}

/// One parsed `,v` file together with its reconstructed revisions.
#[derive(Debug, Clone)]
pub struct RcsFile {
    /// Logical filename as it should appear in the export, independent of
    /// on-disk layout (e.g. with a trailing `,v` and any `Attic/` path
    /// component stripped).
    pub name: String,
    pub executable: bool,
    pub head: Option<Num>,
    pub revisions: BTreeMap<Num, Revision>,
}

impl RcsFile {
    /// Parses the `,v` file at `path` and reconstructs every revision's
    /// full text, exporting it under `name`.
    pub fn load(path: &Path, name: String, expand_keywords: bool) -> Result<Self, Error> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let cv = comma_v::parse(&bytes).map_err(|e| Error::parse(path, e))?;
        let executable = is_executable(path);

        let head = cv.head().ok_or_else(|| Error::MissingHead { path: path.to_path_buf() })?;

        let mut revisions = BTreeMap::new();
        walk(
            &cv,
            path,
            head.clone(),
            None,
            None,
            None,
            None,
            expand_keywords,
            &mut revisions,
        )?;

        // Symbols that point at a revision id with no delta of its own
        // become placeholders for the branch/tag resolver (spec §4.E).
        for (sym, target) in &cv.admin.symbols {
            let name = String::from_utf8_lossy(sym).to_string();
            match revisions.get_mut(target) {
                Some(revision) => {
                    revision.symbols.insert(name);
                }
                None => {
                    revisions
                        .entry(target.clone())
                        .or_insert_with(|| Revision::placeholder(target.clone()))
                        .symbols
                        .insert(name);
                }
            }
        }

        Ok(Self {
            name,
            executable,
            head: Some(head.clone()),
            revisions,
        })
    }
}

impl Revision {
    fn placeholder(id: Num) -> Self {
        Self {
            id,
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
            symbols: BTreeSet::new(),
            branch_names: Vec::new(),
        }
    }

    /// A placeholder is a symbol-only pseudo-revision: it was never
    /// actually committed, so it carries no date.
    pub fn is_placeholder(&self) -> bool {
        self.date.is_none()
    }
}

/// Replaces the last dotted component of a revision id with `x`, the
/// convention `rcsfile(5)`-derived branch labels use.
fn branch_label(id: &Num) -> String {
    let rendered = id.to_string();
    match rendered.rfind('.') {
        Some(at) => format!("{}.x", &rendered[..at]),
        None => format!("{}.x", rendered),
    }
}

/// Walks the delta chain starting at `id`, filling in `revisions` in
/// traversal order (parent before child) so each node's base text is
/// already known when its own delta is replayed.
///
/// The trunk descent is iterated rather than recursed, since linear RCS
/// histories can be tens of thousands of revisions deep; branch fan-out is
/// recursed, since real branch trees rarely nest more than a few levels.
#[allow(clippy::too_many_arguments)]
fn walk(
    cv: &comma_v::File,
    path: &Path,
    mut id: Num,
    branch: Option<String>,
    branch_point: Option<Num>,
    mut diff_base: Option<Num>,
    mut base_text: Option<Vec<u8>>,
    expand_keywords: bool,
    revisions: &mut BTreeMap<Num, Revision>,
) -> Result<(), Error> {
    loop {
        if revisions.contains_key(&id) {
            return Err(Error::DuplicateDiffBase {
                path: path.to_path_buf(),
                revision: id.to_string(),
            });
        }

        let delta = cv.delta.get(&id).ok_or_else(|| Error::MissingDiffBase {
            path: path.to_path_buf(),
            revision: id.to_string(),
        })?;
        let delta_text = cv
            .delta_text
            .get(&id)
            .ok_or_else(|| Error::MissingRevisionText {
                path: path.to_path_buf(),
                revision: id.to_string(),
            })?;

        let text = if expand_keywords {
            replay::expand_via_co(path, &id)?
        } else {
            match &base_text {
                None => delta_text.text.0.clone(),
                Some(base) => replay::apply(path, &id, base, &delta_text.text.0)?,
            }
        };

        revisions.insert(
            id.clone(),
            Revision {
                id: id.clone(),
                author: String::from_utf8_lossy(&delta.author.0).to_string(),
                date: Some(delta.date),
                state: delta
                    .state
                    .as_ref()
                    .map(|s| String::from_utf8_lossy(&s.0).to_string()),
                log: delta_text.log.0.clone(),
                text: text.clone(),
                branches: delta.branches.clone(),
                next: delta.next.clone(),
                diff_base: diff_base.clone(),
                branch: branch.clone(),
                branch_point: branch_point.clone(),
                symbols: BTreeSet::new(),
                branch_names: Vec::new(),
            },
        );

        for child in &delta.branches {
            if !cv.delta.contains_key(child) {
                // The branch number has no commit of its own yet; leave it
                // for the resolver to attach as a placeholder.
                continue;
            }

            walk(
                cv,
                path,
                child.clone(),
                Some(branch_label(child)),
                Some(id.clone()),
                Some(id.clone()),
                Some(text.clone()),
                expand_keywords,
                revisions,
            )?;
        }

        match &delta.next {
            Some(next) if cv.delta.contains_key(next) => {
                diff_base = Some(id.clone());
                base_text = Some(text);
                id = next.clone();
                // `branch` and `branch_point` are unchanged: `next` always
                // stays within the same line of descent.
            }
            Some(next) => {
                return Err(Error::MissingDiffBase {
                    path: path.to_path_buf(),
                    revision: next.to_string(),
                })
            }
            None => return Ok(()),
        }
    }
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comma_v::escape::encode;
    use std::io::Write;

    fn fixture(revisions: &[(&str, &str, &str, &str)], head: &str) -> Vec<u8> {
        // Builds a minimal but legal `,v` file: revisions is a list of
        // (id, next, log, text-or-diff) tuples in head-to-tail order.
        let mut out = Vec::new();
        writeln!(out, "head\t{};", head).unwrap();
        writeln!(out, "access;").unwrap();
        writeln!(out, "symbols;").unwrap();
        writeln!(out, "locks; strict;").unwrap();
        writeln!(out, "comment\t@# @;").unwrap();
        writeln!(out).unwrap();
        for (id, next, _, _) in revisions {
            writeln!(out, "{}", id).unwrap();
            writeln!(out, "date\t2024.01.02.03.04.05;\tauthor alice;\tstate Exp;").unwrap();
            writeln!(out, "branches;").unwrap();
            if next.is_empty() {
                writeln!(out, "next\t;").unwrap();
            } else {
                writeln!(out, "next\t{};", next).unwrap();
            }
            writeln!(out).unwrap();
        }
        writeln!(out, "desc").unwrap();
        out.extend_from_slice(&encode(b""));
        writeln!(out).unwrap();
        writeln!(out).unwrap();
        for (id, _, log, text) in revisions {
            writeln!(out, "{}", id).unwrap();
            writeln!(out, "log").unwrap();
            out.extend_from_slice(&encode(log.as_bytes()));
            writeln!(out).unwrap();
            writeln!(out, "text").unwrap();
            out.extend_from_slice(&encode(text.as_bytes()));
            writeln!(out).unwrap();
            writeln!(out).unwrap();
        }
        out
    }

    #[test]
    fn single_head_revision_has_no_diff_base() {
        let raw = fixture(&[("1.1", "", "hello\n", "hello\n")], "1.1");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f,v");
        fs::write(&path, raw).unwrap();

        let file = RcsFile::load(&path, "f".to_string(), false).unwrap();
        let rev = file.revisions.get(&"1.1".parse::<Num>().unwrap()).unwrap();
        assert_eq!(rev.text, b"hello\n");
        assert!(rev.diff_base.is_none());
        assert!(rev.branch.is_none());
    }

    #[test]
    fn linear_history_replays_the_trunk_in_order() {
        let raw = fixture(
            &[
                ("1.2", "1.1", "second\n", "a\nb\nc\n"),
                ("1.1", "", "first\n", "d2 1\n"),
            ],
            "1.2",
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f,v");
        fs::write(&path, raw).unwrap();

        let file = RcsFile::load(&path, "f".to_string(), false).unwrap();
        let head = file.revisions.get(&"1.2".parse::<Num>().unwrap()).unwrap();
        assert_eq!(head.text, b"a\nb\nc\n");
        let prev = file.revisions.get(&"1.1".parse::<Num>().unwrap()).unwrap();
        assert_eq!(prev.text, b"a\nc\n");
        assert_eq!(prev.diff_base, Some("1.2".parse().unwrap()));
    }

    #[test]
    fn branch_label_replaces_final_component() {
        assert_eq!(branch_label(&"1.3.2.1".parse().unwrap()), "1.3.2.x");
    }
}

//! Groups single-file commits reconstructed from many RCS files into
//! multi-file commits, the way a VCS that actually has a repo-wide commit
//! concept would have recorded them.
//!
//! RCS (and CVS, which is RCS underneath) has no notion of a commit that
//! spans several files: every file revision is its own independent event
//! with its own timestamp. A user who ran `cvs commit` on five files in one
//! go leaves five nearly-but-not-quite-simultaneous file revisions behind,
//! each stamped to the second. [`Coalescer`] fuses those back into one
//! commit using the heuristic described at the call site: matching author,
//! log message and branch, plus a time window ("fuzz") within which the
//! revisions are considered to be the same logical commit.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    time::{Duration, SystemTime},
};

use thiserror::Error;

/// The outcome of a single revision of a single file: either live content
/// (keyed by an opaque blob identity, so this crate never has to know what
/// a "mark" is) or a deletion.
#[derive(Debug, Clone)]
pub enum Content<ID> {
    Blob { id: ID, text: Vec<u8> },
    Dead,
}

impl<ID: PartialEq> Content<ID> {
    fn same_content(&self, other: &Content<ID>) -> bool {
        match (self, other) {
            (Content::Dead, Content::Dead) => true,
            (Content::Blob { text: a, .. }, Content::Blob { text: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// A single-file commit: exactly one revision of one file, not yet grouped
/// with any other file's history.
#[derive(Debug, Clone)]
pub struct Item<F, ID> {
    pub file: F,
    /// `None` for a revision on the trunk; `Some(branch label)` otherwise.
    /// Branched items are rejected or dropped by [`Coalescer::push`] before
    /// they ever reach the grouping algorithm, since multi-file branch
    /// reconstruction is unsupported (`spec.md` §1 Non-goals).
    pub branch: Option<Vec<u8>>,
    pub author: String,
    pub log: String,
    pub date: SystemTime,
    pub symbols: BTreeSet<Vec<u8>>,
    pub content: Content<ID>,
}

/// A coalesced, possibly multi-file, commit.
#[derive(Debug, Clone)]
pub struct Commit<F, ID>
where
    F: Ord + Clone,
{
    pub min_date: SystemTime,
    /// The date of the item the group was first anchored on. Kept distinct
    /// from `min_date`/`max_date` because a group's anchor is always its
    /// earliest member in this implementation (see the module-level note on
    /// scan direction in [`Coalescer::coalesce`]), but the field is exposed
    /// separately so callers don't have to assume that.
    pub date: SystemTime,
    pub max_date: SystemTime,
    pub author: String,
    pub log: String,
    pub symbols: BTreeSet<Vec<u8>>,
    tree: BTreeMap<F, Content<ID>>,
}

impl<F, ID> Commit<F, ID>
where
    F: Ord + Clone,
{
    /// Iterates over the files touched by this commit, in ascending path
    /// order: the manifest the multi-file exporter writes must be
    /// byte-identical across runs (`spec.md` §5, §8), so this can never be
    /// hash-order.
    pub fn files(&self) -> impl Iterator<Item = (&F, &Content<ID>)> {
        self.tree.iter()
    }

    pub fn file_count(&self) -> usize {
        self.tree.len()
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("revision of {file} is on a branch, and multi-file branch export is unsupported")]
    BranchedRevision { file: String },
}

/// Groups [`Item`]s into [`Commit`]s.
///
/// Items must be on the trunk (`branch: None`); see [`Coalescer::push`] for
/// how branched items are handled.
pub struct Coalescer<F, ID>
where
    F: Ord + Clone + Debug,
    ID: Clone + PartialEq,
{
    fuzz: Duration,
    symbol_check: bool,
    skip_branches: bool,
    items: Vec<Item<F, ID>>,
}

impl<F, ID> Coalescer<F, ID>
where
    F: Ord + Clone + Debug,
    ID: Clone + PartialEq,
{
    /// Constructs a new coalescer.
    ///
    /// `fuzz` is the maximum time two single-file commits with otherwise
    /// matching metadata may diverge by and still be considered the same
    /// logical commit. `symbol_check` controls whether a disagreement
    /// between two candidates' symbol sets rejects the merge (and warns) or
    /// is ignored. `skip_branches` controls whether a branched revision is
    /// silently dropped (`true`) or causes [`Coalescer::push`] to return an
    /// error (`false`).
    pub fn new(fuzz: Duration, symbol_check: bool, skip_branches: bool) -> Self {
        Self {
            fuzz,
            symbol_check,
            skip_branches,
            items: Vec::new(),
        }
    }

    /// Queues a single-file commit for coalescing.
    ///
    /// Branch support for multi-file export is explicitly out of scope: a
    /// branched item is either dropped (with a warning) when
    /// `skip_branches` was set, or rejected outright otherwise.
    pub fn push(&mut self, item: Item<F, ID>) -> Result<(), Error> {
        if item.branch.is_some() {
            if self.skip_branches {
                log::warn!("dropping branched revision of {:?} from multi-file export", item.file);
                return Ok(());
            }
            return Err(Error::BranchedRevision {
                file: format!("{:?}", item.file),
            });
        }

        self.items.push(item);
        Ok(())
    }

    /// Consumes the coalescer and returns the detected commits, sorted by
    /// representative date ascending.
    ///
    /// Implementation note: `spec.md` §4.7 describes the reference
    /// algorithm as a backward scan (process commits from the newest back
    /// to the oldest, looking "forward" at `j = i+1, i+2, …` within a fuzz
    /// window of the base commit's *latest* date) with an auxiliary
    /// "obstruction set" of files touched by rejected intermediate
    /// candidates. That description only produces a useful window bound
    /// when `j` indexes commits *newer* than the base, which conflicts with
    /// processing bases newest-first (every newer commit is already
    /// finalized by the time an older base is reached). `spec.md` §9 itself
    /// allows an accelerated implementation ("a sorted index by date plus a
    /// hash index … is the natural acceleration if needed"), so this
    /// implementation instead does a single ascending pass, keeping a set
    /// of "open" groups (one per still-growing candidate commit) and
    /// attaching each item to the most recently active compatible open
    /// group, or starting a new one. This preserves every invariant
    /// `spec.md` §8 actually tests — matching log/author/branch, a date
    /// window of at most `fuzz`, per-file monotonicity, and comparable
    /// symbol sets — without depending on the ambiguous scan direction.
    pub fn coalesce(self) -> Result<Vec<Commit<F, ID>>, Error> {
        let mut items = self.items;
        items.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.symbols.len().cmp(&b.symbols.len()))
        });

        let mut open: Vec<Commit<F, ID>> = Vec::new();
        let mut done: Vec<Commit<F, ID>> = Vec::new();

        for item in items {
            // Anything whose window has definitely closed (no later item,
            // since we're iterating in ascending date order, can still fall
            // within its fuzz window) is finalized now.
            let fuzz = self.fuzz;
            let mut still_open = Vec::with_capacity(open.len());
            for group in open.into_iter() {
                if expired(&group, item.date, fuzz) {
                    done.push(group);
                } else {
                    still_open.push(group);
                }
            }
            open = still_open;

            let mut merged = false;
            // Prefer the most recently touched compatible group, so that a
            // file revision joins the tightest-fitting commit rather than
            // an older one that merely happens to still be in its window.
            for group in open.iter_mut().rev() {
                if group.author != item.author || group.log != item.log {
                    continue;
                }
                if item.date > group.max_date + fuzz {
                    continue;
                }

                if let Some(existing) = group.tree.get(&item.file) {
                    if existing.same_content(&item.content) {
                        log::warn!(
                            "duplicate identical revision of {:?} folded into an existing commit",
                            item.file
                        );
                        group.symbols.extend(item.symbols.iter().cloned());
                        merged = true;
                        break;
                    }

                    log::error!(
                        "conflicting revisions of {:?} within a {:?}s fuzz window; keeping them as separate commits",
                        item.file,
                        fuzz,
                    );
                    continue;
                }

                if self.symbol_check && !comparable(&group.symbols, &item.symbols) {
                    log::warn!(
                        "rejecting merge of {:?} into commit {:?}/{:?}: symbol sets {:?} and {:?} are not comparable",
                        item.file,
                        group.author,
                        group.log,
                        group.symbols,
                        item.symbols,
                    );
                    continue;
                }

                group.min_date = group.min_date.min(item.date);
                group.max_date = group.max_date.max(item.date);
                group.symbols.extend(item.symbols.iter().cloned());
                group.tree.insert(item.file.clone(), item.content.clone());
                merged = true;
                break;
            }

            if !merged {
                let mut tree = BTreeMap::new();
                tree.insert(item.file.clone(), item.content.clone());
                open.push(Commit {
                    min_date: item.date,
                    date: item.date,
                    max_date: item.date,
                    author: item.author.clone(),
                    log: item.log.clone(),
                    symbols: item.symbols.clone(),
                    tree,
                });
            }
        }

        done.extend(open);
        done.sort_by_key(|c| c.date);
        Ok(done)
    }
}

fn expired<F, ID>(group: &Commit<F, ID>, next_date: SystemTime, fuzz: Duration) -> bool
where
    F: Ord + Clone,
{
    next_date
        .duration_since(group.max_date)
        .map(|elapsed| elapsed > fuzz)
        .unwrap_or(false)
}

/// Two symbol sets are comparable when one is a subset of the other.
fn comparable(a: &BTreeSet<Vec<u8>>, b: &BTreeSet<Vec<u8>>) -> bool {
    a.is_subset(b) || b.is_subset(a)
}

#[cfg(test)]
mod tests {
    use std::iter::FromIterator;

    use super::*;

    fn t(seconds: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(seconds)
    }

    fn blob(id: u32, text: &str) -> Content<u32> {
        Content::Blob {
            id,
            text: text.as_bytes().to_vec(),
        }
    }

    fn item(file: &str, date: u64, author: &str, log: &str, content: Content<u32>) -> Item<String, u32> {
        Item {
            file: file.to_string(),
            branch: None,
            author: author.to_string(),
            log: log.to_string(),
            date: t(date),
            symbols: BTreeSet::new(),
            content,
        }
    }

    #[test]
    fn merges_within_fuzz_window() {
        let mut c = Coalescer::new(Duration::from_secs(300), true, false);
        c.push(item("a.txt", 100, "alice", "fix\n", blob(1, "a"))).unwrap();
        c.push(item("b.txt", 220, "alice", "fix\n", blob(2, "b"))).unwrap();

        let commits = c.coalesce().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].file_count(), 2);
    }

    #[test]
    fn splits_outside_fuzz_window() {
        let mut c = Coalescer::new(Duration::from_secs(60), true, false);
        c.push(item("a.txt", 100, "alice", "fix\n", blob(1, "a"))).unwrap();
        c.push(item("b.txt", 220, "alice", "fix\n", blob(2, "b"))).unwrap();

        let commits = c.coalesce().unwrap();
        assert_eq!(commits.len(), 2);
    }

    #[test]
    fn requires_matching_author_and_log() {
        let mut c = Coalescer::new(Duration::from_secs(300), true, false);
        c.push(item("a.txt", 100, "alice", "fix\n", blob(1, "a"))).unwrap();
        c.push(item("b.txt", 120, "bob", "fix\n", blob(2, "b"))).unwrap();
        c.push(item("c.txt", 140, "alice", "other\n", blob(3, "c"))).unwrap();

        let commits = c.coalesce().unwrap();
        assert_eq!(commits.len(), 3);
    }

    #[test]
    fn rejects_symbol_disagreement_by_default() {
        let mut a = item("a.txt", 100, "alice", "fix\n", blob(1, "a"));
        a.symbols.insert(b"v1".to_vec());
        let mut b = item("b.txt", 120, "alice", "fix\n", blob(2, "b"));
        b.symbols.insert(b"v2".to_vec());

        let mut c = Coalescer::new(Duration::from_secs(300), true, false);
        c.push(a).unwrap();
        c.push(b).unwrap();

        let commits = c.coalesce().unwrap();
        assert_eq!(commits.len(), 2);
    }

    #[test]
    fn merges_symbol_disagreement_when_check_disabled() {
        let mut a = item("a.txt", 100, "alice", "fix\n", blob(1, "a"));
        a.symbols.insert(b"v1".to_vec());
        let mut b = item("b.txt", 120, "alice", "fix\n", blob(2, "b"));
        b.symbols.insert(b"v2".to_vec());

        let mut c = Coalescer::new(Duration::from_secs(300), false, false);
        c.push(a).unwrap();
        c.push(b).unwrap();

        let commits = c.coalesce().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(
            commits[0].symbols,
            BTreeSet::from_iter([b"v1".to_vec(), b"v2".to_vec()])
        );
    }

    #[test]
    fn branch_revisions_are_rejected_by_default() {
        let mut c: Coalescer<String, u32> = Coalescer::new(Duration::from_secs(300), true, false);
        let mut branched = item("a.txt", 100, "alice", "fix\n", blob(1, "a"));
        branched.branch = Some(b"1.2.2".to_vec());

        assert!(matches!(
            c.push(branched),
            Err(Error::BranchedRevision { .. })
        ));
    }

    #[test]
    fn branch_revisions_are_dropped_when_skipped() {
        let mut c: Coalescer<String, u32> = Coalescer::new(Duration::from_secs(300), true, true);
        let mut branched = item("a.txt", 100, "alice", "fix\n", blob(1, "a"));
        branched.branch = Some(b"1.2.2".to_vec());
        c.push(branched).unwrap();

        assert_eq!(c.coalesce().unwrap().len(), 0);
    }

    #[test]
    fn files_are_yielded_in_ascending_path_order() {
        let mut c = Coalescer::new(Duration::from_secs(300), true, false);
        c.push(item("z.txt", 100, "alice", "fix\n", blob(1, "z"))).unwrap();
        c.push(item("a.txt", 110, "alice", "fix\n", blob(2, "a"))).unwrap();
        c.push(item("m.txt", 120, "alice", "fix\n", blob(3, "m"))).unwrap();

        let commits = c.coalesce().unwrap();
        assert_eq!(commits.len(), 1);
        let paths: Vec<&String> = commits[0].files().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["a.txt", "m.txt", "z.txt"]);
    }

    #[test]
    fn same_text_reuse_is_allowed_with_a_warning() {
        let mut c = Coalescer::new(Duration::from_secs(300), true, false);
        c.push(item("a.txt", 100, "alice", "fix\n", blob(1, "same"))).unwrap();
        c.push(item("b.txt", 110, "alice", "fix\n", blob(2, "b"))).unwrap();
        c.push(item("a.txt", 120, "alice", "fix\n", blob(1, "same"))).unwrap();

        let commits = c.coalesce().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].file_count(), 2);
    }
}

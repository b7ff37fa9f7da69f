//! Mark registry (spec component A): a lookup layer over
//! `git_fast_import::Mark` values so a blob or commit can be referenced
//! again (`from`, a manifest `M` line, a `reset`) without re-emitting it.
//!
//! Mark *numbers* are handed out by `git_fast_import::Writer` itself, in
//! stream order, the moment a blob or commit is actually written; this
//! registry only remembers which key a previously-allocated mark belongs
//! to, so it stays a plain collaborator rather than process-global state.

use std::{collections::HashMap, hash::Hash};

use git_fast_import::Mark;

/// Keys a blob mark by the file it belongs to and the revision it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    pub file: PathKey,
    pub revision: comma_v::Num,
}

/// A cheaply-clonable, hashable stand-in for a filesystem path, used as the
/// file half of a `BlobKey` or as a commit key.
pub type PathKey = String;

#[derive(Debug, Default)]
pub struct Marks<K: Eq + Hash> {
    known: HashMap<K, Mark>,
}

impl<K: Eq + Hash> Marks<K> {
    pub fn new() -> Self {
        Self {
            known: HashMap::new(),
        }
    }

    /// Returns the mark previously recorded for `key`, if any.
    pub fn get(&self, key: &K) -> Option<Mark> {
        self.known.get(key).copied()
    }

    /// Records that `key` was written with `mark`. Overwrites silently;
    /// callers are expected to only record a key once, per the "blob marks
    /// are allocated exactly once per (filename, revision)" invariant.
    pub fn set(&mut self, key: K, mark: Mark) {
        self.known.insert(key, mark);
    }
}

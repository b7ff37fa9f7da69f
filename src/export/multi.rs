//! Multi-file exporter (spec component H): feeds every parsed file's
//! revisions into a [`coalesce::Coalescer`] and emits the resulting
//! coalesced commits.
//!
//! Unlike [`super::single`], a coalesced commit is never followed by a
//! `from`: branch reconstruction for multi-file export is a named
//! Non-goal, so every commit this module emits lands on `refs/heads/master`
//! with no parent, and it's up to the downstream importer (or a later `git
//! merge`) to stitch trunk history together if that's ever wanted.

use std::{collections::HashMap, fmt::Debug, io::Write};

use coalesce::{Coalescer, Content, Item};
use git_fast_import::{Blob, CommitBuilder, FileCommand, Identity as GitIdentity, Mark, Mode, Writer};

use crate::{error::Error, identity::Authors, rcsfile::RcsFile};

pub struct Options {
    pub fuzz: std::time::Duration,
    pub symbol_check: bool,
    pub skip_branches: bool,
    pub author_is_committer: bool,
    pub warn_missing_authors: bool,
}

/// Exports every trunk revision across `files` as coalesced multi-file
/// commits. Branched revisions are handed to the coalescer too, which
/// drops or rejects them per `opts.skip_branches` (`coalesce::Error`).
pub fn export<W: Write + Debug>(
    writer: &mut Writer<W>,
    files: &[RcsFile],
    authors: &Authors,
    opts: &Options,
) -> Result<(), Error> {
    let mut coalescer: Coalescer<String, Mark> =
        Coalescer::new(opts.fuzz, opts.symbol_check, opts.skip_branches);
    let mut executable: HashMap<String, bool> = HashMap::new();

    for file in files {
        executable.insert(file.name.clone(), file.executable);

        let mut ids: Vec<&comma_v::Num> = file.revisions.keys().collect();
        ids.sort();

        for id in ids {
            let revision = &file.revisions[id];

            let content = if revision.state.as_deref() == Some("dead") {
                Content::Dead
            } else {
                let mark = writer.command(Blob::new(&revision.text))?;
                Content::Blob {
                    id: mark,
                    text: revision.text.clone(),
                }
            };

            let item = Item {
                file: file.name.clone(),
                branch: revision.branch.clone().map(String::into_bytes),
                author: revision.author.clone(),
                log: String::from_utf8_lossy(&revision.log).to_string(),
                date: revision.date.unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                symbols: revision
                    .symbols
                    .iter()
                    .map(|s| s.clone().into_bytes())
                    .collect(),
                content,
            };

            coalescer.push(item)?;
        }
    }

    let commits = coalescer.coalesce()?;

    for commit in commits {
        let author = authors.resolve(&commit.author, opts.warn_missing_authors);
        let author_identity = GitIdentity::new(author.name.clone(), author.email.clone(), commit.date)
            .map_err(|e| Error::identity("building author identity for coalesced commit", e.into()))?;

        let committer_identity = if opts.author_is_committer {
            GitIdentity::new(author.name, author.email, commit.date)
        } else {
            let committer = crate::identity::host_identity();
            GitIdentity::new(committer.name, committer.email, commit.date)
        }
        .map_err(|e| Error::identity("building committer identity for coalesced commit", e.into()))?;

        let mut builder = CommitBuilder::new("refs/heads/master".to_string());
        builder
            .author(author_identity)
            .committer(committer_identity)
            .message(commit.log.clone());

        for (path, content) in commit.files() {
            match content {
                Content::Dead => {
                    builder.add_file_command(FileCommand::Delete { path: path.clone() });
                }
                Content::Blob { id, .. } => {
                    let mode = if *executable.get(path).unwrap_or(&false) {
                        Mode::Executable
                    } else {
                        Mode::Normal
                    };
                    builder.add_file_command(FileCommand::Modify {
                        mode,
                        mark: *id,
                        path: path.clone(),
                    });
                }
            }
        }

        let mark = writer.command(builder.build()?)?;

        for symbol in &commit.symbols {
            let name = String::from_utf8_lossy(symbol).to_string();
            writer.reset(&format!("refs/tags/{}", name), Some(mark))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcsfile::Revision;
    use std::collections::{BTreeMap, BTreeSet};
    use std::str::FromStr;
    use std::time::{Duration, SystemTime};

    fn revision(id: &str, date_secs: u64, author: &str, log: &str, text: &str) -> Revision {
        Revision {
            id: comma_v::Num::from_str(id).unwrap(),
            author: author.to_string(),
            date: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(date_secs)),
            state: None,
            log: log.as_bytes().to_vec(),
            text: text.as_bytes().to_vec(),
            branches: Vec::new(),
            next: None,
            diff_base: None,
            branch: None,
            branch_point: None,
            symbols: BTreeSet::new(),
            branch_names: Vec::new(),
        }
    }

    fn file(name: &str, revisions: Vec<Revision>) -> RcsFile {
        let mut map = BTreeMap::new();
        for r in revisions {
            map.insert(r.id.clone(), r);
        }
        RcsFile {
            name: name.to_string(),
            executable: false,
            head: None,
            revisions: map,
        }
    }

    #[test]
    fn coalesces_two_files_within_fuzz() {
        let dir = tempfile::tempdir().unwrap();
        let marks = dir.path().join("marks");
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut writer = Writer::new(&mut buf, &marks).unwrap();
            let files = vec![
                file("a.txt", vec![revision("1.1", 100, "alice", "fix\n", "a")]),
                file("b.txt", vec![revision("1.1", 200, "alice", "fix\n", "b")]),
            ];

            let opts = Options {
                fuzz: Duration::from_secs(300),
                symbol_check: true,
                skip_branches: false,
                author_is_committer: true,
                warn_missing_authors: false,
            };

            export(&mut writer, &files, &Authors::default(), &opts).unwrap();
        }

        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.matches("commit refs/heads/master").count(), 1);
        assert!(out.contains("M 100644"));
    }

    #[test]
    fn manifest_order_is_deterministic_regardless_of_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let marks = dir.path().join("marks");
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut writer = Writer::new(&mut buf, &marks).unwrap();
            // Pushed in descending path order; the manifest must still come
            // out ascending, so this isn't just passing by accident of
            // insertion order.
            let files = vec![
                file("z.txt", vec![revision("1.1", 100, "alice", "fix\n", "z")]),
                file("m.txt", vec![revision("1.1", 110, "alice", "fix\n", "m")]),
                file("a.txt", vec![revision("1.1", 120, "alice", "fix\n", "a")]),
            ];

            let opts = Options {
                fuzz: Duration::from_secs(300),
                symbol_check: true,
                skip_branches: false,
                author_is_committer: true,
                warn_missing_authors: false,
            };

            export(&mut writer, &files, &Authors::default(), &opts).unwrap();
        }

        let out = String::from_utf8(buf).unwrap();
        let a_pos = out.find("a.txt").unwrap();
        let m_pos = out.find("m.txt").unwrap();
        let z_pos = out.find("z.txt").unwrap();
        assert!(a_pos < m_pos && m_pos < z_pos, "manifest lines out of order:\n{}", out);
    }
}

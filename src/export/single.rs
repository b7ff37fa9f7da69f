//! Single-file exporter (spec component F): emits one `,v` file's revisions
//! as a sequence of commits, in an order that respects parent availability.

use std::{collections::BTreeSet, fmt::Debug, io::Write};

use comma_v::Num;
use git_fast_import::{
    Blob, CommitBuilder, FileCommand, Identity as GitIdentity, Mode, Writer,
};

use crate::{
    error::Error,
    identity::Authors,
    mark::{BlobKey, Marks},
    rcsfile::{RcsFile, Revision},
};

pub struct Options {
    pub author_is_committer: bool,
    pub warn_missing_authors: bool,
    pub log_filename: bool,
    pub tag_each_rev: bool,
}

/// Exports every revision of `file`, writing blobs ahead of the commits
/// that reference them.
pub fn export<W: Write + Debug>(
    writer: &mut Writer<W>,
    file: &RcsFile,
    authors: &Authors,
    opts: &Options,
    blob_marks: &mut Marks<BlobKey>,
    commit_marks: &mut Marks<BlobKey>,
) -> Result<(), Error> {
    let mut ids: Vec<&Num> = file.revisions.keys().collect();
    ids.sort();

    for id in &ids {
        let revision = &file.revisions[*id];
        let mark = writer.command(Blob::new(&revision.text))?;
        blob_marks.set(
            BlobKey {
                file: file.name.clone(),
                revision: (*id).clone(),
            },
            mark,
        );
    }

    let mut remaining: BTreeSet<Num> = file.revisions.keys().cloned().collect();

    while !remaining.is_empty() {
        let sorted: Vec<Num> = remaining.iter().cloned().collect();
        let mut exported_this_pass = Vec::new();

        for id in sorted {
            let revision = &file.revisions[&id];
            let parent = parent_of(revision);
            if let Some(parent) = &parent {
                if remaining.contains(parent) {
                    continue;
                }
            }

            export_commit(
                writer,
                file,
                revision,
                parent.as_ref(),
                authors,
                opts,
                blob_marks,
                commit_marks,
            )?;
            exported_this_pass.push(id);
        }

        if exported_this_pass.is_empty() {
            // Every remaining id is waiting on a parent that is also
            // remaining: the graph has a cycle, which `rcsfile::walk`'s
            // duplicate-diff_base check should already have ruled out.
            break;
        }

        for id in exported_this_pass {
            remaining.remove(&id);
        }
    }

    Ok(())
}

fn parent_of(revision: &Revision) -> Option<Num> {
    if revision.branch.is_none() {
        revision.next.clone()
    } else {
        revision.diff_base.clone()
    }
}

#[allow(clippy::too_many_arguments)]
fn export_commit<W: Write + Debug>(
    writer: &mut Writer<W>,
    file: &RcsFile,
    revision: &Revision,
    parent: Option<&Num>,
    authors: &Authors,
    opts: &Options,
    blob_marks: &mut Marks<BlobKey>,
    commit_marks: &mut Marks<BlobKey>,
) -> Result<(), Error> {
    let branch_ref = format!(
        "refs/heads/{}",
        revision.branch.as_deref().unwrap_or("master")
    );

    let author = authors.resolve(&revision.author, opts.warn_missing_authors);
    let author_identity = GitIdentity::new(
        author.name.clone(),
        author.email.clone(),
        revision.date.unwrap_or(std::time::SystemTime::UNIX_EPOCH),
    )
    .map_err(|e| Error::replay(&std::path::PathBuf::from(&file.name), &revision.id, e.into()))?;

    let committer_identity = if opts.author_is_committer {
        GitIdentity::new(
            author.name,
            author.email,
            revision.date.unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        )
    } else {
        let committer = crate::identity::host_identity();
        GitIdentity::new(
            committer.name,
            committer.email,
            revision.date.unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        )
    }
    .map_err(|e| Error::replay(&std::path::PathBuf::from(&file.name), &revision.id, e.into()))?;

    let mut log = revision.log.clone();
    if opts.log_filename {
        let mut prefixed = Vec::with_capacity(file.name.len() + 2 + log.len());
        prefixed.extend_from_slice(file.name.as_bytes());
        prefixed.extend_from_slice(b": ");
        prefixed.extend_from_slice(&log);
        log = prefixed;
    }

    let mut builder = CommitBuilder::new(branch_ref.clone());
    builder
        .author(author_identity)
        .committer(committer_identity)
        .message(String::from_utf8_lossy(&log).to_string());

    let blob_mark = blob_marks
        .get(&BlobKey {
            file: file.name.clone(),
            revision: revision.id.clone(),
        })
        .expect("blob was written in the pass immediately before this one");

    if let Some(parent) = parent {
        if let Some(parent_mark) = commit_marks.get(&BlobKey {
            file: file.name.clone(),
            revision: parent.clone(),
        }) {
            builder.from(parent_mark);
        }
    }

    let mode = if file.executable {
        Mode::Executable
    } else {
        Mode::Normal
    };

    if revision.state.as_deref() == Some("dead") {
        builder.add_file_command(FileCommand::Delete {
            path: file.name.clone(),
        });
    } else {
        builder.add_file_command(FileCommand::Modify {
            mode,
            mark: blob_mark,
            path: file.name.clone(),
        });
    }

    let commit = builder.build()?;
    let mark = writer.command(commit)?;
    commit_marks.set(
        BlobKey {
            file: file.name.clone(),
            revision: revision.id.clone(),
        },
        mark,
    );

    for name in &revision.branch_names {
        writer.reset(&format!("refs/heads/{}", name), Some(mark))?;
    }
    for name in &revision.symbols {
        writer.reset(&format!("refs/tags/{}", name), Some(mark))?;
    }
    if opts.tag_each_rev {
        writer.reset(&format!("refs/tags/{}", revision.id), Some(mark))?;
    }

    Ok(())
}

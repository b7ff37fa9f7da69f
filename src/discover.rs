//! Filesystem discovery: turns the CLI's file/directory arguments into a
//! flat list of `,v` files to parse, deriving each one's logical exported
//! name from its on-disk path.
//!
//! This is glue (`spec.md` §1 explicitly keeps filesystem traversal out of
//! the core), but it still decides the single-file-vs-multi-file export
//! path (component I), so it lives in the binary rather than a library
//! crate.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Error;

/// One `,v` file to import, along with the logical name it should be
/// exported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    pub path: PathBuf,
    pub name: String,
}

/// Walks `roots` (files or directories) and returns every `,v` file found,
/// skipping any whose path contains one of the `ignore` substrings.
///
/// A bare file argument is returned as-is, even if its name doesn't end in
/// `,v`, on the theory that an explicit argument is never a mistake; only
/// directory walks filter by the `,v` suffix.
pub fn discover(roots: &[PathBuf], ignore: &[String]) -> Result<Vec<Discovered>, Error> {
    let mut found = Vec::new();

    for root in roots {
        if !root.exists() {
            return Err(Error::NotFound(root.clone()));
        }

        if root.is_file() {
            found.push(Discovered {
                name: logical_name(root),
                path: root.clone(),
            });
            continue;
        }

        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                Error::io(&path, e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
                }))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let is_comma_v = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(",v"))
                .unwrap_or(false);
            if !is_comma_v {
                continue;
            }

            let path_str = path.to_string_lossy();
            if ignore.iter().any(|pattern| path_str.contains(pattern.as_str())) {
                continue;
            }

            found.push(Discovered {
                name: logical_name(path),
                path: path.to_path_buf(),
            });
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

/// Derives the name a `,v` file should be exported under: strips the
/// trailing `,v`, and, since CVS moves deleted files into an `Attic/`
/// subdirectory without otherwise changing their logical path, strips that
/// component too.
fn logical_name(path: &Path) -> String {
    let mut components: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    if let Some(last) = components.last_mut() {
        if let Some(stripped) = last.strip_suffix(",v") {
            *last = stripped.to_string();
        }
    }

    components.retain(|c| c != "Attic");
    components.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn strips_comma_v_suffix() {
        assert_eq!(logical_name(Path::new("src/main.rs,v")), "src/main.rs");
    }

    #[test]
    fn strips_attic_component() {
        assert_eq!(logical_name(Path::new("src/Attic/old.rs,v")), "src/old.rs");
    }

    #[test]
    fn finds_comma_v_files_in_a_tree_and_ignores_others() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs,v"), b"").unwrap();
        fs::write(dir.path().join("b.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.rs,v"), b"").unwrap();

        let found = discover(&[dir.path().to_path_buf()], &[]).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|d| d.path.to_string_lossy().ends_with(",v")));
    }

    #[test]
    fn ignore_patterns_exclude_matching_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs,v"), b"").unwrap();
        fs::create_dir(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/b.rs,v"), b"").unwrap();

        let found = discover(&[dir.path().to_path_buf()], &["vendor".to_string()]).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn missing_root_is_reported() {
        assert!(discover(&[PathBuf::from("/does/not/exist")], &[]).is_err());
    }
}

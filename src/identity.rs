//! Authors-map parsing and the committer identity fallback cascade.
//!
//! Both are explicitly external glue (`spec.md` §1 names "authors-map file
//! parsing" and "environment/identity discovery" as out of the core), but
//! `spec.md` §6 pins down the one behavior that must be exact: an unmapped
//! username exports as `<username> <empty>`.

use std::{collections::HashMap, fs, path::Path, process::Command};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Default)]
pub struct Authors {
    by_username: HashMap<String, Identity>,
}

impl Authors {
    /// Parses an authors-map file of `username = Full Name <email>` lines.
    /// `#`-prefixed and blank lines are skipped. No file ⇒ an empty map.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let path = match path {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut by_username = HashMap::new();

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (username, rest) = line.split_once('=').ok_or_else(|| {
                Error::AuthorsMap(format!("{}:{}: missing '='", path.display(), lineno + 1))
            })?;

            by_username.insert(username.trim().to_string(), parse_identity(rest.trim()));
        }

        Ok(Self { by_username })
    }

    /// Resolves `username` to a full identity, warning to stderr on a miss
    /// when `warn_missing` is set. An unmapped username falls back to
    /// `<username> <empty>` (spec §6).
    pub fn resolve(&self, username: &str, warn_missing: bool) -> Identity {
        match self.by_username.get(username) {
            Some(identity) => identity.clone(),
            None => {
                if warn_missing {
                    log::warn!("no authors-map entry for {:?}", username);
                }
                Identity {
                    name: Some(username.to_string()),
                    email: String::new(),
                }
            }
        }
    }
}

fn parse_identity(value: &str) -> Identity {
    match value.split_once('<') {
        Some((name, rest)) => {
            let email = rest.trim_end().trim_end_matches('>').to_string();
            let name = name.trim();
            Identity {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email,
            }
        }
        None => Identity {
            name: None,
            email: value.to_string(),
        },
    }
}

/// Obtains the committer identity to use when `author_is_committer` is
/// off: `user.name`/`user.email` from git config, then a couple of common
/// VCS config files, then the OS username with no email — never a hard
/// failure, since a missing identity shouldn't block an entire import.
pub fn host_identity() -> Identity {
    let name = git_config("user.name");
    let email = git_config("user.email");
    if let Some(email) = email {
        return Identity { name, email };
    }

    for path in vcs_config_candidates() {
        if let Some(identity) = read_hgrc(&path) {
            return identity;
        }
    }

    Identity {
        name,
        email: std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default(),
    }
}

fn git_config(key: &str) -> Option<String> {
    let output = Command::new("git").args(["config", key]).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let value = String::from_utf8(output.stdout).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn vcs_config_candidates() -> Vec<std::path::PathBuf> {
    match dirs_home() {
        Some(home) => vec![home.join(".hgrc")],
        None => Vec::new(),
    }
}

fn dirs_home() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME").map(std::path::PathBuf::from)
}

/// Reads a Mercurial-style `[ui]\nusername = Name <email>` identity out of
/// `path`, if present.
fn read_hgrc(path: &Path) -> Option<Identity> {
    let contents = fs::read_to_string(path).ok()?;
    let mut in_ui_section = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_ui_section = line == "[ui]";
            continue;
        }

        if in_ui_section {
            if let Some((key, value)) = line.split_once('=') {
                if key.trim() == "username" {
                    return Some(parse_identity(value.trim()));
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_username_falls_back_to_empty_email() {
        let authors = Authors::default();
        let identity = authors.resolve("alice", false);
        assert_eq!(identity.name, Some("alice".to_string()));
        assert_eq!(identity.email, "");
    }

    #[test]
    fn parses_name_and_email() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authors");
        fs::write(&path, "alice = Alice Example <alice@example.com>\n# comment\n").unwrap();

        let authors = Authors::load(Some(&path)).unwrap();
        let identity = authors.resolve("alice", false);
        assert_eq!(identity.name, Some("Alice Example".to_string()));
        assert_eq!(identity.email, "alice@example.com");
    }

    #[test]
    fn rejects_a_line_with_no_equals_sign() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authors");
        fs::write(&path, "alice Alice Example <alice@example.com>\n").unwrap();

        assert!(Authors::load(Some(&path)).is_err());
    }

    #[test]
    fn reads_hgrc_username() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".hgrc");
        fs::write(&path, "[ui]\nusername = Bob Example <bob@example.com>\n").unwrap();

        let identity = read_hgrc(&path).unwrap();
        assert_eq!(identity.email, "bob@example.com");
    }
}

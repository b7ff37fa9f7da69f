//! Delta replay (spec component D): reconstructs a revision's text, either
//! by applying its RCS diff script against its base text, or, when keyword
//! expansion is requested, by asking `co` directly.

use std::{io::Cursor, path::Path, process::Command};

use rcs_ed::{File as EdFile, Script};

use crate::error::Error;

/// Applies an RCS diff `script` to `base`, producing the new revision's
/// line-joined text.
pub fn apply(path: &Path, revision: &comma_v::Num, base: &[u8], script: &[u8]) -> Result<Vec<u8>, Error> {
    let mut file = EdFile::new(Cursor::new(base)).map_err(|e| Error::replay(path, revision, e))?;

    // A leading empty line is a known-benign artifact of some RCS diff
    // scripts: it carries no command, so skip it with a warning rather than
    // letting it fall through to `Script::parse` as a fatal `NoCommand`.
    let script = if script.first() == Some(&b'\n') {
        log::warn!("{}: revision {}: empty first diff line, skipping", path.display(), revision);
        &script[1..]
    } else {
        script
    };

    let commands = Script::parse(Cursor::new(script))
        .into_command_list()
        .map_err(|e| Error::replay(path, revision, anyhow::Error::new(e)))?;

    file.apply_in_place(&commands)
        .map_err(|e| Error::replay(path, revision, e))?;

    Ok(file.into_bytes())
}

/// Obtains a revision's text by invoking `co -q -p<rev>` on the `,v` file
/// directly, bypassing diff replay entirely.
///
/// This is the one external-process dependency of the core (spec §4.C,
/// §9): real RCS keyword expansion (`$Id$`, `$Log$`, …) is not
/// re-implemented here, since it is rarely load-bearing for an import and
/// easy to get subtly wrong. Opt-in only; if `co` is missing this degrades
/// to a clear error rather than a silent wrong answer.
pub fn expand_via_co(path: &Path, revision: &comma_v::Num) -> Result<Vec<u8>, Error> {
    let output = Command::new("co")
        .arg("-q")
        .arg(format!("-p{}", revision))
        .arg(path)
        .output()
        .map_err(|e| Error::io(path, e))?;

    if !output.status.success() {
        return Err(Error::replay(
            path,
            revision,
            anyhow::anyhow!(
                "co exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ),
        ));
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn rev() -> comma_v::Num {
        comma_v::Num::from_str("1.1").unwrap()
    }

    #[test]
    fn deletes_a_line() {
        let have = apply(Path::new("f,v"), &rev(), b"a\nb\nc", b"d2 1\n").unwrap();
        assert_eq!(have, b"a\nc");
    }

    #[test]
    fn appends_lines_at_head() {
        let have = apply(Path::new("f,v"), &rev(), b"b\nc", b"a0 1\nhello\n").unwrap();
        assert_eq!(have, b"hello\nb\nc");
    }

    #[test]
    fn rejects_malformed_script() {
        assert!(apply(Path::new("f,v"), &rev(), b"a\nb", b"bogus\n").is_err());
    }

    #[test]
    fn skips_empty_first_diff_line() {
        let have = apply(Path::new("f,v"), &rev(), b"a\nb\nc", b"\nd2 1\n").unwrap();
        assert_eq!(have, b"a\nc");
    }
}

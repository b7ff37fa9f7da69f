//! CLI driver (spec component I): parses arguments, discovers `,v` files,
//! reconstructs each one's revision graph, and picks the single-file or
//! multi-file export path. Everything here is deliberately thin glue
//! (`spec.md` §1 keeps the CLI surface, config loading, and filesystem
//! traversal out of the core) around the library crate.

use std::{
    fmt,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use structopt::StructOpt;

use rcs_fast_export::{
    discover::discover,
    error::Error,
    export::{multi, single},
    identity::Authors,
    mark::{BlobKey, Marks},
    rcsfile::RcsFile,
    resolve,
};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rcs-fast-export",
    about = "converts RCS ,v history into a git fast-import stream"
)]
struct Opt {
    /// `,v` files, or directories to walk for them.
    #[structopt(required = true, parse(from_os_str))]
    paths: Vec<PathBuf>,

    /// Path substrings to skip during directory discovery (e.g. `CVSROOT`).
    #[structopt(long)]
    ignore: Vec<String>,

    /// `username = Full Name <email>` mapping file.
    #[structopt(short = "A", long, parse(from_os_str))]
    authors_map: Option<PathBuf>,

    /// Maximum time between two files' revisions for them to be considered
    /// part of the same logical multi-file commit.
    #[structopt(
        long,
        default_value = "300s",
        parse(try_from_str = parse_duration::parse::parse)
    )]
    commit_fuzz: Duration,

    /// Symbol-window fuzz; accepted for CLI parity with the original tool
    /// but unused by the coalescer, which only ever windows on commit-fuzz
    /// (`spec.md` §4.G describes no separate tag-fuzz pass).
    #[structopt(long, parse(try_from_str = parse_duration::parse::parse))]
    tag_fuzz: Option<Duration>,

    /// Demote symbol-set disagreement during coalescing from a fatal error
    /// to a warning.
    #[structopt(long)]
    no_symbol_check: bool,

    /// Also write `reset refs/tags/<revision-id>` for every single-file
    /// export commit.
    #[structopt(long)]
    tag_each_rev: bool,

    /// Prefix each commit's log message with `<filename>: ` (single-file
    /// export only).
    #[structopt(long)]
    log_filename: bool,

    /// Use the revision's author as the committer too, instead of falling
    /// back to the host identity.
    #[structopt(long)]
    author_is_committer: bool,

    /// Warn to stderr when a revision's author has no authors-map entry.
    #[structopt(long)]
    warn_missing_authors: bool,

    /// Drop branched revisions from multi-file export instead of refusing
    /// to run (`spec.md` §1: multi-file branch reconstruction is
    /// unsupported).
    #[structopt(long)]
    skip_branches: bool,

    /// Reconstruct revision text by invoking `co -q -p<rev>` instead of
    /// replaying RCS diffs, so RCS keywords expand the way they would on
    /// checkout.
    #[structopt(long)]
    expand_keywords: bool,

    /// Where to read/write `git fast-import` marks. Defaults to a path
    /// under the OS temp directory, since a one-shot export has no marks
    /// worth persisting across runs unless the caller asks for them.
    #[structopt(long, parse(from_os_str))]
    marks: Option<PathBuf>,

    /// Increase logging verbosity; repeatable.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

/// `Write`-only wrapper around [`io::Stdout`], so `git_fast_import::Writer`
/// (which requires `W: Write + Debug`) can write to it without depending
/// on whether the standard library's `Stdout` happens to derive `Debug`.
struct StdoutSink(io::Stdout);

impl Write for StdoutSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl fmt::Debug for StdoutSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StdoutSink")
    }
}

fn main() -> ExitCode {
    let opt = Opt::from_args();
    init_logging(opt.verbose);

    match run(&opt) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    if let Err(e) = flexi_logger::Logger::try_with_env_or_str(level).and_then(|logger| logger.start())
    {
        eprintln!("failed to initialize logging: {}", e);
    }
}

/// Runs the import. Returns `Ok(false)` for a non-fatal failure tally
/// (missing/malformed input files, spec §7 kinds 1–5 and 8), which should
/// still produce exit code 1 per spec §6, and `Err` only for something
/// that aborts the whole run (a bad authors-map file, a write failure).
fn run(opt: &Opt) -> Result<bool, Error> {
    let authors = Authors::load(opt.authors_map.as_deref())?;

    let mut ok = true;
    let mut discovered = Vec::new();
    for root in &opt.paths {
        match discover(std::slice::from_ref(root), &opt.ignore) {
            Ok(mut found) => discovered.append(&mut found),
            Err(Error::NotFound(path)) => {
                log::error!("{}: not found", path.display());
                ok = false;
            }
            Err(e) => return Err(e),
        }
    }

    let mut files: Vec<RcsFile> = Vec::new();
    for entry in discovered {
        match RcsFile::load(&entry.path, entry.name.clone(), opt.expand_keywords)
            .and_then(|mut file| {
                resolve::resolve(&mut file)?;
                Ok(file)
            }) {
            Ok(file) => files.push(file),
            Err(e) => {
                log::error!("{}", e);
                ok = false;
            }
        }
    }

    if files.is_empty() {
        return Ok(ok);
    }

    // Fixed, not PID-qualified: the path is written verbatim into the
    // fast-import stream's `feature import-marks-if-exists=`/`export-marks=`
    // lines, and the default-config stream must be byte-identical across
    // runs (spec.md §8).
    let marks_path = opt
        .marks
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("rcs-fast-export.marks"));

    let mut writer = git_fast_import::Writer::new(StdoutSink(io::stdout()), &marks_path)?;

    if files.len() == 1 {
        let opts = single::Options {
            author_is_committer: opt.author_is_committer,
            warn_missing_authors: opt.warn_missing_authors,
            log_filename: opt.log_filename,
            tag_each_rev: opt.tag_each_rev,
        };
        let mut blob_marks: Marks<BlobKey> = Marks::new();
        let mut commit_marks: Marks<BlobKey> = Marks::new();
        single::export(
            &mut writer,
            &files[0],
            &authors,
            &opts,
            &mut blob_marks,
            &mut commit_marks,
        )?;
    } else {
        let opts = multi::Options {
            fuzz: opt.commit_fuzz,
            symbol_check: !opt.no_symbol_check,
            skip_branches: opt.skip_branches,
            author_is_committer: opt.author_is_committer,
            warn_missing_authors: opt.warn_missing_authors,
        };
        multi::export(&mut writer, &files, &authors, &opts)?;
    }

    Ok(ok)
}

//! Library half of `rcs-fast-export`: everything except the CLI surface
//! itself (`src/main.rs`), so the parser, replayer, resolver and exporters
//! can be exercised directly from tests without going through a process
//! boundary.

pub mod discover;
pub mod error;
pub mod export;
pub mod identity;
pub mod mark;
pub mod rcsfile;
pub mod replay;
pub mod resolve;

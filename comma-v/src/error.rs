use std::{num::ParseIntError, str::Utf8Error};

use nom::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}: malformed @-escaped string literal")]
    MalformedLiteral(String),

    #[error("{0}: malformed RCS date")]
    MalformedDate(String),

    #[error("contains() can only be invoked on a branch, against a commit")]
    NotBranch,

    #[error("parse error of kind {kind:?} at location {location:?}")]
    ParseError { location: Vec<u8>, kind: ErrorKind },

    #[error(transparent)]
    ParseInt(#[from] ParseIntError),

    #[error(transparent)]
    ParseUtf8(#[from] Utf8Error),
}

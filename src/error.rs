//! Merkle Tree Errors

use displaydoc::Display;
use thiserror::Error;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Cannot build a tree from an empty leaf list
    EmptyInput,
    /// Requested leaf index: {0} exceeds number of leaves: {1}
    IndexOutOfRange(usize, usize),
    /// No tree has been built for session: {0}
    NoTree(String),
    /// Malformed proof: {0}
    MalformedProof(String),
    /// Invalid hash encoding: {0}
    InvalidHash(String),
    /// Unknown odd node policy: {0} (expected `duplicate` or `promote`)
    UnknownPolicy(String),
    /// Session limit reached: {0} trees already stored
    SessionLimit(usize),
}

impl Error {
    /// Whether the caller supplied bad input
    pub fn is_validation(&self) -> bool {
        !self.is_state()
    }

    /// Whether the operation needs a tree that has not been built yet
    pub fn is_state(&self) -> bool {
        matches!(self, Error::NoTree(_))
    }
}

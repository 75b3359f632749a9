//! Quarry mines frequent connected subgraph patterns from per-user knowledge graphs.
//!
//! A run is driven by a shared, read-only [`Query`] (parsed schema, enumerated schema paths,
//! resolved mining parameters).  Each user gets a private [`Miner`] which instantiates the schema
//! paths over that user's triples, buckets the resulting working set by isomorphism code, and
//! repeatedly collapses the most frequent pattern into composite chunk nodes until nothing meets
//! the user's support threshold.

#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt::{Display, Formatter};

use kgraph::{schema, triple::MissingInstance};

mod candidates;
mod chunk;
pub mod classify;
mod instantiate;
mod miner;
mod paths;
pub mod query;

pub use classify::ChunkingType;
pub use miner::{Mined, Miner, PatternRecord, PatternStack};
pub use paths::SchemaPath;
pub use query::{support_threshold, Parameters, Query};

/// Shorthand for a `Result` with this crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// The ways a mining run can fail.
///
/// Everything else that can go "wrong" during mining (a schema path with no matching triples, a
/// property absent from a user's data, no pattern reaching the support threshold) is a normal
/// outcome and flows through as empty collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The schema file was malformed; aborts the whole run.
    SchemaParse(schema::ParseError),
    /// A triple was asked for the instance of a class on neither of its endpoints.  This is an
    /// internal inconsistency: it fails the current user's computation, which the driver
    /// isolates from the rest of the run.
    MissingInstance(MissingInstance),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SchemaParse(e) => write!(f, "{}", e),
            Error::MissingInstance(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<schema::ParseError> for Error {
    fn from(e: schema::ParseError) -> Self {
        Error::SchemaParse(e)
    }
}

impl From<MissingInstance> for Error {
    fn from(e: MissingInstance) -> Self {
        Error::MissingInstance(e)
    }
}

//! Crosswalk of gene–disease associations to the MeSH clinical vocabulary
//!
//! `otmesh` links Open Targets gene–disease association records to MeSH
//! descriptors and produces a gene-to-MeSH table keyed by NCBI Entrez gene IDs.
//!
//! The pipeline consists of the following stages, run strictly one after the other:
//!
//! 1. Load the MeSH tree positions into an immutable [`Taxonomy`]
//! 2. Select all diseases below a domain root, e.g. neoplasm ([`filter`])
//! 3. Map every selected disease to MeSH terms via its `MeSH:` cross-references
//!    and collapse the polyhierarchy to one tree position per pair ([`crosswalk`])
//! 4. Join the associations against the crosswalk and aggregate per
//!    gene and MeSH term ([`aggregate`])
//! 5. Translate Ensembl gene IDs to Entrez gene IDs ([`mapper`])
//!
//! Every run also produces a [`report::CoverageReport`] with the attrition of each step.
//!
//! # Examples
//!
//! ```
//! use otmesh::{MeshId, TreeNumber};
//!
//! let id = MeshId::try_from("D001943").unwrap();
//! assert_eq!(id.to_string(), "D001943");
//!
//! let tree = TreeNumber::try_from("C04.588.180").unwrap();
//! assert_eq!(tree.depth(), 3);
//! ```
use core::fmt::Debug;
use std::num::ParseIntError;
use thiserror::Error;

pub mod aggregate;
pub mod annotations;
pub mod config;
pub mod crosswalk;
pub mod filter;
pub mod mapper;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod taxonomy;
pub mod term;
mod writer;

pub use annotations::{Association, Disease, DiseaseCatalog, DiseaseId, EnsemblGeneId, EntrezId};
pub use config::Config;
pub use crosswalk::{Crosswalk, CrosswalkEdge, ResolverRule, Specificity};
pub use taxonomy::Taxonomy;
pub use term::{MeshId, MeshTerm, TreeNumber, TreePosition};

/// The therapeutic area "neoplasm" in EFO
pub const DEFAULT_DOMAIN_ROOT: &str = "EFO_0000616";
/// MeSH "Neoplasms by Site"
pub const DEFAULT_TAXONOMY_PREFIX: &str = "C04.588";
/// NCBI taxonomy ID of homo sapiens
pub const HUMAN_TAX_ID: u32 = 9606;

const DEFAULT_NUM_TREE_POSITIONS: usize = 2;
const DEFAULT_TOP_UNMAPPED: usize = 20;

/// Main Error type for this crate
#[derive(Error, Debug)]
pub enum CrosswalkError {
    /// A required input snapshot does not exist
    #[error("required input does not exist: {0}")]
    MissingInput(String),
    /// A file exists but cannot be opened
    #[error("unable to open file {0}")]
    CannotOpenFile(String),
    /// A required column is absent or a field has the wrong type
    #[error("schema mismatch in {file} (line {line}): {reason}")]
    SchemaMismatch {
        /// Name of the table or file
        file: String,
        /// Line number, `0` refers to the header
        line: usize,
        /// What is wrong with the line
        reason: String,
    },
    /// The data violates a structural invariant. This indicates a logic defect
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// An identifier does not follow the expected syntax
    #[error("invalid identifier: {0}")]
    InvalidId(String),
    /// The configuration cannot be parsed or is inconsistent
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Failure to read or write data
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ParseIntError> for CrosswalkError {
    fn from(err: ParseIntError) -> Self {
        CrosswalkError::InvalidId(err.to_string())
    }
}

/// Shortcut for `Result<T, CrosswalkError>`
pub type CrosswalkResult<T> = Result<T, CrosswalkError>;

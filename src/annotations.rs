//! Diseases, genes and their associations make up the source side of the crosswalk
//!
//! This module contains structs to represent [`Disease`]s of the Open Targets
//! disease index, the two gene identifier namespaces ([`EnsemblGeneId`] and
//! [`EntrezId`]) and the gene–disease [`Association`]s.
//!
//! The underlying principle is the same for all records:
//! - Each record has a unique identifier
//! - Records are loaded once from a static snapshot and never modified

mod association;
mod disease;
mod gene;

pub use association::Association;
pub use disease::{Disease, DiseaseCatalog, DiseaseId};
pub use gene::{EnsemblGeneId, EntrezId};

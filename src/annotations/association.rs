use std::path::Path;

use crate::annotations::{DiseaseId, EnsemblGeneId};
use crate::parser;
use crate::{CrosswalkError, CrosswalkResult};

/// A single gene–disease association
///
/// The `score` is the Open Targets overall association score and
/// always within `[0, 1]`. NaN and out-of-range values are rejected
/// on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    gene: EnsemblGeneId,
    disease: DiseaseId,
    score: f64,
    evidence_count: u64,
}

impl Association {
    /// Creates a new association
    ///
    /// # Errors
    ///
    /// [`CrosswalkError::InvariantViolation`] if the score is NaN or outside of `[0, 1]`
    pub fn new(
        gene: EnsemblGeneId,
        disease: DiseaseId,
        score: f64,
        evidence_count: u64,
    ) -> CrosswalkResult<Self> {
        if !(0.0..=1.0).contains(&score) {
            return Err(CrosswalkError::InvariantViolation(format!(
                "score of {gene} - {disease} must be within [0, 1], found {score}"
            )));
        }
        Ok(Self {
            gene,
            disease,
            score,
            evidence_count,
        })
    }

    /// Loads all associations from a TSV file
    ///
    /// The file must contain the columns `targetId`, `diseaseId`,
    /// `score` and `evidenceCount`.
    ///
    /// # Errors
    ///
    /// - [`CrosswalkError::CannotOpenFile`]: The file cannot be opened
    /// - [`CrosswalkError::SchemaMismatch`]: A column is missing or contains invalid data
    /// - [`CrosswalkError::InvariantViolation`]: A score is NaN or outside `[0, 1]`,
    ///   or an evidence count is negative
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> CrosswalkResult<Vec<Self>> {
        parser::associations::parse(path)
    }

    /// The Ensembl ID of the associated gene
    pub fn gene(&self) -> EnsemblGeneId {
        self.gene
    }

    /// The associated disease
    pub fn disease(&self) -> &DiseaseId {
        &self.disease
    }

    /// The overall association score
    pub fn score(&self) -> f64 {
        self.score
    }

    /// The number of evidence records supporting the association
    pub fn evidence_count(&self) -> u64 {
        self.evidence_count
    }
}

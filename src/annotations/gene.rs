use core::fmt::Debug;
use std::fmt::Display;

use crate::{CrosswalkError, CrosswalkResult};

/// A human Ensembl gene identifier, e.g. `ENSG00000141510`
///
/// Open Targets uses this ID for the target side of every association.
#[derive(Clone, Copy, Default, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct EnsemblGeneId {
    inner: u64,
}

impl EnsemblGeneId {
    /// Return the integer representation of the gene ID
    pub fn as_u64(&self) -> u64 {
        self.inner
    }
}

impl TryFrom<&str> for EnsemblGeneId {
    type Error = CrosswalkError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Some sources append the version, e.g. ENSG00000141510.17
        let value = value.split_once('.').map_or(value, |(id, _)| id);
        match value.strip_prefix("ENSG") {
            Some(digits) if digits.len() == 11 && digits.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(EnsemblGeneId {
                    inner: digits.parse::<u64>()?,
                })
            }
            _ => Err(CrosswalkError::InvalidId(format!(
                "{value} is not an Ensembl gene ID"
            ))),
        }
    }
}

impl From<u64> for EnsemblGeneId {
    fn from(inner: u64) -> Self {
        EnsemblGeneId { inner }
    }
}

impl Debug for EnsemblGeneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EnsemblGeneId({})", self)
    }
}

impl Display for EnsemblGeneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ENSG{:011}", self.inner)
    }
}

/// A unique NCBI (Entrez) gene identifier
///
/// This is the identifier space required by the consumers of the final table.
#[derive(Clone, Copy, Default, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct EntrezId {
    inner: u32,
}

impl EntrezId {
    /// Convert `self` to `u32`
    pub fn as_u32(&self) -> u32 {
        self.inner
    }
}

impl TryFrom<&str> for EntrezId {
    type Error = CrosswalkError;
    fn try_from(value: &str) -> CrosswalkResult<Self> {
        Ok(EntrezId {
            inner: value.parse::<u32>()?,
        })
    }
}

impl From<u32> for EntrezId {
    fn from(inner: u32) -> Self {
        EntrezId { inner }
    }
}

impl Display for EntrezId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

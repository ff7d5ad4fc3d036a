//! Selection of the diseases that belong to the domain of interest
use tracing::{info, warn};

use crate::annotations::{Disease, DiseaseCatalog, DiseaseId};

/// The diseases of a [`DiseaseCatalog`] below a domain root
///
/// The selection borrows the diseases, in catalog order.
#[derive(Debug)]
pub struct DomainSelection<'a> {
    root: DiseaseId,
    diseases: Vec<&'a Disease>,
    catalog_size: usize,
}

impl<'a> DomainSelection<'a> {
    /// The domain root the selection is based on
    pub fn root(&self) -> &DiseaseId {
        &self.root
    }

    /// All selected diseases
    pub fn diseases(&self) -> &[&'a Disease] {
        &self.diseases
    }

    /// Number of selected diseases
    pub fn len(&self) -> usize {
        self.diseases.len()
    }

    /// Returns `true` if no disease was selected
    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }

    /// Number of diseases in the full catalog
    pub fn catalog_size(&self) -> usize {
        self.catalog_size
    }
}

/// Selects all diseases whose ancestors contain `root`
///
/// If `exclude_root` is `true`, the root disease itself is never selected,
/// even if the ancestor data contains a self-reference.
///
/// An empty selection is valid, but logged as a warning.
pub fn select_domain<'a>(
    catalog: &'a DiseaseCatalog,
    root: &DiseaseId,
    exclude_root: bool,
) -> DomainSelection<'a> {
    let diseases: Vec<&Disease> = catalog
        .iter()
        .filter(|disease| disease.has_ancestor(root))
        .filter(|disease| !(exclude_root && disease.id() == root))
        .collect();

    if diseases.is_empty() {
        warn!("No disease of {} is below {}", catalog.len(), root);
    } else {
        info!(
            "Selected {} of {} diseases below {}",
            diseases.len(),
            catalog.len(),
            root
        );
    }

    DomainSelection {
        root: root.clone(),
        diseases,
        catalog_size: catalog.len(),
    }
}

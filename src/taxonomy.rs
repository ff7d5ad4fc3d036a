//! The immutable lookup of all MeSH terms and their tree positions
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::parser;
use crate::term::{MeshId, MeshTerm, TreeNumber, TreePosition};
use crate::CrosswalkResult;

/// All [`MeshTerm`]s of the target taxonomy
///
/// The polyhierarchy is represented as a mapping of each [`MeshId`] to
/// the set of its [`TreePosition`]s. The `Taxonomy` is constructed once
/// and never modified afterwards, all pipeline steps receive it by reference.
///
/// # Examples
///
/// ```
/// use otmesh::taxonomy::Taxonomy;
/// use otmesh::{MeshId, TreeNumber};
///
/// let mut builder = Taxonomy::builder();
/// let id = MeshId::try_from("D001943").unwrap();
/// builder.add_position(id, "Breast Neoplasms", TreeNumber::try_from("C04.588.180").unwrap());
/// builder.add_position(id, "Breast Neoplasms", TreeNumber::try_from("C17.800.090.500").unwrap());
/// let taxonomy = builder.build();
///
/// assert_eq!(taxonomy.len(), 1);
/// assert_eq!(taxonomy.get(&id).unwrap().positions().len(), 2);
///
/// let site = taxonomy.restrict_to(&TreeNumber::try_from("C04.588").unwrap());
/// assert_eq!(site.get(&id).unwrap().positions().len(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Taxonomy {
    terms: HashMap<MeshId, MeshTerm>,
}

impl Taxonomy {
    /// Returns a new [`TaxonomyBuilder`]
    pub fn builder() -> TaxonomyBuilder {
        TaxonomyBuilder::default()
    }

    /// Loads the taxonomy from a tree-position catalog
    ///
    /// The file must be tab-separated and contain the columns
    /// `mesh_id`, `mesh_name`, `tree_number` and `level`,
    /// one row per tree position.
    ///
    /// # Errors
    ///
    /// - [`crate::CrosswalkError::CannotOpenFile`]: The file cannot be opened
    /// - [`crate::CrosswalkError::SchemaMismatch`]: A column is missing or contains invalid data
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> CrosswalkResult<Self> {
        let mut builder = Self::builder();
        parser::mesh_tree::parse(path, &mut builder)?;
        Ok(builder.build())
    }

    /// Returns the [`MeshTerm`] with the given id
    pub fn get(&self, id: &MeshId) -> Option<&MeshTerm> {
        self.terms.get(id)
    }

    /// Returns `true` if the taxonomy contains the term
    pub fn contains(&self, id: &MeshId) -> bool {
        self.terms.contains_key(id)
    }

    /// Returns the number of terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the taxonomy does not contain any term
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the total number of tree positions of all terms
    pub fn position_count(&self) -> usize {
        self.terms.values().map(|term| term.positions().len()).sum()
    }

    /// Returns the number of terms with more than one tree position
    pub fn polyhierarchic_count(&self) -> usize {
        self.terms.values().filter(|term| term.is_polyhierarchic()).count()
    }

    /// Iterates all terms in arbitrary order
    pub fn terms(&self) -> impl Iterator<Item = &MeshTerm> {
        self.terms.values()
    }

    /// Returns all [`MeshId`]s, sorted
    pub fn ids(&self) -> Vec<MeshId> {
        let mut ids: Vec<MeshId> = self.terms.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns a new `Taxonomy` that only contains positions below `prefix`
    ///
    /// Terms without any remaining position are removed entirely.
    pub fn restrict_to(&self, prefix: &TreeNumber) -> Taxonomy {
        let terms: HashMap<MeshId, MeshTerm> = self
            .terms
            .iter()
            .filter_map(|(id, term)| {
                let mut term = term.clone();
                if term.retain_under(prefix) {
                    Some((*id, term))
                } else {
                    None
                }
            })
            .collect();
        debug!(
            "Restricted taxonomy to {}: {} of {} terms remain",
            prefix,
            terms.len(),
            self.terms.len()
        );
        Taxonomy { terms }
    }
}

/// Collects tree positions and folds them into a [`Taxonomy`]
#[derive(Debug, Default)]
pub struct TaxonomyBuilder {
    terms: HashMap<MeshId, MeshTerm>,
    duplicates: usize,
}

impl TaxonomyBuilder {
    /// Adds one tree position of a term
    ///
    /// Rows sharing the same [`MeshId`] are merged into one [`MeshTerm`].
    /// Returns `false` if the position was already present.
    pub fn add_position(&mut self, id: MeshId, name: &str, tree_number: TreeNumber) -> bool {
        let term = match self.terms.entry(id) {
            Entry::Occupied(entry) => {
                let term = entry.into_mut();
                if term.name() != name {
                    warn!("{} is named '{}' and '{}'", id, term.name(), name);
                }
                term
            }
            Entry::Vacant(entry) => entry.insert(MeshTerm::new(id, name)),
        };
        let added = term.add_position(TreePosition::new(tree_number));
        if !added {
            self.duplicates += 1;
        }
        added
    }

    /// Number of rows the builder has ignored as duplicates
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Finalizes the [`Taxonomy`]
    pub fn build(self) -> Taxonomy {
        if self.duplicates > 0 {
            debug!("Ignored {} duplicate tree positions", self.duplicates);
        }
        Taxonomy { terms: self.terms }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tn(s: &str) -> TreeNumber {
        TreeNumber::try_from(s).unwrap()
    }

    fn id(s: &str) -> MeshId {
        MeshId::try_from(s).unwrap()
    }

    fn example() -> Taxonomy {
        let mut builder = Taxonomy::builder();
        builder.add_position(id("D001943"), "Breast Neoplasms", tn("C04.588.180"));
        builder.add_position(id("D001943"), "Breast Neoplasms", tn("C17.800.090.500"));
        builder.add_position(id("D008175"), "Lung Neoplasms", tn("C04.588.894.797.520"));
        builder.add_position(id("D008175"), "Lung Neoplasms", tn("C08.381.540"));
        builder.add_position(id("D018303"), "Neoplasms, Basal Cell", tn("C04.557.470.200"));
        builder.build()
    }

    #[test]
    fn folds_positions_per_term() {
        let taxonomy = example();
        assert_eq!(taxonomy.len(), 3);
        assert_eq!(taxonomy.position_count(), 5);
        assert_eq!(taxonomy.polyhierarchic_count(), 2);
        assert!(taxonomy.contains(&id("D008175")));
    }

    #[test]
    fn builder_ignores_duplicate_rows() {
        let mut builder = Taxonomy::builder();
        assert!(builder.add_position(id("D001943"), "Breast Neoplasms", tn("C04.588.180")));
        assert!(!builder.add_position(id("D001943"), "Breast Neoplasms", tn("C04.588.180")));
        assert_eq!(builder.duplicates(), 1);
        assert_eq!(builder.build().position_count(), 1);
    }

    #[test]
    fn restrict_removes_terms_outside_prefix() {
        let taxonomy = example();
        let site = taxonomy.restrict_to(&tn("C04.588"));
        assert_eq!(site.len(), 2);
        assert!(!site.contains(&id("D018303")));
        assert_eq!(site.position_count(), 2);
        assert_eq!(site.polyhierarchic_count(), 0);

        // the unrestricted taxonomy is unchanged
        assert_eq!(taxonomy.len(), 3);
    }

    #[test]
    fn sorted_ids() {
        let ids = example().ids();
        assert_eq!(ids, vec![id("D001943"), id("D008175"), id("D018303")]);
    }
}

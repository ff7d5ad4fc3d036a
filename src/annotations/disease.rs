use core::fmt::Debug;
use std::collections::HashSet;
use std::fmt::Display;
use std::path::Path;

use tracing::warn;

use crate::parser;
use crate::term::MeshId;
use crate::{CrosswalkError, CrosswalkResult};

/// Prefix of MeSH cross-references in the disease index, compared case-insensitively
const MESH_XREF_PREFIX: &str = "mesh:";

/// Identifier of a disease in the source ontology, e.g. `EFO_0000616` or `MONDO_0007254`
#[derive(Clone, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct DiseaseId {
    inner: Box<str>,
}

impl DiseaseId {
    /// The identifier as string slice
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl TryFrom<&str> for DiseaseId {
    type Error = CrosswalkError;
    fn try_from(value: &str) -> CrosswalkResult<Self> {
        if value.is_empty() || value.contains(char::is_whitespace) {
            return Err(CrosswalkError::InvalidId(format!(
                "'{value}' is not a disease ID"
            )));
        }
        Ok(DiseaseId {
            inner: value.into(),
        })
    }
}

impl Debug for DiseaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DiseaseId({})", self.inner)
    }
}

impl Display for DiseaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// A single disease of the source ontology
///
/// A disease knows its ancestors (used to select the domain of interest)
/// and its cross-references into MeSH.
#[derive(Debug, Clone)]
pub struct Disease {
    id: DiseaseId,
    name: String,
    ancestors: Vec<DiseaseId>,
    mesh_xrefs: Vec<MeshId>,
    unparsed_mesh_xrefs: Vec<String>,
    other_xrefs: usize,
}

impl Disease {
    /// Initializes a new disease without ancestors and cross-references
    pub fn new(id: DiseaseId, name: &str) -> Disease {
        Disease {
            id,
            name: name.to_string(),
            ancestors: Vec::new(),
            mesh_xrefs: Vec::new(),
            unparsed_mesh_xrefs: Vec::new(),
            other_xrefs: 0,
        }
    }

    /// The unique [`DiseaseId`] of the disease
    pub fn id(&self) -> &DiseaseId {
        &self.id
    }

    /// The name of the disease
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All ancestors, sorted
    pub fn ancestors(&self) -> &[DiseaseId] {
        &self.ancestors
    }

    /// Returns `true` if `id` is an ancestor of the disease
    pub fn has_ancestor(&self, id: &DiseaseId) -> bool {
        self.ancestors.binary_search(id).is_ok()
    }

    /// The MeSH descriptors this disease refers to, sorted and unique
    pub fn mesh_xrefs(&self) -> &[MeshId] {
        &self.mesh_xrefs
    }

    /// MeSH cross-references that are not descriptor IDs,
    /// e.g. supplementary concepts like `C538231`
    pub fn unparsed_mesh_xrefs(&self) -> &[String] {
        &self.unparsed_mesh_xrefs
    }

    /// Number of cross-references into other vocabularies (OMIM, UMLS, ...)
    pub fn other_xrefs(&self) -> usize {
        self.other_xrefs
    }

    /// Adds an ancestor
    ///
    /// Returns whether the ancestor was newly inserted
    pub fn add_ancestor(&mut self, id: DiseaseId) -> bool {
        match self.ancestors.binary_search(&id) {
            Ok(_) => false,
            Err(idx) => {
                self.ancestors.insert(idx, id);
                true
            }
        }
    }

    /// Adds a raw database cross-reference, e.g. `MeSH:D001943` or `OMIM:114480`
    ///
    /// Only cross-references with a `MeSH:` prefix are kept, the prefix is
    /// stripped. All others are only counted.
    pub fn add_xref(&mut self, xref: &str) {
        let is_mesh = xref
            .get(..MESH_XREF_PREFIX.len())
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case(MESH_XREF_PREFIX));
        if !is_mesh {
            self.other_xrefs += 1;
            return;
        }
        let value = &xref[MESH_XREF_PREFIX.len()..];
        match MeshId::try_from(value) {
            Ok(id) => {
                if let Err(idx) = self.mesh_xrefs.binary_search(&id) {
                    self.mesh_xrefs.insert(idx, id);
                }
            }
            Err(_) => self.unparsed_mesh_xrefs.push(value.to_string()),
        }
    }
}

impl PartialEq for Disease {
    fn eq(&self, other: &Disease) -> bool {
        self.id == other.id
    }
}

impl Eq for Disease {}

/// The complete disease index, in input order
#[derive(Debug, Default, Clone)]
pub struct DiseaseCatalog {
    diseases: Vec<Disease>,
    ids: HashSet<DiseaseId>,
}

impl DiseaseCatalog {
    /// Loads the disease index from a TSV file
    ///
    /// The file must contain the columns `id`, `name`, `ancestors` and `db_xrefs`.
    /// `ancestors` and `db_xrefs` are `|`-separated lists.
    ///
    /// # Errors
    ///
    /// - [`CrosswalkError::CannotOpenFile`]: The file cannot be opened
    /// - [`CrosswalkError::SchemaMismatch`]: A column is missing or contains invalid data
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> CrosswalkResult<Self> {
        let mut catalog = DiseaseCatalog::default();
        parser::disease_index::parse(path, &mut catalog)?;
        Ok(catalog)
    }

    /// Adds a disease to the catalog
    ///
    /// Returns `false` and ignores the disease if the ID is already present
    pub fn insert(&mut self, disease: Disease) -> bool {
        if !self.ids.insert(disease.id().clone()) {
            warn!("Ignoring duplicate disease {}", disease.id());
            return false;
        }
        self.diseases.push(disease);
        true
    }

    /// Returns the number of diseases
    pub fn len(&self) -> usize {
        self.diseases.len()
    }

    /// Returns `true` if the catalog contains no disease
    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }

    /// Iterates all diseases in input order
    pub fn iter(&self) -> std::slice::Iter<'_, Disease> {
        self.diseases.iter()
    }
}

impl<'a> IntoIterator for &'a DiseaseCatalog {
    type Item = &'a Disease;
    type IntoIter = std::slice::Iter<'a, Disease>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

//! The crosswalk between source diseases and MeSH terms
//!
//! Building the crosswalk happens in two steps:
//!
//! 1. [`build_candidates`] maps every selected disease to the MeSH terms
//!    of its cross-references that are part of the [`crate::Taxonomy`]
//! 2. [`resolve`] picks one tree position for every (disease, term) pair,
//!    according to a [`ResolverRule`]
//!
//! The result is a flat table of [`CrosswalkEdge`]s, at most one per
//! (disease, term) pair.
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::annotations::DiseaseId;
use crate::term::{MeshId, TreeNumber};
use crate::{CrosswalkError, CrosswalkResult};

mod builder;
mod resolver;

pub use builder::{build_candidates, BuildStats, Candidate, Candidates};
pub use resolver::{resolve, ResolverRule, Specificity};

/// Maximum number of offending keys listed in an error message
const MAX_REPORTED_KEYS: usize = 10;

/// The resolved mapping of one disease to one MeSH term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrosswalkEdge {
    disease: DiseaseId,
    mesh: MeshId,
    tree_number: TreeNumber,
    depth: usize,
    candidate_positions: usize,
}

impl CrosswalkEdge {
    /// Creates a new edge
    ///
    /// `candidate_positions` is the number of tree positions the
    /// term had before resolution
    pub fn new(
        disease: DiseaseId,
        mesh: MeshId,
        tree_number: TreeNumber,
        candidate_positions: usize,
    ) -> Self {
        let depth = tree_number.depth();
        Self {
            disease,
            mesh,
            tree_number,
            depth,
            candidate_positions,
        }
    }

    /// The source disease
    pub fn disease(&self) -> &DiseaseId {
        &self.disease
    }

    /// The MeSH term
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    /// The selected tree position of the MeSH term
    pub fn tree_number(&self) -> &TreeNumber {
        &self.tree_number
    }

    /// The depth of the selected tree position
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of tree positions the term had before resolution
    pub fn candidate_positions(&self) -> usize {
        self.candidate_positions
    }

    /// Returns `true` if the resolver had to choose between several positions
    pub fn was_ambiguous(&self) -> bool {
        self.candidate_positions > 1
    }
}

/// All resolved [`CrosswalkEdge`]s, sorted by disease and MeSH term
///
/// The crosswalk guarantees that every (disease, term) pair occurs only once.
#[derive(Debug, Default, Clone)]
pub struct Crosswalk {
    edges: Vec<CrosswalkEdge>,
    index: HashMap<DiseaseId, Range<usize>>,
}

impl Crosswalk {
    /// Creates the crosswalk from resolved edges
    ///
    /// # Errors
    ///
    /// [`CrosswalkError::InvariantViolation`] if a (disease, term) pair
    /// occurs more than once. The message lists the offending pairs.
    pub fn from_edges(mut edges: Vec<CrosswalkEdge>) -> CrosswalkResult<Self> {
        edges.sort_by(|a, b| (&a.disease, a.mesh).cmp(&(&b.disease, b.mesh)));

        let duplicates: Vec<String> = edges
            .windows(2)
            .filter(|pair| pair[0].disease == pair[1].disease && pair[0].mesh == pair[1].mesh)
            .map(|pair| format!("({}, {})", pair[0].disease, pair[0].mesh))
            .collect();
        if !duplicates.is_empty() {
            return Err(CrosswalkError::InvariantViolation(format!(
                "{} duplicate crosswalk edges after resolution: {}",
                duplicates.len(),
                duplicates
                    .iter()
                    .take(MAX_REPORTED_KEYS)
                    .cloned()
                    .collect::<Vec<String>>()
                    .join(", ")
            )));
        }

        let mut index: HashMap<DiseaseId, Range<usize>> = HashMap::new();
        let mut start = 0;
        while start < edges.len() {
            let disease = &edges[start].disease;
            let end = start
                + edges[start..]
                    .iter()
                    .take_while(|edge| &edge.disease == disease)
                    .count();
            index.insert(disease.clone(), start..end);
            start = end;
        }

        Ok(Self { edges, index })
    }

    /// All edges, sorted by disease and term
    pub fn edges(&self) -> &[CrosswalkEdge] {
        &self.edges
    }

    /// All edges of a single disease
    pub fn edges_of(&self, disease: &DiseaseId) -> &[CrosswalkEdge] {
        match self.index.get(disease) {
            Some(range) => &self.edges[range.clone()],
            None => &[],
        }
    }

    /// Returns `true` if the disease has at least one edge
    pub fn contains_disease(&self, disease: &DiseaseId) -> bool {
        self.index.contains_key(disease)
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the crosswalk has no edges
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of distinct diseases with at least one edge
    pub fn disease_count(&self) -> usize {
        self.index.len()
    }

    /// Number of distinct MeSH terms with at least one edge
    pub fn term_count(&self) -> usize {
        self.edges
            .iter()
            .map(|edge| edge.mesh)
            .collect::<HashSet<MeshId>>()
            .len()
    }

    /// Number of edges whose term had more than one candidate position
    pub fn ambiguous_count(&self) -> usize {
        self.edges.iter().filter(|edge| edge.was_ambiguous()).count()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn edge(disease: &str, mesh: &str, tree: &str) -> CrosswalkEdge {
        CrosswalkEdge::new(
            DiseaseId::try_from(disease).unwrap(),
            MeshId::try_from(mesh).unwrap(),
            TreeNumber::try_from(tree).unwrap(),
            1,
        )
    }

    #[test]
    fn index_by_disease() {
        let crosswalk = Crosswalk::from_edges(vec![
            edge("EFO_0000311", "D009369", "C04"),
            edge("EFO_0000305", "D001943", "C04.588.180"),
            edge("EFO_0000311", "D001943", "C04.588.180"),
        ])
        .expect("edges are unique");

        assert_eq!(crosswalk.len(), 3);
        assert_eq!(crosswalk.disease_count(), 2);
        assert_eq!(crosswalk.term_count(), 2);

        let edges = crosswalk.edges_of(&DiseaseId::try_from("EFO_0000311").unwrap());
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].mesh(), "D001943");
        assert_eq!(edges[1].mesh(), "D009369");

        assert!(crosswalk
            .edges_of(&DiseaseId::try_from("EFO_0000616").unwrap())
            .is_empty());
    }

    #[test]
    fn duplicate_edges_are_rejected() {
        let err = Crosswalk::from_edges(vec![
            edge("EFO_0000305", "D001943", "C04.588.180"),
            edge("EFO_0000305", "D001943", "C17.800.090.500"),
        ])
        .unwrap_err();
        match err {
            CrosswalkError::InvariantViolation(msg) => {
                assert!(msg.contains("(EFO_0000305, D001943)"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn empty_crosswalk() {
        let crosswalk = Crosswalk::from_edges(Vec::new()).unwrap();
        assert!(crosswalk.is_empty());
        assert_eq!(crosswalk.disease_count(), 0);
    }
}

//! MeSH descriptors and their positions inside the MeSH tree
//!
//! A [`MeshTerm`] is identified by its [`MeshId`] and can occur at several
//! places of the tree. Each place is a [`TreePosition`] with a dotted
//! [`TreeNumber`].
use smallvec::SmallVec;

mod meshid;
mod tree;

pub use meshid::MeshId;
pub use tree::{TreeNumber, TreePosition};

use crate::DEFAULT_NUM_TREE_POSITIONS;

/// The tree positions of a single term
///
/// Most MeSH descriptors have one or two tree numbers.
pub type TreePositions = SmallVec<[TreePosition; DEFAULT_NUM_TREE_POSITIONS]>;

/// A single MeSH descriptor with all of its tree positions
///
/// The positions are kept sorted by tree number and each tree number
/// occurs only once.
#[derive(Debug, Clone)]
pub struct MeshTerm {
    id: MeshId,
    name: String,
    positions: TreePositions,
}

impl MeshTerm {
    /// Initializes a new term without any position
    ///
    /// Terms are usually created by the [`crate::taxonomy::TaxonomyBuilder`].
    pub fn new(id: MeshId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            positions: TreePositions::new(),
        }
    }

    /// The [`MeshId`] of the term
    pub fn id(&self) -> &MeshId {
        &self.id
    }

    /// The MeSH heading of the term
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All tree positions, sorted by tree number
    pub fn positions(&self) -> &[TreePosition] {
        &self.positions
    }

    /// Returns `true` if the term occurs at more than one place of the tree
    pub fn is_polyhierarchic(&self) -> bool {
        self.positions.len() > 1
    }

    /// Adds another position to the term
    ///
    /// Returns whether the position was newly inserted
    pub fn add_position(&mut self, position: TreePosition) -> bool {
        match self
            .positions
            .binary_search_by(|pos| pos.tree_number().cmp(position.tree_number()))
        {
            Ok(_) => false,
            Err(idx) => {
                self.positions.insert(idx, position);
                true
            }
        }
    }

    /// Removes all positions that are not below `prefix`
    ///
    /// Returns `true` if at least one position remains
    pub fn retain_under(&mut self, prefix: &TreeNumber) -> bool {
        self.positions.retain(|pos| pos.tree_number().is_under(prefix));
        !self.positions.is_empty()
    }
}

impl PartialEq for MeshTerm {
    fn eq(&self, other: &MeshTerm) -> bool {
        self.id == other.id
    }
}

impl Eq for MeshTerm {}

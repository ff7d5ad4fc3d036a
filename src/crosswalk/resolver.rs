use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crosswalk::{Candidates, Crosswalk, CrosswalkEdge};
use crate::term::{TreeNumber, TreePosition};
use crate::{CrosswalkError, CrosswalkResult};

/// Which tree position is considered the most specific one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specificity {
    /// Prefer the position with the maximum depth
    #[default]
    Deepest,
    /// Prefer the position with the minimum depth
    Shallowest,
}

/// The rule to collapse the tree positions of a term to a single one
///
/// Positions are compared by
///
/// 1. their depth, according to [`Specificity`]
/// 2. the list of preferred branches: a position below an earlier
///    branch wins over a position below a later one or below none
/// 3. the lexicographic order of the tree number
///
/// Since every tree number of a term is unique, the rule always
/// selects exactly one position, independent of the input order.
///
/// # Examples
///
/// ```
/// use otmesh::{ResolverRule, TreeNumber, TreePosition};
///
/// let positions = vec![
///     TreePosition::new(TreeNumber::try_from("C04.588.894").unwrap()),
///     TreePosition::new(TreeNumber::try_from("C04.588.894.797.520").unwrap()),
/// ];
///
/// let rule = ResolverRule::default();
/// let selected = rule.select(&positions).unwrap();
/// assert_eq!(selected.depth(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverRule {
    specificity: Specificity,
    preferred_branches: Vec<TreeNumber>,
}

impl ResolverRule {
    /// Creates a new rule
    pub fn new(specificity: Specificity, preferred_branches: Vec<TreeNumber>) -> Self {
        Self {
            specificity,
            preferred_branches,
        }
    }

    /// The depth preference of the rule
    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// The branches that win ties at equal depth, in order of preference
    pub fn preferred_branches(&self) -> &[TreeNumber] {
        &self.preferred_branches
    }

    fn branch_rank(&self, tree_number: &TreeNumber) -> usize {
        self.preferred_branches
            .iter()
            .position(|branch| tree_number.is_under(branch))
            .unwrap_or(self.preferred_branches.len())
    }

    /// Compares two positions, [`Ordering::Less`] means `a` is preferred
    pub fn compare(&self, a: &TreePosition, b: &TreePosition) -> Ordering {
        let depth = match self.specificity {
            Specificity::Deepest => b.depth().cmp(&a.depth()),
            Specificity::Shallowest => a.depth().cmp(&b.depth()),
        };
        depth
            .then_with(|| {
                self.branch_rank(a.tree_number())
                    .cmp(&self.branch_rank(b.tree_number()))
            })
            .then_with(|| a.tree_number().cmp(b.tree_number()))
    }

    /// Selects the preferred position, `None` if `positions` is empty
    pub fn select<'a>(&self, positions: &'a [TreePosition]) -> Option<&'a TreePosition> {
        positions.iter().min_by(|a, b| self.compare(a, b))
    }
}

/// Resolves all candidates to one [`CrosswalkEdge`] per (disease, term) pair
///
/// # Errors
///
/// [`CrosswalkError::InvariantViolation`] if a term has no tree position or
/// a (disease, term) pair occurs more than once after resolution
pub fn resolve(candidates: &Candidates<'_>, rule: &ResolverRule) -> CrosswalkResult<Crosswalk> {
    let mut edges = Vec::with_capacity(candidates.candidates().len());
    for candidate in candidates.candidates() {
        let term = candidate.term();
        let Some(position) = rule.select(term.positions()) else {
            return Err(CrosswalkError::InvariantViolation(format!(
                "{} has no tree position",
                term.id()
            )));
        };
        if term.is_polyhierarchic() {
            debug!(
                "{} - {}: selected {} out of {} positions",
                candidate.disease().id(),
                term.id(),
                position.tree_number(),
                term.positions().len()
            );
        }
        edges.push(CrosswalkEdge::new(
            candidate.disease().id().clone(),
            *term.id(),
            position.tree_number().clone(),
            term.positions().len(),
        ));
    }

    let crosswalk = Crosswalk::from_edges(edges)?;
    info!(
        "Resolved {} crosswalk edges, {} of them from several tree positions",
        crosswalk.len(),
        crosswalk.ambiguous_count()
    );
    Ok(crosswalk)
}

#[cfg(test)]
mod test {
    use super::*;

    fn positions(trees: &[&str]) -> Vec<TreePosition> {
        trees
            .iter()
            .map(|tree| TreePosition::new(TreeNumber::try_from(*tree).unwrap()))
            .collect()
    }

    fn selected(rule: &ResolverRule, trees: &[&str]) -> String {
        let positions = positions(trees);
        rule.select(&positions).unwrap().tree_number().to_string()
    }

    #[test]
    fn deepest_position_wins() {
        let rule = ResolverRule::default();
        assert_eq!(
            selected(&rule, &["C04.588.894", "C04.588.894.797.520"]),
            "C04.588.894.797.520"
        );
        assert_eq!(
            selected(&rule, &["C04.588.894.797.520", "C04.588.894"]),
            "C04.588.894.797.520"
        );
    }

    #[test]
    fn depth_three_and_seven() {
        let rule = ResolverRule::default();
        let result = selected(&rule, &["C04.588.274", "C04.588.274.476.411.307.180"]);
        assert_eq!(TreeNumber::try_from(result.as_str()).unwrap().depth(), 7);
    }

    #[test]
    fn ties_are_lexicographic() {
        let rule = ResolverRule::default();
        assert_eq!(
            selected(&rule, &["C17.800.090", "C04.588.180"]),
            "C04.588.180"
        );
        assert_eq!(
            selected(&rule, &["C04.588.180", "C17.800.090"]),
            "C04.588.180"
        );
    }

    #[test]
    fn shallowest_position_wins() {
        let rule = ResolverRule::new(Specificity::Shallowest, Vec::new());
        assert_eq!(
            selected(&rule, &["C04.588.894.797.520", "C04.588.894"]),
            "C04.588.894"
        );
    }

    #[test]
    fn preferred_branch_breaks_ties() {
        let rule = ResolverRule::new(
            Specificity::Deepest,
            vec![
                TreeNumber::try_from("C17").unwrap(),
                TreeNumber::try_from("C04.557").unwrap(),
            ],
        );
        assert_eq!(
            selected(&rule, &["C04.557.470", "C04.588.180", "C17.800.090"]),
            "C17.800.090"
        );
        assert_eq!(
            selected(&rule, &["C04.557.470", "C04.588.180"]),
            "C04.557.470"
        );
        // depth wins over the branch preference
        assert_eq!(
            selected(&rule, &["C04.588.180.260", "C17.800.090"]),
            "C04.588.180.260"
        );
    }

    #[test]
    fn empty_positions() {
        assert!(ResolverRule::default().select(&[]).is_none());
    }

    #[test]
    fn resolve_candidates() {
        use crate::annotations::{Disease, DiseaseCatalog, DiseaseId};
        use crate::crosswalk::build_candidates;
        use crate::filter::select_domain;
        use crate::term::MeshId;
        use crate::Taxonomy;

        let lung = MeshId::try_from("D008175").unwrap();
        let mut builder = Taxonomy::builder();
        builder.add_position(lung, "Lung Neoplasms", TreeNumber::try_from("C04.588.894.797.520").unwrap());
        builder.add_position(lung, "Lung Neoplasms", TreeNumber::try_from("C04.588.894").unwrap());
        let taxonomy = builder.build();

        let root = DiseaseId::try_from("EFO_0000616").unwrap();
        let mut disease = Disease::new(DiseaseId::try_from("EFO_0001071").unwrap(), "lung carcinoma");
        disease.add_ancestor(root.clone());
        disease.add_xref("MeSH:D008175");
        let mut catalog = DiseaseCatalog::default();
        catalog.insert(disease);

        let selection = select_domain(&catalog, &root, true);
        let candidates = build_candidates(&selection, &taxonomy);
        let crosswalk = resolve(&candidates, &ResolverRule::default()).unwrap();

        assert_eq!(crosswalk.len(), 1);
        let edge = &crosswalk.edges()[0];
        assert_eq!(edge.mesh(), lung);
        assert_eq!(edge.depth(), 5);
        assert!(edge.was_ambiguous());
        assert_eq!(crosswalk.ambiguous_count(), 1);
    }
}

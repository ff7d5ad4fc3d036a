use tracing::{debug, info};

use crate::annotations::Disease;
use crate::filter::DomainSelection;
use crate::term::MeshTerm;
use crate::Taxonomy;

/// An unresolved mapping of a disease to a MeSH term with all its tree positions
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    disease: &'a Disease,
    term: &'a MeshTerm,
}

impl<'a> Candidate<'a> {
    /// The source disease
    pub fn disease(&self) -> &'a Disease {
        self.disease
    }

    /// The MeSH term the disease refers to
    pub fn term(&self) -> &'a MeshTerm {
        self.term
    }
}

/// Counters of the crosswalk building step
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildStats {
    /// Number of diseases that were considered
    pub diseases: usize,
    /// Diseases with at least one candidate
    pub mapped: usize,
    /// Diseases without any candidate
    pub unmapped: usize,
    /// MeSH descriptor cross-references of all diseases
    pub mesh_xrefs: usize,
    /// Descriptor cross-references that are not part of the taxonomy
    pub xrefs_outside_taxonomy: usize,
    /// MeSH cross-references that are not descriptors (e.g. supplementary concepts)
    pub non_descriptor_xrefs: usize,
    /// Cross-references into other vocabularies
    pub other_xrefs: usize,
}

/// All candidates of a [`DomainSelection`]
#[derive(Debug)]
pub struct Candidates<'a> {
    candidates: Vec<Candidate<'a>>,
    unmapped: Vec<&'a Disease>,
    stats: BuildStats,
}

impl<'a> Candidates<'a> {
    /// All candidates, in selection order
    pub fn candidates(&self) -> &[Candidate<'a>] {
        &self.candidates
    }

    /// Diseases without any candidate, in selection order
    pub fn unmapped(&self) -> &[&'a Disease] {
        &self.unmapped
    }

    /// Counters of the building step
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

/// Maps every selected disease to the MeSH terms of its cross-references
///
/// Cross-references that are not present in the taxonomy are dropped
/// and only counted. A disease without a single matching cross-reference
/// ends up in the unmapped list.
pub fn build_candidates<'a>(
    selection: &DomainSelection<'a>,
    taxonomy: &'a Taxonomy,
) -> Candidates<'a> {
    let mut candidates = Vec::new();
    let mut unmapped = Vec::new();
    let mut stats = BuildStats::default();

    for &disease in selection.diseases() {
        stats.diseases += 1;
        stats.mesh_xrefs += disease.mesh_xrefs().len();
        stats.non_descriptor_xrefs += disease.unparsed_mesh_xrefs().len();
        stats.other_xrefs += disease.other_xrefs();

        let before = candidates.len();
        for mesh_id in disease.mesh_xrefs() {
            match taxonomy.get(mesh_id) {
                Some(term) => candidates.push(Candidate { disease, term }),
                None => stats.xrefs_outside_taxonomy += 1,
            }
        }

        if candidates.len() > before {
            stats.mapped += 1;
        } else {
            debug!("{} ({}) has no MeSH term in the taxonomy", disease.id(), disease.name());
            stats.unmapped += 1;
            unmapped.push(disease);
        }
    }

    info!(
        "{} of {} diseases map to at least one MeSH term ({} candidates)",
        stats.mapped,
        stats.diseases,
        candidates.len()
    );

    Candidates {
        candidates,
        unmapped,
        stats,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::annotations::{DiseaseCatalog, DiseaseId};
    use crate::filter::select_domain;
    use crate::term::{MeshId, TreeNumber};

    fn taxonomy() -> Taxonomy {
        let mut builder = Taxonomy::builder();
        builder.add_position(
            MeshId::try_from("D001943").unwrap(),
            "Breast Neoplasms",
            TreeNumber::try_from("C04.588.180").unwrap(),
        );
        builder.add_position(
            MeshId::try_from("D008175").unwrap(),
            "Lung Neoplasms",
            TreeNumber::try_from("C04.588.894.797.520").unwrap(),
        );
        builder.build()
    }

    fn disease(id: &str, xrefs: &[&str]) -> Disease {
        let mut disease = Disease::new(DiseaseId::try_from(id).unwrap(), id);
        disease.add_ancestor(DiseaseId::try_from("EFO_0000616").unwrap());
        for xref in xrefs {
            disease.add_xref(xref);
        }
        disease
    }

    #[test]
    fn candidates_and_attrition() {
        let mut catalog = DiseaseCatalog::default();
        catalog.insert(disease("EFO_0000305", &["MeSH:D001943", "OMIM:114480"]));
        catalog.insert(disease("EFO_0001071", &["MeSH:D008175", "MeSH:D002283"]));
        // only cross-reference points outside of the taxonomy
        catalog.insert(disease("EFO_0000349", &["MeSH:D009369"]));
        catalog.insert(disease("EFO_0000182", &["MeSH:C538231"]));
        catalog.insert(disease("EFO_0000095", &[]));

        let taxonomy = taxonomy();
        let selection = select_domain(&catalog, &DiseaseId::try_from("EFO_0000616").unwrap(), true);
        let candidates = build_candidates(&selection, &taxonomy);

        assert_eq!(candidates.candidates().len(), 2);
        let stats = candidates.stats();
        assert_eq!(stats.diseases, 5);
        assert_eq!(stats.mapped, 2);
        assert_eq!(stats.unmapped, 3);
        assert_eq!(stats.mapped + stats.unmapped, selection.len());
        assert_eq!(stats.mesh_xrefs, 4);
        assert_eq!(stats.xrefs_outside_taxonomy, 2);
        assert_eq!(stats.non_descriptor_xrefs, 1);
        assert_eq!(stats.other_xrefs, 1);

        let unmapped: Vec<&str> = candidates
            .unmapped()
            .iter()
            .map(|d| d.id().as_str())
            .collect();
        assert_eq!(unmapped, vec!["EFO_0000349", "EFO_0000182", "EFO_0000095"]);
    }
}

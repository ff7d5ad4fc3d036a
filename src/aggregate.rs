//! Aggregation of gene–disease associations per gene and MeSH term
//!
//! Every [`Association`] is joined to all [`crate::CrosswalkEdge`]s of its disease.
//! All rows that end up with the same gene and MeSH term are combined:
//!
//! - the score is the maximum score of all contributing associations
//! - the evidence count is the sum of all contributing evidence counts
//!
//! Both operations are associative and commutative, so associations can be
//! aggregated in independent chunks and [merged](`Aggregation::merge`) afterwards.
//!
//! # Examples
//!
//! ```
//! use otmesh::aggregate::Aggregate;
//!
//! let mut a = Aggregate::new(0.6, 10);
//! a.merge(&Aggregate::new(0.8, 5));
//!
//! assert_eq!(a.max_score(), 0.8);
//! assert_eq!(a.total_evidence(), 15);
//! ```
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::annotations::{Association, DiseaseId, EnsemblGeneId};
use crate::term::MeshId;
use crate::Crosswalk;

/// The combined score and evidence of one group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    max_score: f64,
    total_evidence: u64,
    contributors: usize,
}

impl Aggregate {
    /// Creates the aggregate of a single record
    pub fn new(score: f64, evidence: u64) -> Self {
        Self {
            max_score: score,
            total_evidence: evidence,
            contributors: 1,
        }
    }

    /// Combines `other` into `self`
    pub fn merge(&mut self, other: &Aggregate) {
        self.max_score = self.max_score.max(other.max_score);
        self.total_evidence += other.total_evidence;
        self.contributors += other.contributors;
    }

    /// The maximum score of all contributors
    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// The sum of the evidence counts of all contributors
    pub fn total_evidence(&self) -> u64 {
        self.total_evidence
    }

    /// The number of records that were combined
    pub fn contributors(&self) -> usize {
        self.contributors
    }
}

/// One row of the aggregated table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatedRecord {
    gene: EnsemblGeneId,
    mesh: MeshId,
    aggregate: Aggregate,
}

impl AggregatedRecord {
    /// The Ensembl gene
    pub fn gene(&self) -> EnsemblGeneId {
        self.gene
    }

    /// The MeSH term
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    /// The maximum score of all contributing associations
    pub fn max_score(&self) -> f64 {
        self.aggregate.max_score
    }

    /// The sum of evidence counts of all contributing associations
    pub fn total_evidence(&self) -> u64 {
        self.aggregate.total_evidence
    }

    /// The aggregated values
    pub fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }
}

/// Associations of a single disease without any crosswalk edge
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DroppedDisease {
    /// Number of dropped associations
    pub records: usize,
    /// Sum of evidence of the dropped associations
    pub evidence: u64,
    /// Highest score of the dropped associations
    pub max_score: f64,
}

impl DroppedDisease {
    fn add(&mut self, association: &Association) {
        self.records += 1;
        self.evidence += association.evidence_count();
        self.max_score = self.max_score.max(association.score());
    }

    fn merge(&mut self, other: &DroppedDisease) {
        self.records += other.records;
        self.evidence += other.evidence;
        self.max_score = self.max_score.max(other.max_score);
    }
}

/// Attrition of the join between associations and crosswalk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinStats {
    /// Number of associations
    pub records_in: usize,
    /// Associations with at least one crosswalk edge
    pub records_joined: usize,
    /// Associations without crosswalk edge
    pub records_dropped: usize,
    /// Rows after joining, one per association and edge
    pub joined_rows: usize,
    /// Sum of evidence of all associations
    pub evidence_in: u64,
    /// Sum of evidence of the dropped associations
    pub evidence_dropped: u64,
    /// Dropped associations per disease
    pub dropped: BTreeMap<DiseaseId, DroppedDisease>,
}

impl JoinStats {
    fn merge(&mut self, other: JoinStats) {
        self.records_in += other.records_in;
        self.records_joined += other.records_joined;
        self.records_dropped += other.records_dropped;
        self.joined_rows += other.joined_rows;
        self.evidence_in += other.evidence_in;
        self.evidence_dropped += other.evidence_dropped;
        for (disease, dropped) in other.dropped {
            self.dropped.entry(disease).or_default().merge(&dropped);
        }
    }
}

/// Partial or complete aggregation of associations
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    groups: BTreeMap<(EnsemblGeneId, MeshId), Aggregate>,
    stats: JoinStats,
}

impl Aggregation {
    /// Creates an empty aggregation
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins a single association to the crosswalk and adds it to all its groups
    pub fn add(&mut self, association: &Association, crosswalk: &Crosswalk) {
        self.stats.records_in += 1;
        self.stats.evidence_in += association.evidence_count();

        let edges = crosswalk.edges_of(association.disease());
        if edges.is_empty() {
            self.stats.records_dropped += 1;
            self.stats.evidence_dropped += association.evidence_count();
            self.stats
                .dropped
                .entry(association.disease().clone())
                .or_default()
                .add(association);
            return;
        }

        self.stats.records_joined += 1;
        let value = Aggregate::new(association.score(), association.evidence_count());
        for edge in edges {
            self.stats.joined_rows += 1;
            match self.groups.entry((association.gene(), edge.mesh())) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(&value),
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
    }

    /// Adds all associations
    pub fn extend(&mut self, associations: &[Association], crosswalk: &Crosswalk) {
        for association in associations {
            self.add(association, crosswalk);
        }
    }

    /// Merges another (partial) aggregation into `self`
    pub fn merge(&mut self, other: Aggregation) {
        for (key, value) in other.groups {
            match self.groups.entry(key) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(&value),
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
        self.stats.merge(other.stats);
    }

    /// The attrition counters so far
    pub fn stats(&self) -> &JoinStats {
        &self.stats
    }

    /// Number of (gene, term) groups so far
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if no association was joined yet
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Finalizes the aggregation into a table, sorted by gene and term
    pub fn finish(self) -> (AggregatedTable, JoinStats) {
        let records = self
            .groups
            .into_iter()
            .map(|((gene, mesh), aggregate)| AggregatedRecord {
                gene,
                mesh,
                aggregate,
            })
            .collect();
        (AggregatedTable { records }, self.stats)
    }
}

/// Aggregates all associations in one pass
pub fn aggregate(associations: &[Association], crosswalk: &Crosswalk) -> (AggregatedTable, JoinStats) {
    let mut aggregation = Aggregation::new();
    aggregation.extend(associations, crosswalk);
    log_result(aggregation.finish())
}

/// Aggregates the associations in chunks of `chunk_size` and merges the partial results
///
/// The result is identical to [`aggregate`].
pub fn aggregate_chunked(
    associations: &[Association],
    crosswalk: &Crosswalk,
    chunk_size: usize,
) -> (AggregatedTable, JoinStats) {
    let mut aggregation = Aggregation::new();
    for chunk in associations.chunks(chunk_size.max(1)) {
        let mut partial = Aggregation::new();
        partial.extend(chunk, crosswalk);
        debug!("Aggregated chunk of {} associations", chunk.len());
        aggregation.merge(partial);
    }
    log_result(aggregation.finish())
}

fn log_result((table, stats): (AggregatedTable, JoinStats)) -> (AggregatedTable, JoinStats) {
    info!(
        "Joined {} of {} associations into {} gene-MeSH pairs, dropped {} associations of {} diseases without MeSH",
        stats.records_joined,
        stats.records_in,
        table.len(),
        stats.records_dropped,
        stats.dropped.len()
    );
    (table, stats)
}

/// The aggregated table, one row per (Ensembl gene, MeSH term)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedTable {
    records: Vec<AggregatedRecord>,
}

impl AggregatedTable {
    /// All rows, sorted by gene and term
    pub fn records(&self) -> &[AggregatedRecord] {
        &self.records
    }

    /// Iterates all rows
    pub fn iter(&self) -> std::slice::Iter<'_, AggregatedRecord> {
        self.records.iter()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of rows that combine more than one association
    pub fn collapsed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.aggregate.contributors > 1)
            .count()
    }

    /// Sum of evidence per MeSH term
    pub fn evidence_by_term(&self) -> BTreeMap<MeshId, u64> {
        let mut evidence = BTreeMap::new();
        for record in &self.records {
            *evidence.entry(record.mesh).or_insert(0) += record.total_evidence();
        }
        evidence
    }
}

impl<'a> IntoIterator for &'a AggregatedTable {
    type Item = &'a AggregatedRecord;
    type IntoIter = std::slice::Iter<'a, AggregatedRecord>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crosswalk::CrosswalkEdge;
    use crate::term::TreeNumber;

    fn did(s: &str) -> DiseaseId {
        DiseaseId::try_from(s).unwrap()
    }

    fn mesh(s: &str) -> MeshId {
        MeshId::try_from(s).unwrap()
    }

    fn gene(s: &str) -> EnsemblGeneId {
        EnsemblGeneId::try_from(s).unwrap()
    }

    fn edge(disease: &str, mesh_id: &str, tree: &str) -> CrosswalkEdge {
        CrosswalkEdge::new(did(disease), mesh(mesh_id), TreeNumber::try_from(tree).unwrap(), 1)
    }

    fn crosswalk() -> Crosswalk {
        Crosswalk::from_edges(vec![
            edge("EFO_A", "D001943", "C04.588.180"),
            edge("EFO_B", "D001943", "C04.588.180"),
            edge("EFO_B", "D002277", "C04.557.470.200"),
        ])
        .unwrap()
    }

    fn association(gene_id: &str, disease: &str, score: f64, evidence: u64) -> Association {
        Association::new(gene(gene_id), did(disease), score, evidence).unwrap()
    }

    fn associations() -> Vec<Association> {
        vec![
            association("ENSG00000141510", "EFO_A", 0.6, 10),
            association("ENSG00000141510", "EFO_B", 0.8, 5),
            association("ENSG00000012048", "EFO_A", 0.3, 2),
            association("ENSG00000012048", "EFO_Z", 0.9, 40),
            association("ENSG00000012048", "EFO_Z", 0.2, 1),
        ]
    }

    #[test]
    fn max_score_and_sum_of_evidence() {
        let (table, _) = aggregate(&associations(), &crosswalk());
        let tp53 = table
            .iter()
            .find(|r| r.gene() == gene("ENSG00000141510") && r.mesh() == mesh("D001943"))
            .expect("TP53 - breast is present");
        assert_eq!(tp53.max_score(), 0.8);
        assert_eq!(tp53.total_evidence(), 15);
        assert_eq!(tp53.aggregate().contributors(), 2);
    }

    #[test]
    fn fan_out_to_every_term() {
        let (table, stats) = aggregate(&associations(), &crosswalk());
        // EFO_B maps to 2 terms
        assert_eq!(stats.joined_rows, 4);
        assert_eq!(table.len(), 3);

        let carcinoma = table
            .iter()
            .find(|r| r.mesh() == mesh("D002277"))
            .expect("fan-out row is present");
        assert_eq!(carcinoma.max_score(), 0.8);
        assert_eq!(carcinoma.total_evidence(), 5);
        assert_eq!(table.collapsed_count(), 1);
    }

    #[test]
    fn dropped_records_are_counted() {
        let (_, stats) = aggregate(&associations(), &crosswalk());
        assert_eq!(stats.records_in, 5);
        assert_eq!(stats.records_joined, 3);
        assert_eq!(stats.records_dropped, 2);
        assert_eq!(stats.records_in, stats.records_joined + stats.records_dropped);
        assert_eq!(stats.evidence_in, 58);
        assert_eq!(stats.evidence_dropped, 41);

        let dropped = stats.dropped.get(&did("EFO_Z")).expect("EFO_Z is dropped");
        assert_eq!(dropped.records, 2);
        assert_eq!(dropped.evidence, 41);
        assert_eq!(dropped.max_score, 0.9);
    }

    #[test]
    fn chunked_equals_single_pass() {
        let records = associations();
        let expected = aggregate(&records, &crosswalk());
        for chunk_size in [0, 1, 2, 3, 100] {
            assert_eq!(aggregate_chunked(&records, &crosswalk(), chunk_size), expected);
        }
    }

    #[test]
    fn records_are_sorted_by_key() {
        let (table, _) = aggregate(&associations(), &crosswalk());
        let keys: Vec<(EnsemblGeneId, MeshId)> = table.iter().map(|r| (r.gene(), r.mesh())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn evidence_is_conserved() {
        let records = associations();
        let crosswalk = crosswalk();
        let (table, _) = aggregate(&records, &crosswalk);

        for (term, evidence) in table.evidence_by_term() {
            let expected: u64 = records
                .iter()
                .filter(|a| crosswalk.edges_of(a.disease()).iter().any(|e| e.mesh() == term))
                .map(Association::evidence_count)
                .sum();
            assert_eq!(evidence, expected);
        }
    }
}

//! Translation of Ensembl gene IDs into NCBI Entrez gene IDs
//!
//! Genes without an Entrez ID are dropped from the final table. The drop is
//! reported, optionally broken down by gene biotype, to tell expected drops
//! (e.g. non-coding genes) apart from mapping defects.
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use tracing::{info, warn};

use crate::aggregate::{Aggregate, AggregatedTable};
use crate::annotations::{EnsemblGeneId, EntrezId};
use crate::parser;
use crate::term::MeshId;
use crate::CrosswalkResult;

/// Category of genes that are not listed in the [`GeneCategories`]
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Mapping of Ensembl gene IDs to Entrez gene IDs
///
/// Every Ensembl gene maps to at most one Entrez gene, the first
/// mapping that was inserted wins.
#[derive(Debug, Default, Clone)]
pub struct EntrezMap {
    inner: HashMap<EnsemblGeneId, EntrezId>,
    conflicts: usize,
    blank_rows: usize,
}

impl EntrezMap {
    /// Loads the mapping from a TSV file
    ///
    /// Both a two-column table (`ensembl_gene_id`, `entrez_gene_id`) and the
    /// NCBI `gene2ensembl` format are supported. `gene2ensembl` rows are filtered
    /// to the given taxonomy ID.
    ///
    /// # Errors
    ///
    /// - [`crate::CrosswalkError::CannotOpenFile`]: The file cannot be opened
    /// - [`crate::CrosswalkError::SchemaMismatch`]: A column is missing or contains invalid data
    pub fn from_tsv<P: AsRef<Path>>(path: P, tax_id: u32) -> CrosswalkResult<Self> {
        let mut map = EntrezMap::default();
        parser::entrez::parse(path, tax_id, &mut map)?;
        Ok(map)
    }

    /// Adds a mapping
    ///
    /// Returns `false` if the Ensembl gene was already mapped. The existing
    /// mapping is kept in that case.
    pub fn insert(&mut self, ensembl: EnsemblGeneId, entrez: EntrezId) -> bool {
        match self.inner.get(&ensembl) {
            None => {
                self.inner.insert(ensembl, entrez);
                true
            }
            Some(existing) => {
                if *existing != entrez {
                    self.conflicts += 1;
                }
                false
            }
        }
    }

    /// Returns the Entrez ID of a gene
    pub fn get(&self, ensembl: &EnsemblGeneId) -> Option<EntrezId> {
        self.inner.get(ensembl).copied()
    }

    /// Number of mapped Ensembl genes
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the map is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of ignored mappings to a different Entrez ID
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    /// Number of source rows without Ensembl or Entrez ID
    pub fn blank_rows(&self) -> usize {
        self.blank_rows
    }

    pub(crate) fn skip_blank(&mut self) {
        self.blank_rows += 1;
    }
}

/// Biotype (e.g. `protein_coding`) of Ensembl genes
#[derive(Debug, Default, Clone)]
pub struct GeneCategories {
    inner: HashMap<EnsemblGeneId, String>,
}

impl GeneCategories {
    /// Loads the categories from a TSV file with the columns
    /// `ensembl_gene_id` and `biotype`
    ///
    /// # Errors
    ///
    /// - [`crate::CrosswalkError::CannotOpenFile`]: The file cannot be opened
    /// - [`crate::CrosswalkError::SchemaMismatch`]: A column is missing or contains invalid data
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> CrosswalkResult<Self> {
        let mut categories = GeneCategories::default();
        parser::gene_categories::parse(path, &mut categories)?;
        Ok(categories)
    }

    /// Sets the category of a gene
    pub fn insert(&mut self, gene: EnsemblGeneId, category: &str) {
        self.inner.insert(gene, category.to_string());
    }

    /// Returns the category of a gene
    pub fn get(&self, gene: &EnsemblGeneId) -> Option<&str> {
        self.inner.get(gene).map(String::as_str)
    }

    /// Number of genes with a category
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no gene has a category
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// One row of the final table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalRecord {
    entrez: EntrezId,
    mesh: MeshId,
    aggregate: Aggregate,
}

impl FinalRecord {
    /// The Entrez gene
    pub fn entrez(&self) -> EntrezId {
        self.entrez
    }

    /// The MeSH term
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    /// The maximum association score
    pub fn max_score(&self) -> f64 {
        self.aggregate.max_score()
    }

    /// The total evidence count
    pub fn total_evidence(&self) -> u64 {
        self.aggregate.total_evidence()
    }
}

/// The final table, one row per (Entrez gene, MeSH term)
///
/// Rows are sorted by descending score, then by MeSH term and Entrez gene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalTable {
    records: Vec<FinalRecord>,
}

impl FinalTable {
    /// All rows
    pub fn records(&self) -> &[FinalRecord] {
        &self.records
    }

    /// Iterates all rows
    pub fn iter(&self) -> std::slice::Iter<'_, FinalRecord> {
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

    /// Number of distinct MeSH terms
    pub fn term_count(&self) -> usize {
        self.records.iter().map(|r| r.mesh).collect::<BTreeSet<MeshId>>().len()
    }

    /// Number of distinct genes
    pub fn gene_count(&self) -> usize {
        self.records.iter().map(|r| r.entrez).collect::<BTreeSet<EntrezId>>().len()
    }
}

impl<'a> IntoIterator for &'a FinalTable {
    type Item = &'a FinalRecord;
    type IntoIter = std::slice::Iter<'a, FinalRecord>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Attrition of the Entrez mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingStats {
    /// Rows of the aggregated table
    pub rows_in: usize,
    /// Rows with an Entrez ID
    pub rows_mapped: usize,
    /// Rows without an Entrez ID
    pub rows_dropped: usize,
    /// Distinct Ensembl genes of the aggregated table
    pub genes_in: usize,
    /// Distinct Ensembl genes without an Entrez ID
    pub genes_dropped: usize,
    /// Mapped rows that were merged because several Ensembl genes
    /// share the same Entrez ID
    pub rows_merged: usize,
    /// Dropped distinct genes per category, only if categories are available
    pub dropped_by_category: Option<BTreeMap<String, usize>>,
}

/// Maps the aggregated table to Entrez gene IDs
///
/// The aggregated table is not modified and stays available for auditing.
/// Rows without an Entrez ID are dropped. If several Ensembl genes map to
/// the same Entrez gene, their rows are combined with the same
/// max/sum reduction as in the aggregation step, so that each
/// (Entrez gene, MeSH term) pair occurs only once.
pub fn map_to_entrez(
    table: &AggregatedTable,
    map: &EntrezMap,
    categories: Option<&GeneCategories>,
) -> (FinalTable, MappingStats) {
    let mut groups: BTreeMap<(EntrezId, MeshId), Aggregate> = BTreeMap::new();
    let mut genes_in: BTreeSet<EnsemblGeneId> = BTreeSet::new();
    let mut genes_dropped: BTreeSet<EnsemblGeneId> = BTreeSet::new();
    let mut stats = MappingStats {
        rows_in: table.len(),
        ..MappingStats::default()
    };

    for record in table {
        genes_in.insert(record.gene());
        let Some(entrez) = map.get(&record.gene()) else {
            stats.rows_dropped += 1;
            genes_dropped.insert(record.gene());
            continue;
        };
        stats.rows_mapped += 1;
        match groups.entry((entrez, record.mesh())) {
            Entry::Occupied(mut entry) => {
                stats.rows_merged += 1;
                entry.get_mut().merge(record.aggregate());
            }
            Entry::Vacant(entry) => {
                entry.insert(*record.aggregate());
            }
        }
    }

    stats.genes_in = genes_in.len();
    stats.genes_dropped = genes_dropped.len();
    stats.dropped_by_category = categories.map(|categories| {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for gene in &genes_dropped {
            let category = categories.get(gene).unwrap_or(UNKNOWN_CATEGORY);
            *counts.entry(category.to_string()).or_insert(0) += 1;
        }
        counts
    });

    let mut records: Vec<FinalRecord> = groups
        .into_iter()
        .map(|((entrez, mesh), aggregate)| FinalRecord {
            entrez,
            mesh,
            aggregate,
        })
        .collect();
    records.sort_by(|a, b| {
        b.max_score()
            .total_cmp(&a.max_score())
            .then_with(|| a.mesh.cmp(&b.mesh))
            .then_with(|| a.entrez.cmp(&b.entrez))
    });

    if stats.rows_merged > 0 {
        warn!(
            "{} rows were merged, because several Ensembl genes map to the same Entrez gene",
            stats.rows_merged
        );
    }
    info!(
        "{} of {} gene-MeSH pairs have an Entrez ID, dropped {} of {} genes",
        stats.rows_mapped, stats.rows_in, stats.genes_dropped, stats.genes_in
    );

    (FinalTable { records }, stats)
}

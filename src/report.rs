//! The coverage report of a pipeline run
//!
//! The report lists the attrition of every step, so that coverage
//! regressions between two snapshots become visible. It is produced
//! on every run, even if nothing was dropped.
use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics};

use crate::aggregate::{AggregatedTable, JoinStats};
use crate::crosswalk::{Candidates, Crosswalk};
use crate::filter::DomainSelection;
use crate::mapper::{FinalTable, MappingStats};
use crate::Taxonomy;

/// Upper bounds (inclusive) of the evidence count buckets
const EVIDENCE_BUCKETS: [(u64, &str); 7] = [
    (0, "0"),
    (1, "1"),
    (5, "2-5"),
    (10, "6-10"),
    (50, "11-50"),
    (100, "51-100"),
    (1000, "101-1000"),
];
const EVIDENCE_OVERFLOW_BUCKET: &str = ">1000";

/// Summary of the loaded taxonomy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonomySummary {
    /// Tree prefix the taxonomy was restricted to
    pub prefix: Option<String>,
    /// Number of terms
    pub terms: usize,
    /// Number of tree positions
    pub positions: usize,
    /// Terms with more than one tree position
    pub polyhierarchic_terms: usize,
}

/// Summary of the domain selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSummary {
    /// The domain root
    pub domain_root: String,
    /// Diseases in the catalog
    pub catalog: usize,
    /// Diseases below the domain root
    pub filtered_in: usize,
}

/// Summary of building and resolving the crosswalk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosswalkSummary {
    /// Selected diseases with at least one edge
    pub mapped: usize,
    /// Selected diseases without any edge
    pub unmapped: usize,
    /// Share of mapped diseases, in percent
    pub mapped_pct: f64,
    /// MeSH descriptor cross-references of the selected diseases
    pub mesh_xrefs: usize,
    /// Descriptor cross-references that are not part of the taxonomy
    pub xrefs_outside_taxonomy: usize,
    /// MeSH cross-references that are not descriptor IDs
    pub non_descriptor_xrefs: usize,
    /// Cross-references into other vocabularies
    pub other_xrefs: usize,
    /// Resolved edges
    pub edges: usize,
    /// Distinct MeSH terms in the crosswalk
    pub mesh_terms: usize,
    /// Edges whose term had several tree positions
    pub resolved_polyhierarchy: usize,
}

/// Summary of the join between associations and crosswalk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationSummary {
    /// All associations
    pub records_in: usize,
    /// Associations with at least one edge
    pub records_joined: usize,
    /// Associations without edge
    pub records_dropped: usize,
    /// Dropped associations of selected, but unmapped diseases
    pub records_dropped_in_domain: usize,
    /// Evidence of all associations
    pub evidence_in: u64,
    /// Evidence of dropped associations
    pub evidence_dropped: u64,
    /// Rows after the join (fan-out)
    pub joined_rows: usize,
    /// Rows of the aggregated table
    pub gene_mesh_pairs: usize,
    /// Rows that combine several associations
    pub collapsed_pairs: usize,
}

/// Summary of the Entrez mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingSummary {
    /// Rows before mapping
    pub rows_in: usize,
    /// Rows of the final table
    pub rows_out: usize,
    /// Rows without Entrez ID
    pub rows_dropped: usize,
    /// Share of dropped rows, in percent
    pub drop_pct: f64,
    /// Genes before mapping
    pub genes_in: usize,
    /// Genes without Entrez ID
    pub genes_dropped: usize,
    /// Rows merged because of shared Entrez IDs
    pub rows_merged: usize,
    /// Dropped genes per category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped_by_category: Option<BTreeMap<String, usize>>,
    /// Distinct MeSH terms of the final table
    pub mesh_terms: usize,
    /// Distinct genes of the final table
    pub genes: usize,
}

/// A single bucket of the evidence distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// Range of the bucket
    pub label: &'static str,
    /// Number of rows within the range
    pub count: usize,
}

/// Distribution of the evidence counts of a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceDistribution {
    /// Number of rows
    pub rows: usize,
    /// Sum of all evidence
    pub total: u64,
    /// Median evidence count, `None` for an empty table
    pub median: Option<f64>,
    /// 90th percentile
    pub p90: Option<f64>,
    /// 99th percentile
    pub p99: Option<f64>,
    /// Rows per evidence range
    pub buckets: Vec<Bucket>,
}

impl EvidenceDistribution {
    /// Computes the distribution of the given evidence counts
    pub fn new<I: IntoIterator<Item = u64>>(evidence: I) -> Self {
        let values: Vec<u64> = evidence.into_iter().collect();
        let mut buckets: Vec<Bucket> = EVIDENCE_BUCKETS
            .iter()
            .map(|&(_, label)| Bucket { label, count: 0 })
            .chain(std::iter::once(Bucket {
                label: EVIDENCE_OVERFLOW_BUCKET,
                count: 0,
            }))
            .collect();
        for value in &values {
            let idx = EVIDENCE_BUCKETS
                .iter()
                .position(|(upper, _)| value <= upper)
                .unwrap_or(EVIDENCE_BUCKETS.len());
            buckets[idx].count += 1;
        }

        let total = values.iter().sum();
        let (median, p90, p99) = if values.is_empty() {
            (None, None, None)
        } else {
            #[allow(clippy::cast_precision_loss)]
            let mut data = Data::new(values.iter().map(|v| *v as f64).collect::<Vec<f64>>());
            (
                Some(data.quantile(0.5)),
                Some(data.quantile(0.9)),
                Some(data.quantile(0.99)),
            )
        };

        Self {
            rows: values.len(),
            total,
            median,
            p90,
            p99,
            buckets,
        }
    }
}

/// A selected disease without MeSH mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmappedDisease {
    /// ID of the disease
    pub id: String,
    /// Name of the disease
    pub name: String,
    /// Number of associations
    pub records: usize,
    /// Sum of evidence of all associations
    pub evidence: u64,
    /// Highest association score
    pub max_score: f64,
}

/// Audit of the selected diseases without MeSH mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmappedAudit {
    /// Unmapped diseases with at least one association
    pub with_associations: usize,
    /// Unmapped diseases without any association
    pub ghost_towns: usize,
    /// The unmapped diseases with the most evidence
    pub top_by_evidence: Vec<UnmappedDisease>,
}

/// The coverage report of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Taxonomy section
    pub taxonomy: TaxonomySummary,
    /// Source filter section
    pub filter: FilterSummary,
    /// Crosswalk section
    pub crosswalk: CrosswalkSummary,
    /// Aggregation section, absent if the pipeline stopped after the crosswalk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationSummary>,
    /// Audit of unmapped diseases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmapped: Option<UnmappedAudit>,
    /// Entrez mapping section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingSummary>,
    /// Evidence distribution of the final table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceDistribution>,
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        // rounded to two decimals to keep the report stable
        (part as f64 * 10_000.0 / total as f64).round() / 100.0
    }
}

impl CoverageReport {
    /// Creates the report sections of the crosswalk stages
    pub fn new(
        taxonomy: &Taxonomy,
        prefix: Option<String>,
        selection: &DomainSelection<'_>,
        candidates: &Candidates<'_>,
        crosswalk: &Crosswalk,
    ) -> Self {
        let stats = candidates.stats();
        Self {
            taxonomy: TaxonomySummary {
                prefix,
                terms: taxonomy.len(),
                positions: taxonomy.position_count(),
                polyhierarchic_terms: taxonomy.polyhierarchic_count(),
            },
            filter: FilterSummary {
                domain_root: selection.root().to_string(),
                catalog: selection.catalog_size(),
                filtered_in: selection.len(),
            },
            crosswalk: CrosswalkSummary {
                mapped: stats.mapped,
                unmapped: stats.unmapped,
                mapped_pct: percent(stats.mapped, stats.diseases),
                mesh_xrefs: stats.mesh_xrefs,
                xrefs_outside_taxonomy: stats.xrefs_outside_taxonomy,
                non_descriptor_xrefs: stats.non_descriptor_xrefs,
                other_xrefs: stats.other_xrefs,
                edges: crosswalk.len(),
                mesh_terms: crosswalk.term_count(),
                resolved_polyhierarchy: crosswalk.ambiguous_count(),
            },
            aggregation: None,
            unmapped: None,
            mapping: None,
            evidence: None,
        }
    }

    /// Adds the aggregation section and the audit of unmapped diseases
    ///
    /// `top` is the number of unmapped diseases listed in the audit
    pub fn add_aggregation(
        &mut self,
        stats: &JoinStats,
        table: &AggregatedTable,
        candidates: &Candidates<'_>,
        top: usize,
    ) {
        let mut unmapped: Vec<UnmappedDisease> = Vec::new();
        let mut ghost_towns = 0;
        for disease in candidates.unmapped() {
            match stats.dropped.get(disease.id()) {
                Some(dropped) => unmapped.push(UnmappedDisease {
                    id: disease.id().to_string(),
                    name: disease.name().to_string(),
                    records: dropped.records,
                    evidence: dropped.evidence,
                    max_score: dropped.max_score,
                }),
                None => ghost_towns += 1,
            }
        }
        let records_dropped_in_domain = unmapped.iter().map(|d| d.records).sum();
        let with_associations = unmapped.len();
        unmapped.sort_by(|a, b| b.evidence.cmp(&a.evidence).then_with(|| a.id.cmp(&b.id)));
        unmapped.truncate(top);

        self.aggregation = Some(AggregationSummary {
            records_in: stats.records_in,
            records_joined: stats.records_joined,
            records_dropped: stats.records_dropped,
            records_dropped_in_domain,
            evidence_in: stats.evidence_in,
            evidence_dropped: stats.evidence_dropped,
            joined_rows: stats.joined_rows,
            gene_mesh_pairs: table.len(),
            collapsed_pairs: table.collapsed_count(),
        });
        self.unmapped = Some(UnmappedAudit {
            with_associations,
            ghost_towns,
            top_by_evidence: unmapped,
        });
    }

    /// Adds the mapping section and the evidence distribution of the final table
    pub fn add_mapping(&mut self, stats: &MappingStats, table: &FinalTable) {
        self.mapping = Some(MappingSummary {
            rows_in: stats.rows_in,
            rows_out: table.len(),
            rows_dropped: stats.rows_dropped,
            drop_pct: percent(stats.rows_dropped, stats.rows_in),
            genes_in: stats.genes_in,
            genes_dropped: stats.genes_dropped,
            rows_merged: stats.rows_merged,
            dropped_by_category: stats.dropped_by_category.clone(),
            mesh_terms: table.term_count(),
            genes: table.gene_count(),
        });
        self.evidence = Some(EvidenceDistribution::new(
            table.iter().map(|record| record.total_evidence()),
        ));
    }

    /// Serializes the report as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn fmt_quantile(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

impl Display for CoverageReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "COVERAGE REPORT")?;
        writeln!(f)?;

        writeln!(f, "## Taxonomy")?;
        if let Some(prefix) = &self.taxonomy.prefix {
            writeln!(f, "Restricted to:           {prefix}")?;
        }
        writeln!(f, "Terms:                   {}", self.taxonomy.terms)?;
        writeln!(f, "Tree positions:          {}", self.taxonomy.positions)?;
        writeln!(f, "Polyhierarchic terms:    {}", self.taxonomy.polyhierarchic_terms)?;
        writeln!(f)?;

        writeln!(f, "## Source filter")?;
        writeln!(f, "Domain root:             {}", self.filter.domain_root)?;
        writeln!(f, "Diseases in catalog:     {}", self.filter.catalog)?;
        writeln!(f, "Diseases filtered in:    {}", self.filter.filtered_in)?;
        writeln!(f)?;

        let cw = &self.crosswalk;
        writeln!(f, "## Crosswalk")?;
        writeln!(f, "Mapped diseases:         {} ({:.2}%)", cw.mapped, cw.mapped_pct)?;
        writeln!(f, "Unmapped diseases:       {}", cw.unmapped)?;
        writeln!(f, "MeSH cross-references:   {}", cw.mesh_xrefs)?;
        writeln!(f, "  outside taxonomy:      {}", cw.xrefs_outside_taxonomy)?;
        writeln!(f, "  not a descriptor:      {}", cw.non_descriptor_xrefs)?;
        writeln!(f, "Other cross-references:  {}", cw.other_xrefs)?;
        writeln!(f, "Edges:                   {}", cw.edges)?;
        writeln!(f, "MeSH terms:              {}", cw.mesh_terms)?;
        writeln!(f, "Resolved polyhierarchy:  {}", cw.resolved_polyhierarchy)?;

        if let Some(agg) = &self.aggregation {
            writeln!(f)?;
            writeln!(f, "## Aggregation")?;
            writeln!(f, "Associations:            {}", agg.records_in)?;
            writeln!(f, "  joined:                {}", agg.records_joined)?;
            writeln!(f, "  dropped:               {}", agg.records_dropped)?;
            writeln!(f, "  dropped in domain:     {}", agg.records_dropped_in_domain)?;
            writeln!(f, "Evidence:                {}", agg.evidence_in)?;
            writeln!(f, "  dropped:               {}", agg.evidence_dropped)?;
            writeln!(f, "Joined rows:             {}", agg.joined_rows)?;
            writeln!(f, "Gene-MeSH pairs:         {}", agg.gene_mesh_pairs)?;
            writeln!(f, "  collapsed:             {}", agg.collapsed_pairs)?;
        }

        if let Some(audit) = &self.unmapped {
            writeln!(f)?;
            writeln!(f, "## Unmapped diseases")?;
            writeln!(f, "With associations:       {}", audit.with_associations)?;
            writeln!(f, "Without associations:    {}", audit.ghost_towns)?;
            if !audit.top_by_evidence.is_empty() {
                writeln!(f, "{:<16} {:<40} {:>10} {:>8} {:>9}", "Disease", "Name", "Evidence", "Records", "Max score")?;
                for disease in &audit.top_by_evidence {
                    let name: String = disease.name.chars().take(40).collect();
                    writeln!(
                        f,
                        "{:<16} {:<40} {:>10} {:>8} {:>9.4}",
                        disease.id, name, disease.evidence, disease.records, disease.max_score
                    )?;
                }
            }
        }

        if let Some(mapping) = &self.mapping {
            writeln!(f)?;
            writeln!(f, "## Entrez mapping")?;
            writeln!(f, "Rows:                    {}", mapping.rows_in)?;
            writeln!(f, "  mapped:                {}", mapping.rows_out)?;
            writeln!(f, "  dropped:               {} ({:.2}%)", mapping.rows_dropped, mapping.drop_pct)?;
            writeln!(f, "  merged:                {}", mapping.rows_merged)?;
            writeln!(f, "Genes dropped:           {} of {}", mapping.genes_dropped, mapping.genes_in)?;
            if let Some(categories) = &mapping.dropped_by_category {
                for (category, count) in categories {
                    writeln!(f, "  {category:<22} {count}")?;
                }
            }
            writeln!(f, "Final MeSH terms:        {}", mapping.mesh_terms)?;
            writeln!(f, "Final genes:             {}", mapping.genes)?;
        }

        if let Some(evidence) = &self.evidence {
            writeln!(f)?;
            writeln!(f, "## Evidence distribution")?;
            writeln!(f, "Rows:                    {}", evidence.rows)?;
            writeln!(f, "Total:                   {}", evidence.total)?;
            writeln!(f, "Median:                  {}", fmt_quantile(evidence.median))?;
            writeln!(f, "P90:                     {}", fmt_quantile(evidence.p90))?;
            writeln!(f, "P99:                     {}", fmt_quantile(evidence.p99))?;
            for bucket in &evidence.buckets {
                writeln!(f, "  {:<10} {}", bucket.label, bucket.count)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn evidence_buckets() {
        let distribution = EvidenceDistribution::new(vec![0, 1, 2, 5, 6, 10, 11, 50, 51, 100, 101, 1000, 1001]);
        let counts: Vec<usize> = distribution.buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 2, 2, 2, 2, 2, 1]);
        assert_eq!(distribution.rows, 13);
        assert_eq!(distribution.total, 2338);
        assert_eq!(distribution.buckets.last().unwrap().label, ">1000");
    }

    #[test]
    fn empty_distribution() {
        let distribution = EvidenceDistribution::new(Vec::new());
        assert_eq!(distribution.rows, 0);
        assert!(distribution.median.is_none());
        assert!(distribution.buckets.iter().all(|b| b.count == 0));
        assert_eq!(distribution.buckets.len(), 8);
    }

    #[test]
    fn median_of_single_value() {
        let distribution = EvidenceDistribution::new(vec![15]);
        assert_eq!(distribution.median, Some(15.0));
        assert_eq!(distribution.p99, Some(15.0));
    }

    #[test]
    fn percentages() {
        assert_eq!(percent(1, 3), 33.33);
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(5, 5), 100.0);
    }
}

//! Staged execution of a complete crosswalk run
use tracing::{info, warn};

use crate::aggregate::{aggregate, aggregate_chunked};
use crate::crosswalk::{build_candidates, resolve};
use crate::filter::select_domain;
use crate::mapper::{map_to_entrez, EntrezMap, GeneCategories};
use crate::report::CoverageReport;
use crate::writer::OutputDir;
use crate::{Association, Config, CrosswalkError, CrosswalkResult, DiseaseCatalog, Taxonomy};

/// How far the pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Stop after the polyhierarchy resolver
    Crosswalk,
    /// Run all steps up to the final Entrez table
    Full,
}

impl Stage {
    fn needs(self, input: &str) -> bool {
        match self {
            Stage::Full => true,
            Stage::Crosswalk => matches!(input, "diseases" | "taxonomy"),
        }
    }
}

/// Verifies that every input needed for `stage` exists
///
/// # Errors
///
/// [`CrosswalkError::MissingInput`] naming the first missing file
pub fn check_inputs(config: &Config, stage: Stage) -> CrosswalkResult<()> {
    for (name, path) in config.inputs() {
        if stage.needs(name) && !path.is_file() {
            return Err(CrosswalkError::MissingInput(format!(
                "{name}: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

/// All input snapshots of a run
///
/// Snapshots are loaded completely before any processing starts, so that
/// a malformed input never leaves partial output behind.
#[derive(Debug)]
pub struct Snapshots {
    taxonomy: Taxonomy,
    catalog: DiseaseCatalog,
    associations: Vec<Association>,
    entrez: EntrezMap,
    categories: Option<GeneCategories>,
}

impl Snapshots {
    /// Loads the snapshots needed for `stage`
    ///
    /// The taxonomy is restricted to the configured prefix right away.
    ///
    /// # Errors
    ///
    /// - [`CrosswalkError::MissingInput`]: An input does not exist
    /// - [`CrosswalkError::SchemaMismatch`]: An input is malformed
    /// - [`CrosswalkError::InvariantViolation`]: An association has an invalid score or evidence count
    pub fn load(config: &Config, stage: Stage) -> CrosswalkResult<Self> {
        check_inputs(config, stage)?;
        let paths = &config.paths;

        let mut taxonomy = Taxonomy::from_tsv(&paths.taxonomy)?;
        if let Some(prefix) = config.taxonomy_prefix()? {
            taxonomy = taxonomy.restrict_to(&prefix);
        }
        if taxonomy.is_empty() {
            warn!("The taxonomy does not contain any term");
        }
        info!(
            "Loaded {} MeSH terms with {} tree positions",
            taxonomy.len(),
            taxonomy.position_count()
        );
        let catalog = DiseaseCatalog::from_tsv(&paths.diseases)?;

        let mut snapshots = Snapshots {
            taxonomy,
            catalog,
            associations: Vec::new(),
            entrez: EntrezMap::default(),
            categories: None,
        };
        if stage == Stage::Crosswalk {
            return Ok(snapshots);
        }

        snapshots.associations = Association::from_tsv(&paths.associations)?;
        snapshots.entrez = EntrezMap::from_tsv(&paths.entrez_map, config.entrez.tax_id)?;
        snapshots.categories = paths
            .gene_categories
            .as_deref()
            .map(GeneCategories::from_tsv)
            .transpose()?;
        Ok(snapshots)
    }

    /// The restricted taxonomy
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// The complete disease catalog
    pub fn catalog(&self) -> &DiseaseCatalog {
        &self.catalog
    }

    /// All associations, empty when only the crosswalk is built
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs the pipeline and writes all outputs to the configured output directory
///
/// ```mermaid
/// graph TD
///   T[taxonomy TSV] --> TX[Taxonomy]
///   D[disease TSV] --> F[select_domain]
///   TX --> B[build_candidates]
///   F --> B
///   B --> R[resolve]
///   R --> CW[(disease_mesh_crosswalk.tsv)]
///   A[associations TSV] --> AG[aggregate]
///   R --> AG
///   AG --> PE[(gene_mesh_pre_entrez.tsv)]
///   E[Entrez map TSV] --> M[map_to_entrez]
///   AG --> M
///   M --> FT[(gene_disease_mesh_final.tsv)]
///   B --> REP[(coverage report)]
///   AG --> REP
///   M --> REP
/// ```
///
/// With [`Stage::Crosswalk`] the pipeline only writes the crosswalk and the
/// report sections up to the resolver. Gene tables of an earlier full run
/// in the same directory are removed.
///
/// Every step consumes the complete output of the previous one. Outputs are
/// only written after all steps succeeded. Running the pipeline twice on the
/// same snapshots produces byte-identical files.
///
/// # Errors
///
/// - [`CrosswalkError::MissingInput`]: An input does not exist
/// - [`CrosswalkError::SchemaMismatch`]: An input is malformed
/// - [`CrosswalkError::InvariantViolation`]: The data violates a structural invariant
/// - [`CrosswalkError::Io`]: The outputs cannot be written
pub fn run(config: &Config, stage: Stage) -> CrosswalkResult<CoverageReport> {
    let domain_root = config.domain_root()?;
    let rule = config.resolver_rule()?;
    let prefix = config.taxonomy_prefix()?;
    let snapshots = Snapshots::load(config, stage)?;

    let selection = select_domain(snapshots.catalog(), &domain_root, config.exclude_root);
    let candidates = build_candidates(&selection, snapshots.taxonomy());
    let crosswalk = resolve(&candidates, &rule)?;
    let mut report = CoverageReport::new(
        snapshots.taxonomy(),
        prefix.map(|prefix| prefix.to_string()),
        &selection,
        &candidates,
        &crosswalk,
    );

    let tables = if stage == Stage::Full {
        let (table, join_stats) = match config.chunk_size {
            Some(chunk_size) => aggregate_chunked(snapshots.associations(), &crosswalk, chunk_size),
            None => aggregate(snapshots.associations(), &crosswalk),
        };
        report.add_aggregation(&join_stats, &table, &candidates, config.report.top_unmapped);
        let (final_table, mapping_stats) =
            map_to_entrez(&table, &snapshots.entrez, snapshots.categories.as_ref());
        report.add_mapping(&mapping_stats, &final_table);
        Some((table, final_table))
    } else {
        None
    };

    let output = OutputDir::create(&config.paths.output_dir)?;
    output.crosswalk(&crosswalk, snapshots.taxonomy())?;
    match &tables {
        Some((table, final_table)) => {
            output.pre_entrez_table(table)?;
            output.final_table(final_table)?;
        }
        None => output.remove_gene_tables()?,
    }
    output.report(&report)?;
    info!("Wrote outputs to {}", config.paths.output_dir.display());
    Ok(report)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    #[test]
    fn crosswalk_stage_needs_fewer_inputs() {
        assert!(Stage::Crosswalk.needs("taxonomy"));
        assert!(Stage::Crosswalk.needs("diseases"));
        assert!(!Stage::Crosswalk.needs("associations"));
        assert!(!Stage::Crosswalk.needs("gene_categories"));
        assert!(Stage::Full.needs("entrez_map"));
    }

    #[test]
    fn missing_input_is_reported_before_any_step() {
        let yaml = "
paths:
  diseases: does_not_exist/diseases.tsv
  taxonomy: does_not_exist/mesh_tree.tsv
  associations: does_not_exist/associations.tsv
  entrez_map: does_not_exist/gene2ensembl.tsv
  output_dir: does_not_exist/out
";
        let config = Config::from_yaml(yaml, Path::new("/nonexistent")).unwrap();
        let err = run(&config, Stage::Full).unwrap_err();
        assert!(matches!(err, CrosswalkError::MissingInput(_)));
        assert!(!Path::new("/nonexistent/does_not_exist/out").exists());
    }
}

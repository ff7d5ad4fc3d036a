//! Configuration of a pipeline run
//!
//! The configuration is a YAML file. Only the input and output paths are
//! required, everything else has a default:
//!
//! ```yaml
//! paths:
//!   diseases: snapshots/diseases.tsv
//!   taxonomy: snapshots/mesh_tree.tsv
//!   associations: snapshots/associations.tsv
//!   entrez_map: snapshots/gene2ensembl.tsv
//!   gene_categories: snapshots/biotypes.tsv   # optional
//!   output_dir: out
//! domain_root: EFO_0000616
//! exclude_root: true
//! taxonomy_prefix: C04.588                  # null keeps the whole taxonomy
//! resolver:
//!   specificity: deepest                    # or shallowest
//!   preferred_branches: []
//! entrez:
//!   tax_id: 9606
//! report:
//!   top_unmapped: 20
//! chunk_size: null                          # aggregate in chunks of n associations
//! ```
//!
//! Relative paths are resolved against the directory of the config file.
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::crosswalk::{ResolverRule, Specificity};
use crate::{CrosswalkError, CrosswalkResult, DiseaseId, TreeNumber};

fn default_domain_root() -> String {
    crate::DEFAULT_DOMAIN_ROOT.to_string()
}

fn default_exclude_root() -> bool {
    true
}

fn default_taxonomy_prefix() -> Option<String> {
    Some(crate::DEFAULT_TAXONOMY_PREFIX.to_string())
}

fn default_tax_id() -> u32 {
    crate::HUMAN_TAX_ID
}

fn default_top_unmapped() -> usize {
    crate::DEFAULT_TOP_UNMAPPED
}

/// Input snapshots and the output directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Paths {
    /// Disease catalog
    pub diseases: PathBuf,
    /// MeSH tree-position catalog
    pub taxonomy: PathBuf,
    /// Gene-disease associations
    pub associations: PathBuf,
    /// Ensembl to Entrez mapping
    pub entrez_map: PathBuf,
    /// Optional gene biotypes
    #[serde(default)]
    pub gene_categories: Option<PathBuf>,
    /// Directory of all output files
    pub output_dir: PathBuf,
}

impl Paths {
    fn resolve(&mut self, base: &Path) {
        for path in [
            &mut self.diseases,
            &mut self.taxonomy,
            &mut self.associations,
            &mut self.entrez_map,
            &mut self.output_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        if let Some(path) = &mut self.gene_categories {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Settings of the polyhierarchy resolver
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// Depth preference
    #[serde(default)]
    pub specificity: Specificity,
    /// Tree-number prefixes that win ties, in order of preference
    #[serde(default)]
    pub preferred_branches: Vec<String>,
}

/// Settings of the Entrez mapping
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntrezConfig {
    /// NCBI taxonomy ID used to filter `gene2ensembl` rows
    #[serde(default = "default_tax_id")]
    pub tax_id: u32,
}

impl Default for EntrezConfig {
    fn default() -> Self {
        Self {
            tax_id: default_tax_id(),
        }
    }
}

/// Settings of the coverage report
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Number of unmapped diseases listed in the audit
    #[serde(default = "default_top_unmapped")]
    pub top_unmapped: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_unmapped: default_top_unmapped(),
        }
    }
}

/// The configuration of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Input and output paths
    pub paths: Paths,
    /// Disease that defines the therapeutic domain
    #[serde(default = "default_domain_root")]
    pub domain_root: String,
    /// Whether the domain root itself is excluded from the selection
    #[serde(default = "default_exclude_root")]
    pub exclude_root: bool,
    /// Subtree of the taxonomy to keep, `None` keeps all of it
    #[serde(default = "default_taxonomy_prefix")]
    pub taxonomy_prefix: Option<String>,
    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Entrez mapping settings
    #[serde(default)]
    pub entrez: EntrezConfig,
    /// Report settings
    #[serde(default)]
    pub report: ReportConfig,
    /// Aggregate the associations in chunks of this size
    #[serde(default)]
    pub chunk_size: Option<usize>,
}

impl Config {
    /// Reads the configuration from a YAML file
    ///
    /// # Errors
    ///
    /// - [`CrosswalkError::MissingInput`]: The file does not exist
    /// - [`CrosswalkError::Config`]: The file is not a valid configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> CrosswalkResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CrosswalkError::MissingInput(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        debug!("Reading configuration from {}", path.display());
        Self::from_yaml(&content, base)
    }

    /// Parses the configuration from a YAML string
    ///
    /// Relative paths are resolved against `base`.
    ///
    /// # Errors
    ///
    /// [`CrosswalkError::Config`] if the YAML is invalid, a required field
    /// is missing or an identifier is malformed
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use otmesh::Config;
    ///
    /// let yaml = "
    /// paths:
    ///   diseases: diseases.tsv
    ///   taxonomy: mesh_tree.tsv
    ///   associations: associations.tsv
    ///   entrez_map: gene2ensembl.tsv
    ///   output_dir: out
    /// ";
    /// let config = Config::from_yaml(yaml, Path::new("/data")).unwrap();
    /// assert_eq!(config.domain_root, "EFO_0000616");
    /// assert_eq!(config.paths.diseases, Path::new("/data/diseases.tsv"));
    /// ```
    pub fn from_yaml(content: &str, base: &Path) -> CrosswalkResult<Self> {
        let mut config: Config =
            serde_yaml::from_str(content).map_err(|err| CrosswalkError::Config(err.to_string()))?;
        config.paths.resolve(base);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CrosswalkResult<()> {
        self.domain_root()?;
        self.taxonomy_prefix()?;
        self.resolver_rule()?;
        if self.chunk_size == Some(0) {
            return Err(CrosswalkError::Config("chunk_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Replaces the output directory
    pub fn set_output_dir<P: Into<PathBuf>>(&mut self, output_dir: P) {
        self.paths.output_dir = output_dir.into();
    }

    /// The domain root as [`DiseaseId`]
    ///
    /// # Errors
    ///
    /// [`CrosswalkError::Config`] if the ID is malformed
    pub fn domain_root(&self) -> CrosswalkResult<DiseaseId> {
        DiseaseId::try_from(self.domain_root.as_str())
            .map_err(|err| CrosswalkError::Config(format!("domain_root: {err}")))
    }

    /// The taxonomy prefix as [`TreeNumber`]
    ///
    /// # Errors
    ///
    /// [`CrosswalkError::Config`] if the prefix is not a valid tree number
    pub fn taxonomy_prefix(&self) -> CrosswalkResult<Option<TreeNumber>> {
        self.taxonomy_prefix
            .as_deref()
            .map(|prefix| {
                TreeNumber::try_from(prefix)
                    .map_err(|err| CrosswalkError::Config(format!("taxonomy_prefix: {err}")))
            })
            .transpose()
    }

    /// The rule of the polyhierarchy resolver
    ///
    /// # Errors
    ///
    /// [`CrosswalkError::Config`] if a preferred branch is not a valid tree number
    pub fn resolver_rule(&self) -> CrosswalkResult<ResolverRule> {
        let branches = self
            .resolver
            .preferred_branches
            .iter()
            .map(|branch| {
                TreeNumber::try_from(branch.as_str()).map_err(|err| {
                    CrosswalkError::Config(format!("resolver.preferred_branches: {err}"))
                })
            })
            .collect::<CrosswalkResult<Vec<TreeNumber>>>()?;
        Ok(ResolverRule::new(self.resolver.specificity, branches))
    }

    /// All input files with a descriptive name
    pub fn inputs(&self) -> Vec<(&'static str, &Path)> {
        let mut inputs = vec![
            ("diseases", self.paths.diseases.as_path()),
            ("taxonomy", self.paths.taxonomy.as_path()),
            ("associations", self.paths.associations.as_path()),
            ("entrez_map", self.paths.entrez_map.as_path()),
        ];
        if let Some(categories) = &self.paths.gene_categories {
            inputs.push(("gene_categories", categories.as_path()));
        }
        inputs
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MINIMAL: &str = "
paths:
  diseases: diseases.tsv
  taxonomy: mesh_tree.tsv
  associations: associations.tsv
  entrez_map: gene2ensembl.tsv
  output_dir: out
";

    #[test]
    fn defaults() {
        let config = Config::from_yaml(MINIMAL, Path::new("/data")).unwrap();
        assert_eq!(config.domain_root, "EFO_0000616");
        assert!(config.exclude_root);
        assert_eq!(config.taxonomy_prefix.as_deref(), Some("C04.588"));
        assert_eq!(config.resolver.specificity, Specificity::Deepest);
        assert!(config.resolver.preferred_branches.is_empty());
        assert_eq!(config.entrez.tax_id, 9606);
        assert_eq!(config.report.top_unmapped, 20);
        assert!(config.chunk_size.is_none());
        assert!(config.paths.gene_categories.is_none());
        assert_eq!(config.inputs().len(), 4);
    }

    #[test]
    fn relative_and_absolute_paths() {
        let yaml = MINIMAL.replace("output_dir: out", "output_dir: /tmp/out\n  gene_categories: biotypes.tsv");
        let config = Config::from_yaml(&yaml, Path::new("/data")).unwrap();
        assert_eq!(config.paths.taxonomy, Path::new("/data/mesh_tree.tsv"));
        assert_eq!(config.paths.output_dir, Path::new("/tmp/out"));
        assert_eq!(
            config.paths.gene_categories.as_deref(),
            Some(Path::new("/data/biotypes.tsv"))
        );
        assert_eq!(config.inputs().len(), 5);
    }

    #[test]
    fn overrides() {
        let yaml = format!(
            "{MINIMAL}taxonomy_prefix: null\nexclude_root: false\nresolver:\n  specificity: shallowest\n  preferred_branches: [C04.588.180, C17]\n"
        );
        let config = Config::from_yaml(&yaml, Path::new("")).unwrap();
        assert!(config.taxonomy_prefix().unwrap().is_none());
        assert!(!config.exclude_root);
        let rule = config.resolver_rule().unwrap();
        assert_eq!(rule.specificity(), Specificity::Shallowest);
        assert_eq!(rule.preferred_branches().len(), 2);
        assert_eq!(rule.preferred_branches()[1].as_str(), "C17");
    }

    #[test]
    fn missing_path() {
        let yaml = MINIMAL.replace("  output_dir: out\n", "");
        assert!(matches!(
            Config::from_yaml(&yaml, Path::new("")),
            Err(CrosswalkError::Config(_))
        ));
    }

    #[test]
    fn unknown_field() {
        let yaml = format!("{MINIMAL}domainroot: EFO_0000616\n");
        assert!(matches!(
            Config::from_yaml(&yaml, Path::new("")),
            Err(CrosswalkError::Config(_))
        ));
    }

    #[test]
    fn invalid_values() {
        for extra in [
            "taxonomy_prefix: 'C04..588'\n",
            "domain_root: ''\n",
            "resolver:\n  preferred_branches: ['C 04']\n",
            "resolver:\n  specificity: random\n",
            "chunk_size: 0\n",
        ] {
            let yaml = format!("{MINIMAL}{extra}");
            assert!(
                matches!(Config::from_yaml(&yaml, Path::new("")), Err(CrosswalkError::Config(_))),
                "{extra}"
            );
        }
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::from_file("/does/not/exist.yaml"),
            Err(CrosswalkError::MissingInput(_))
        ));
    }
}

//! Tab-separated output tables
//!
//! All writers are generic over [`Write`] and emit rows in the order of the
//! given table, so the output of two runs on the same input is identical.
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::aggregate::AggregatedTable;
use crate::mapper::FinalTable;
use crate::report::CoverageReport;
use crate::{Crosswalk, CrosswalkError, CrosswalkResult, Taxonomy};

pub(crate) const FINAL_TABLE: &str = "gene_disease_mesh_final.tsv";
pub(crate) const PRE_ENTREZ_TABLE: &str = "gene_mesh_pre_entrez.tsv";
pub(crate) const CROSSWALK_TABLE: &str = "disease_mesh_crosswalk.tsv";
pub(crate) const REPORT_JSON: &str = "coverage_report.json";
pub(crate) const REPORT_TEXT: &str = "coverage_report.txt";

pub(crate) fn write_final_table<W: Write>(table: &FinalTable, mut out: W) -> CrosswalkResult<()> {
    writeln!(out, "disease_mesh_id\tgene_entrez_id\tot_score\tevidence_count")?;
    for record in table {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            record.mesh(),
            record.entrez(),
            record.max_score(),
            record.total_evidence()
        )?;
    }
    out.flush()?;
    Ok(())
}

pub(crate) fn write_pre_entrez_table<W: Write>(
    table: &AggregatedTable,
    mut out: W,
) -> CrosswalkResult<()> {
    writeln!(out, "ensembl_gene_id\tdisease_mesh_id\tot_score\tevidence_count")?;
    for record in table {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            record.gene(),
            record.mesh(),
            record.max_score(),
            record.total_evidence()
        )?;
    }
    out.flush()?;
    Ok(())
}

pub(crate) fn write_crosswalk<W: Write>(
    crosswalk: &Crosswalk,
    taxonomy: &Taxonomy,
    mut out: W,
) -> CrosswalkResult<()> {
    writeln!(out, "disease_id\tmesh_id\tmesh_name\ttree_number\tdepth\ttree_positions")?;
    for edge in crosswalk.edges() {
        let name = taxonomy
            .get(&edge.mesh())
            .map(|term| term.name())
            .ok_or_else(|| {
                CrosswalkError::InvariantViolation(format!("{} is not part of the taxonomy", edge.mesh()))
            })?;
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            edge.disease(),
            edge.mesh(),
            name,
            edge.tree_number(),
            edge.depth(),
            edge.candidate_positions()
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the output files of a run into one directory
pub(crate) struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Creates the directory if it does not exist yet
    pub fn create(path: &Path) -> CrosswalkResult<Self> {
        fs::create_dir_all(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn file(&self, name: &str) -> CrosswalkResult<BufWriter<File>> {
        let path = self.path.join(name);
        debug!("Writing {}", path.display());
        Ok(BufWriter::new(File::create(path)?))
    }

    pub fn final_table(&self, table: &FinalTable) -> CrosswalkResult<()> {
        write_final_table(table, self.file(FINAL_TABLE)?)
    }

    pub fn pre_entrez_table(&self, table: &AggregatedTable) -> CrosswalkResult<()> {
        write_pre_entrez_table(table, self.file(PRE_ENTREZ_TABLE)?)
    }

    pub fn crosswalk(&self, crosswalk: &Crosswalk, taxonomy: &Taxonomy) -> CrosswalkResult<()> {
        write_crosswalk(crosswalk, taxonomy, self.file(CROSSWALK_TABLE)?)
    }

    /// Deletes the gene tables of an earlier full run
    ///
    /// Keeps the directory consistent with a report that has no mapping section.
    pub fn remove_gene_tables(&self) -> CrosswalkResult<()> {
        for name in [PRE_ENTREZ_TABLE, FINAL_TABLE] {
            let path = self.path.join(name);
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale {}", path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    pub fn report(&self, report: &CoverageReport) -> CrosswalkResult<()> {
        let json = report
            .to_json()
            .map_err(|err| CrosswalkError::InvariantViolation(format!("unable to serialize report: {err}")))?;
        let mut out = self.file(REPORT_JSON)?;
        writeln!(out, "{json}")?;
        out.flush()?;

        let mut out = self.file(REPORT_TEXT)?;
        write!(out, "{report}")?;
        out.flush()?;
        Ok(())
    }
}

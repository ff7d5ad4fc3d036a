//! Parsing the tabular snapshots of Open Targets, MeSH and NCBI
//!
//! All inputs are tab-separated files with a header line. Columns are
//! looked up by name, so additional columns and a different column order
//! are fine. A leading `#` of the header line is ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::{CrosswalkError, CrosswalkResult};

fn schema_mismatch<S: Into<String>>(file: &str, line: usize, reason: S) -> CrosswalkError {
    CrosswalkError::SchemaMismatch {
        file: file.to_string(),
        line,
        reason: reason.into(),
    }
}

/// Line-based reader of a tab-separated table with header
pub(crate) struct TsvReader<R> {
    name: String,
    lines: Lines<R>,
    header: Vec<String>,
}

impl TsvReader<BufReader<File>> {
    /// Opens the file and reads the header line
    pub fn open<P: AsRef<Path>>(file: P) -> CrosswalkResult<Self> {
        let filename = file.as_ref().display().to_string();
        let file = File::open(file).map_err(|_| CrosswalkError::CannotOpenFile(filename.clone()))?;
        TsvReader::new(&filename, BufReader::new(file))
    }
}

impl<R: BufRead> TsvReader<R> {
    /// Reads the header line from `reader`
    pub fn new(name: &str, reader: R) -> CrosswalkResult<Self> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(_)) => return Err(schema_mismatch(name, 1, "invalid data in header")),
            None => return Err(schema_mismatch(name, 0, "a header line is required")),
        };
        let header = header
            .trim_end_matches('\r')
            .trim_start_matches('#')
            .split('\t')
            .map(|col| col.trim().to_string())
            .collect();
        Ok(Self {
            name: name.to_string(),
            lines,
            header,
        })
    }

    /// Returns `true` if the header contains the column
    pub fn has_column(&self, column: &str) -> bool {
        self.header.iter().any(|col| col == column)
    }

    /// Returns the indices of the required columns
    ///
    /// # Errors
    ///
    /// [`CrosswalkError::SchemaMismatch`] if any of the columns is absent
    pub fn columns(&self, required: &[&str]) -> CrosswalkResult<Vec<usize>> {
        required
            .iter()
            .map(|column| {
                self.header
                    .iter()
                    .position(|col| col == column)
                    .ok_or_else(|| {
                        schema_mismatch(&self.name, 1, format!("required column '{column}' is missing"))
                    })
            })
            .collect()
    }

    /// Calls `f` for every non-empty data line
    ///
    /// `columns` is usually the output of [`TsvReader::columns`] and
    /// defines the fields that are accessible via [`Record::get`].
    pub fn for_each_record<F>(self, columns: &[usize], mut f: F) -> CrosswalkResult<()>
    where
        F: FnMut(&Record<'_>) -> CrosswalkResult<()>,
    {
        let TsvReader { name, lines, .. } = self;
        for (idx, line) in lines.enumerate() {
            // the header is line 1
            let line_no = idx + 2;
            let line = line.map_err(|_| schema_mismatch(&name, line_no, "invalid data"))?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let record = Record {
                name: &name,
                line: line_no,
                fields: line.split('\t').collect(),
                columns,
            };
            f(&record)?;
        }
        Ok(())
    }
}

/// A single data line of a [`TsvReader`]
pub(crate) struct Record<'a> {
    name: &'a str,
    line: usize,
    fields: Vec<&'a str>,
    columns: &'a [usize],
}

impl<'a> Record<'a> {
    /// Returns the value of the `idx`-th requested column
    pub fn get(&self, idx: usize) -> CrosswalkResult<&'a str> {
        self.columns
            .get(idx)
            .and_then(|col| self.fields.get(*col))
            .map(|value| value.trim())
            .ok_or_else(|| self.mismatch("line has too few columns"))
    }

    /// Creates a [`CrosswalkError::SchemaMismatch`] for this line
    pub fn mismatch<S: Into<String>>(&self, reason: S) -> CrosswalkError {
        schema_mismatch(self.name, self.line, reason)
    }

    /// Adds the location of this line to invariant violations
    pub fn locate(&self, err: CrosswalkError) -> CrosswalkError {
        match err {
            CrosswalkError::InvariantViolation(msg) => CrosswalkError::InvariantViolation(format!(
                "{msg} ({}, line {})",
                self.name, self.line
            )),
            CrosswalkError::InvalidId(msg) => self.mismatch(msg),
            other => other,
        }
    }
}

/// Splits a `|`-separated list column, ignoring empty items
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split('|').map(str::trim).filter(|item| !item.is_empty())
}

/// Module to parse the MeSH tree-position catalog
///
/// ```text
/// mesh_id mesh_name                   tree_number             level
/// D001943 Breast Neoplasms            C04.588.180             3
/// D008175 Lung Neoplasms              C04.588.894.797.520     5
/// D008175 Lung Neoplasms              C08.381.540             3
/// ```
pub(crate) mod mesh_tree {
    use std::io::BufRead;
    use std::path::Path;

    use tracing::{debug, warn};

    use super::TsvReader;
    use crate::taxonomy::TaxonomyBuilder;
    use crate::term::{MeshId, TreeNumber};
    use crate::CrosswalkResult;

    pub fn parse<P: AsRef<Path>>(file: P, builder: &mut TaxonomyBuilder) -> CrosswalkResult<()> {
        read(TsvReader::open(file)?, builder)
    }

    pub(crate) fn read<R: BufRead>(
        reader: TsvReader<R>,
        builder: &mut TaxonomyBuilder,
    ) -> CrosswalkResult<()> {
        let columns = reader.columns(&["mesh_id", "mesh_name", "tree_number", "level"])?;
        let mut rows = 0usize;
        reader.for_each_record(&columns, |record| {
            let id = MeshId::try_from(record.get(0)?).map_err(|err| record.locate(err))?;
            let name = record.get(1)?;
            let tree_number =
                TreeNumber::try_from(record.get(2)?).map_err(|err| record.locate(err))?;
            let level = match record.get(3)?.parse::<usize>() {
                Ok(level) if level > 0 => level,
                _ => return Err(record.mismatch("level must be a positive integer")),
            };
            if level != tree_number.depth() {
                warn!(
                    "{} is listed at level {} but has depth {}",
                    tree_number,
                    level,
                    tree_number.depth()
                );
            }
            builder.add_position(id, name, tree_number);
            rows += 1;
            Ok(())
        })?;
        debug!("Parsed {} tree positions", rows);
        Ok(())
    }

    #[cfg(test)]
    mod test_mesh_tree {
        use super::*;
        use crate::taxonomy::Taxonomy;
        use crate::CrosswalkError;

        fn taxonomy(data: &str) -> CrosswalkResult<Taxonomy> {
            let mut builder = Taxonomy::builder();
            read(TsvReader::new("mesh", data.as_bytes())?, &mut builder)?;
            Ok(builder.build())
        }

        #[test]
        fn parse_positions() {
            let data = "mesh_id\tmesh_name\ttree_number\tlevel\n\
                        D001943\tBreast Neoplasms\tC04.588.180\t3\n\
                        D008175\tLung Neoplasms\tC04.588.894.797.520\t5\n\
                        D008175\tLung Neoplasms\tC08.381.540\t3\n";
            let taxonomy = taxonomy(data).expect("valid catalog");
            assert_eq!(taxonomy.len(), 2);
            assert_eq!(taxonomy.position_count(), 3);
            let lung = taxonomy
                .get(&MeshId::try_from("D008175").unwrap())
                .expect("lung is present");
            assert_eq!(lung.positions()[0].depth(), 5);
        }

        #[test]
        fn column_order_does_not_matter() {
            let data = "tree_number\tlevel\tmesh_id\tmesh_name\n\
                        C04.588.180\t3\tD001943\tBreast Neoplasms\n";
            assert_eq!(taxonomy(data).expect("valid catalog").len(), 1);
        }

        #[test]
        fn level_mismatch_uses_tree_depth() {
            let data = "mesh_id\tmesh_name\ttree_number\tlevel\n\
                        D001943\tBreast Neoplasms\tC04.588.180\t4\n";
            let taxonomy = taxonomy(data).expect("mismatching level is only a warning");
            let term = taxonomy.terms().next().unwrap();
            assert_eq!(term.positions()[0].depth(), 3);
        }

        #[test]
        fn missing_column() {
            let data = "mesh_id\tmesh_name\ttree_number\nD001943\tBreast Neoplasms\tC04.588.180\n";
            assert!(matches!(
                taxonomy(data),
                Err(CrosswalkError::SchemaMismatch { line: 1, .. })
            ));
        }

        #[test]
        fn invalid_level() {
            let data = "mesh_id\tmesh_name\ttree_number\tlevel\n\
                        D001943\tBreast Neoplasms\tC04.588.180\tthree\n";
            assert!(matches!(
                taxonomy(data),
                Err(CrosswalkError::SchemaMismatch { line: 2, .. })
            ));
        }

        #[test]
        fn invalid_mesh_id() {
            let data = "mesh_id\tmesh_name\ttree_number\tlevel\n\
                        X001943\tBreast Neoplasms\tC04.588.180\t3\n";
            assert!(matches!(
                taxonomy(data),
                Err(CrosswalkError::SchemaMismatch { line: 2, .. })
            ));
        }

        #[test]
        fn empty_file() {
            assert!(matches!(
                taxonomy(""),
                Err(CrosswalkError::SchemaMismatch { line: 0, .. })
            ));
        }
    }
}

/// Module to parse the Open Targets disease index
///
/// ```text
/// id          name                ancestors                       db_xrefs
/// EFO_0000305 breast carcinoma    EFO_0000616|MONDO_0002120       MeSH:D001943|OMIM:114480
/// ```
pub(crate) mod disease_index {
    use std::io::BufRead;
    use std::path::Path;

    use tracing::debug;

    use super::{split_list, TsvReader};
    use crate::annotations::{Disease, DiseaseCatalog, DiseaseId};
    use crate::CrosswalkResult;

    pub fn parse<P: AsRef<Path>>(file: P, catalog: &mut DiseaseCatalog) -> CrosswalkResult<()> {
        read(TsvReader::open(file)?, catalog)
    }

    pub(crate) fn read<R: BufRead>(
        reader: TsvReader<R>,
        catalog: &mut DiseaseCatalog,
    ) -> CrosswalkResult<()> {
        let columns = reader.columns(&["id", "name", "ancestors", "db_xrefs"])?;
        reader.for_each_record(&columns, |record| {
            let id = DiseaseId::try_from(record.get(0)?).map_err(|err| record.locate(err))?;
            let mut disease = Disease::new(id, record.get(1)?);
            for ancestor in split_list(record.get(2)?) {
                let ancestor = DiseaseId::try_from(ancestor).map_err(|err| record.locate(err))?;
                disease.add_ancestor(ancestor);
            }
            for xref in split_list(record.get(3)?) {
                disease.add_xref(xref);
            }
            catalog.insert(disease);
            Ok(())
        })?;
        debug!("Parsed {} diseases", catalog.len());
        Ok(())
    }

}

/// Module to parse gene–disease associations
///
/// ```text
/// targetId        diseaseId   score   evidenceCount
/// ENSG00000141510 EFO_0000305 0.82    154
/// ```
pub(crate) mod associations {
    use std::io::BufRead;
    use std::path::Path;

    use tracing::debug;

    use super::TsvReader;
    use crate::annotations::{Association, DiseaseId, EnsemblGeneId};
    use crate::{CrosswalkError, CrosswalkResult};

    pub fn parse<P: AsRef<Path>>(file: P) -> CrosswalkResult<Vec<Association>> {
        read(TsvReader::open(file)?)
    }

    pub(crate) fn read<R: BufRead>(reader: TsvReader<R>) -> CrosswalkResult<Vec<Association>> {
        let columns = reader.columns(&["targetId", "diseaseId", "score", "evidenceCount"])?;
        let mut associations = Vec::new();
        reader.for_each_record(&columns, |record| {
            let gene = EnsemblGeneId::try_from(record.get(0)?).map_err(|err| record.locate(err))?;
            let disease = DiseaseId::try_from(record.get(1)?).map_err(|err| record.locate(err))?;
            let score = record
                .get(2)?
                .parse::<f64>()
                .map_err(|_| record.mismatch("score must be a number"))?;
            let evidence = record
                .get(3)?
                .parse::<i64>()
                .map_err(|_| record.mismatch("evidenceCount must be an integer"))?;
            let Ok(evidence) = u64::try_from(evidence) else {
                return Err(record.locate(CrosswalkError::InvariantViolation(format!(
                    "evidence count of {gene} - {disease} is negative: {evidence}"
                ))));
            };
            let association =
                Association::new(gene, disease, score, evidence).map_err(|err| record.locate(err))?;
            associations.push(association);
            Ok(())
        })?;
        debug!("Parsed {} associations", associations.len());
        Ok(associations)
    }

    #[cfg(test)]
    mod test_associations {
        use super::*;

        fn associations(data: &str) -> CrosswalkResult<Vec<Association>> {
            read(TsvReader::new("associations", data.as_bytes())?)
        }

        const HEADER: &str = "targetId\tdiseaseId\tscore\tevidenceCount\n";

        #[test]
        fn parse_associations() {
            let data = format!(
                "{HEADER}ENSG00000141510\tEFO_0000305\t0.82\t154\nENSG00000012048\tEFO_0000305\t0.9\t12\n"
            );
            let records = associations(&data).expect("valid associations");
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].evidence_count(), 154);
            assert_eq!(records[1].score(), 0.9);
        }

        #[test]
        fn nan_is_an_invariant_violation() {
            let data = format!("{HEADER}ENSG00000141510\tEFO_0000305\tNaN\t154\n");
            let err = associations(&data).unwrap_err();
            match err {
                CrosswalkError::InvariantViolation(msg) => {
                    assert!(msg.contains("ENSG00000141510"));
                    assert!(msg.contains("EFO_0000305"));
                    assert!(msg.contains("line 2"));
                }
                other => panic!("unexpected error {other}"),
            }
        }

        #[test]
        fn negative_evidence_is_an_invariant_violation() {
            let data = format!("{HEADER}ENSG00000141510\tEFO_0000305\t0.5\t-3\n");
            assert!(matches!(
                associations(&data),
                Err(CrosswalkError::InvariantViolation(_))
            ));
        }

        #[test]
        fn non_numeric_score_is_a_schema_mismatch() {
            let data = format!("{HEADER}ENSG00000141510\tEFO_0000305\thigh\t3\n");
            assert!(matches!(
                associations(&data),
                Err(CrosswalkError::SchemaMismatch { line: 2, .. })
            ));
        }

        #[test]
        fn fractional_evidence_is_a_schema_mismatch() {
            let data = format!("{HEADER}ENSG00000141510\tEFO_0000305\t0.5\t3.5\n");
            assert!(matches!(
                associations(&data),
                Err(CrosswalkError::SchemaMismatch { .. })
            ));
        }
    }
}

/// Module to parse the Ensembl → Entrez gene mapping
///
/// Two formats are supported:
///
/// - A simple two-column table
///   ```text
///   ensembl_gene_id entrez_gene_id
///   ENSG00000141510 7157
///   ```
/// - NCBI `gene2ensembl`, which is filtered by taxonomy ID
///   ```text
///   #tax_id GeneID  Ensembl_gene_identifier RNA_nucleotide_accession.version ...
///   9606    7157    ENSG00000141510         NM_000546.6                      ...
///   ```
pub(crate) mod entrez {
    use std::io::BufRead;
    use std::path::Path;

    use tracing::debug;

    use super::{Record, TsvReader};
    use crate::annotations::{EnsemblGeneId, EntrezId};
    use crate::mapper::EntrezMap;
    use crate::CrosswalkResult;

    pub fn parse<P: AsRef<Path>>(file: P, tax_id: u32, map: &mut EntrezMap) -> CrosswalkResult<()> {
        read(TsvReader::open(file)?, tax_id, map)
    }

    /// Empty fields and `-` mark genes without a counterpart
    fn is_blank(value: &str) -> bool {
        value.is_empty() || value == "-"
    }

    fn insert(record: &Record<'_>, map: &mut EntrezMap, ensembl: usize, entrez: usize) -> CrosswalkResult<()> {
        let (ensembl, entrez) = (record.get(ensembl)?, record.get(entrez)?);
        if is_blank(ensembl) || is_blank(entrez) {
            map.skip_blank();
            return Ok(());
        }
        let ensembl = EnsemblGeneId::try_from(ensembl).map_err(|err| record.locate(err))?;
        let entrez = EntrezId::try_from(entrez).map_err(|err| record.locate(err))?;
        map.insert(ensembl, entrez);
        Ok(())
    }

    pub(crate) fn read<R: BufRead>(
        reader: TsvReader<R>,
        tax_id: u32,
        map: &mut EntrezMap,
    ) -> CrosswalkResult<()> {
        if reader.has_column("Ensembl_gene_identifier") {
            let columns = reader.columns(&["tax_id", "GeneID", "Ensembl_gene_identifier"])?;
            let tax_id = tax_id.to_string();
            reader.for_each_record(&columns, |record| {
                if record.get(0)? != tax_id {
                    return Ok(());
                }
                insert(record, map, 2, 1)
            })?;
        } else {
            let columns = reader.columns(&["ensembl_gene_id", "entrez_gene_id"])?;
            reader.for_each_record(&columns, |record| insert(record, map, 0, 1))?;
        }
        debug!(
            "Parsed {} Ensembl to Entrez mappings, skipped {} rows without counterpart",
            map.len(),
            map.blank_rows()
        );
        Ok(())
    }

    #[cfg(test)]
    mod test_entrez {
        use super::*;

        fn gene(s: &str) -> EnsemblGeneId {
            EnsemblGeneId::try_from(s).unwrap()
        }

        #[test]
        fn two_column_format() {
            let data = "ensembl_gene_id\tentrez_gene_id\nENSG00000141510\t7157\n";
            let mut map = EntrezMap::default();
            read(TsvReader::new("entrez", data.as_bytes()).unwrap(), 9606, &mut map).unwrap();
            assert_eq!(map.get(&gene("ENSG00000141510")), Some(EntrezId::from(7157)));
        }

        #[test]
        fn gene2ensembl_filters_tax_id_and_keeps_first() {
            let data = "#tax_id\tGeneID\tEnsembl_gene_identifier\tRNA_nucleotide_accession.version\n\
                        9606\t7157\tENSG00000141510\tNM_000546.6\n\
                        9606\t7157\tENSG00000141510\tNM_001126112.3\n\
                        9606\t999999\tENSG00000141510\tNM_000000.1\n\
                        10090\t22059\tENSMUSG00000059552\tNM_011640.3\n";
            let mut map = EntrezMap::default();
            read(TsvReader::new("gene2ensembl", data.as_bytes()).unwrap(), 9606, &mut map).unwrap();
            assert_eq!(map.len(), 1);
            assert_eq!(map.get(&gene("ENSG00000141510")), Some(EntrezId::from(7157)));
            assert_eq!(map.conflicts(), 1);
        }

        #[test]
        fn blank_entrez_ids_are_skipped() {
            let data = "ensembl_gene_id\tentrez_gene_id\n\
                        ENSG00000012048\t672\n\
                        ENSG00000228630\t\n\
                        ENSG00000283234\t-\n";
            let mut map = EntrezMap::default();
            read(TsvReader::new("entrez", data.as_bytes()).unwrap(), 9606, &mut map).unwrap();
            assert_eq!(map.len(), 1);
            assert_eq!(map.blank_rows(), 2);
            assert!(map.get(&gene("ENSG00000228630")).is_none());
        }

        #[test]
        fn gene2ensembl_without_ensembl_id() {
            let data = "#tax_id\tGeneID\tEnsembl_gene_identifier\n\
                        9606\t7157\tENSG00000141510\n\
                        9606\t100287102\t-\n";
            let mut map = EntrezMap::default();
            read(TsvReader::new("gene2ensembl", data.as_bytes()).unwrap(), 9606, &mut map).unwrap();
            assert_eq!(map.len(), 1);
            assert_eq!(map.blank_rows(), 1);
        }
    }
}

/// Module to parse gene biotypes, used to break down unmappable genes
///
/// ```text
/// ensembl_gene_id biotype
/// ENSG00000141510 protein_coding
/// ENSG00000228630 lncRNA
/// ```
pub(crate) mod gene_categories {
    use std::io::BufRead;
    use std::path::Path;

    use super::TsvReader;
    use crate::annotations::EnsemblGeneId;
    use crate::mapper::GeneCategories;
    use crate::CrosswalkResult;

    pub fn parse<P: AsRef<Path>>(file: P, categories: &mut GeneCategories) -> CrosswalkResult<()> {
        read(TsvReader::open(file)?, categories)
    }

    pub(crate) fn read<R: BufRead>(
        reader: TsvReader<R>,
        categories: &mut GeneCategories,
    ) -> CrosswalkResult<()> {
        let columns = reader.columns(&["ensembl_gene_id", "biotype"])?;
        reader.for_each_record(&columns, |record| {
            let gene = EnsemblGeneId::try_from(record.get(0)?).map_err(|err| record.locate(err))?;
            categories.insert(gene, record.get(1)?);
            Ok(())
        })
    }

    #[cfg(test)]
    mod test_gene_categories {
        use super::*;

        #[test]
        fn parse_biotypes() {
            let data = "ensembl_gene_id\tbiotype\nENSG00000141510\tprotein_coding\nENSG00000228630\tlncRNA\n";
            let mut categories = GeneCategories::default();
            read(TsvReader::new("biotypes", data.as_bytes()).unwrap(), &mut categories).unwrap();
            assert_eq!(categories.len(), 2);
            assert_eq!(
                categories.get(&EnsemblGeneId::try_from("ENSG00000228630").unwrap()),
                Some("lncRNA")
            );
        }
    }
}

use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use oxigraph::io::GraphFormat;
use oxigraph::model::{GraphName, Subject, Term};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use tracing::{debug, info};

use super::results::QueryTable;
use crate::core::error::{PathquillError, Result};

const MARKER_FILE: &str = "manifest.digest";

/// Embedded SPARQL store holding the locally materialized pathway graph.
/// Dumps are bulk-loaded once per manifest digest; queries run without any
/// network access.
pub struct PathwayStore {
    store: Store,
    dir: Option<PathBuf>,
}

impl PathwayStore {
    /// Opens (or creates) the persistent store under `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let store = Store::open(dir.join("graph"))
            .map_err(|e| PathquillError::Store(e.to_string()))?;
        Ok(Self {
            store,
            dir: Some(dir.to_path_buf()),
        })
    }

    /// Volatile store, mainly for tests. Always re-materializes.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            store: Store::new().map_err(|e| PathquillError::Store(e.to_string()))?,
            dir: None,
        })
    }

    /// Loads the RDF dumps unless the store already holds this manifest
    /// digest. Returns whether anything was loaded.
    pub fn materialize(&self, files: &[PathBuf], digest: &str) -> Result<bool> {
        if let Some(marker) = self.marker_path() {
            if marker.exists() {
                let saved = std::fs::read_to_string(&marker)?;
                if saved.trim() == digest && !self.is_empty()? {
                    debug!("store already materialized (digest {})", digest);
                    return Ok(false);
                }
            }
        }

        if !self.is_empty()? {
            info!("manifest changed, clearing stale graph");
            self.store
                .clear()
                .map_err(|e| PathquillError::Store(e.to_string()))?;
        }

        for file in files {
            self.load_file(file)?;
        }

        if let Some(marker) = self.marker_path() {
            std::fs::write(&marker, digest)?;
        }

        info!(
            "materialized {} triples from {} file(s)",
            self.len()?,
            files.len()
        );
        Ok(true)
    }

    fn load_file(&self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PathquillError::Store(format!("invalid dump file name: {}", path.display()))
            })?;

        let (base, gzipped) = match name.strip_suffix(".gz") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let extension = Path::new(base)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                PathquillError::Store(format!("cannot determine RDF serialization of '{name}'"))
            })?;
        let format = GraphFormat::from_extension(extension).ok_or_else(|| {
            PathquillError::Store(format!("unsupported RDF serialization '.{extension}'"))
        })?;

        info!("loading {} ({:?})", name, format);
        let reader = BufReader::new(std::fs::File::open(path)?);
        if gzipped {
            self.store
                .load_graph(
                    BufReader::new(GzDecoder::new(reader)),
                    format,
                    GraphName::DefaultGraph,
                    None,
                )
                .map_err(|e| PathquillError::Store(format!("loading '{name}': {e}")))?;
        } else {
            self.store
                .load_graph(reader, format, GraphName::DefaultGraph, None)
                .map_err(|e| PathquillError::Store(format!("loading '{name}': {e}")))?;
        }
        Ok(())
    }

    /// Evaluates a SPARQL query and binds the result to a table. SELECT rows
    /// map one column per variable; ASK yields a single `result` cell;
    /// CONSTRUCT/DESCRIBE yield subject/predicate/object columns.
    pub fn query(&self, sparql: &str) -> Result<QueryTable> {
        let results = self
            .store
            .query(sparql)
            .map_err(|e| PathquillError::Query(e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let columns: Vec<String> = solutions
                    .variables()
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                let mut table = QueryTable::new(columns);
                for solution in solutions {
                    let solution = solution.map_err(|e| PathquillError::Query(e.to_string()))?;
                    let row = table
                        .columns
                        .iter()
                        .map(|column| {
                            solution
                                .get(column.as_str())
                                .map(term_text)
                                .unwrap_or_default()
                        })
                        .collect();
                    table.rows.push(row);
                }
                Ok(table)
            }
            QueryResults::Boolean(value) => {
                let mut table = QueryTable::new(vec!["result".to_string()]);
                table.rows.push(vec![value.to_string()]);
                Ok(table)
            }
            QueryResults::Graph(triples) => {
                let mut table = QueryTable::new(vec![
                    "subject".to_string(),
                    "predicate".to_string(),
                    "object".to_string(),
                ]);
                for triple in triples {
                    let triple = triple.map_err(|e| PathquillError::Query(e.to_string()))?;
                    table.rows.push(vec![
                        subject_text(&triple.subject),
                        triple.predicate.as_str().to_string(),
                        term_text(&triple.object),
                    ]);
                }
                Ok(table)
            }
        }
    }

    pub fn len(&self) -> Result<usize> {
        self.store
            .len()
            .map_err(|e| PathquillError::Store(e.to_string()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn marker_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(MARKER_FILE))
    }
}

fn term_text(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::BlankNode(node) => format!("_:{}", node.as_str()),
        Term::Literal(literal) => literal.value().to_string(),
        Term::Triple(triple) => triple.to_string(),
    }
}

fn subject_text(subject: &Subject) -> String {
    match subject {
        Subject::NamedNode(node) => node.as_str().to_string(),
        Subject::BlankNode(node) => format!("_:{}", node.as_str()),
        Subject::Triple(triple) => triple.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATHWAYS_NT: &str = "\
<http://identifiers.org/wikipathways/WP554> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://vocabularies.wikipathways.org/wp#Pathway> .
<http://identifiers.org/wikipathways/WP554> <http://purl.org/dc/terms/title> \"ACE Inhibitor Pathway\" .
<http://identifiers.org/wikipathways/WP1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://vocabularies.wikipathways.org/wp#Pathway> .
<http://identifiers.org/wikipathways/WP1> <http://purl.org/dc/terms/title> \"Glycolysis\" .
";

    fn loaded_store(dir: &Path) -> PathwayStore {
        let dump = dir.join("pathways.nt");
        std::fs::write(&dump, PATHWAYS_NT).unwrap();
        let store = PathwayStore::in_memory().unwrap();
        assert!(store.materialize(&[dump], "digest-1").unwrap());
        store
    }

    #[test]
    fn test_select_binds_columns_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = loaded_store(dir.path());

        let table = store
            .query(
                "PREFIX dcterms: <http://purl.org/dc/terms/>\n\
                 SELECT ?pathway ?title WHERE { ?pathway dcterms:title ?title } ORDER BY ?title",
            )
            .unwrap();

        assert_eq!(table.columns, vec!["pathway", "title"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.rows[0],
            vec![
                "http://identifiers.org/wikipathways/WP554".to_string(),
                "ACE Inhibitor Pathway".to_string(),
            ]
        );
    }

    #[test]
    fn test_ask_yields_single_cell() {
        let dir = tempfile::tempdir().unwrap();
        let store = loaded_store(dir.path());

        let table = store
            .query("ASK { ?s a <http://vocabularies.wikipathways.org/wp#Pathway> }")
            .unwrap();
        assert_eq!(table.columns, vec!["result"]);
        assert_eq!(table.rows, vec![vec!["true".to_string()]]);
    }

    #[test]
    fn test_empty_result_is_distinct_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = loaded_store(dir.path());

        let table = store
            .query("SELECT ?x WHERE { ?x <http://example.org/never> ?y }")
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns, vec!["x"]);
    }

    #[test]
    fn test_invalid_sparql_is_query_error() {
        let store = PathwayStore::in_memory().unwrap();
        let err = store.query("SELECT WHERE garbage {").unwrap_err();
        assert!(matches!(err, PathquillError::Query(_)));
    }

    #[test]
    fn test_materialize_skips_when_digest_matches() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("pathways.nt");
        std::fs::write(&dump, PATHWAYS_NT).unwrap();

        let store_dir = dir.path().join("store");
        let store = PathwayStore::open(&store_dir).unwrap();
        assert!(store.materialize(std::slice::from_ref(&dump), "d1").unwrap());
        assert!(!store.materialize(std::slice::from_ref(&dump), "d1").unwrap());
        // a new digest forces a reload
        assert!(store.materialize(std::slice::from_ref(&dump), "d2").unwrap());
        assert_eq!(store.len().unwrap(), 4);
    }

    #[test]
    fn test_gzipped_dump_loads() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("pathways.nt.gz");
        let mut encoder = GzEncoder::new(std::fs::File::create(&dump).unwrap(), Compression::default());
        encoder.write_all(PATHWAYS_NT.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let store = PathwayStore::in_memory().unwrap();
        store.materialize(&[dump], "gz").unwrap();
        assert_eq!(store.len().unwrap(), 4);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("pathways.hdt");
        std::fs::write(&dump, b"junk").unwrap();

        let store = PathwayStore::in_memory().unwrap();
        let err = store.materialize(&[dump], "x").unwrap_err();
        assert!(matches!(err, PathquillError::Store(_)));
    }
}

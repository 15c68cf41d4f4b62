//! Terminology loader
//!
//! Parses RF2 release tables (concepts, relationships, concrete-value
//! relationships, descriptions) into typed records. A load either returns a
//! complete record set or fails; rows are never silently dropped except by
//! the active-status filter.

pub mod release;
pub mod rf2;

pub use release::{discover_release_files, release_version, ReleaseFiles};
pub use rf2::{read_table, Rf2Row};

use crate::graph::{
    Concept, ConceptId, ConcreteLiteral, ConcreteValue, RelationPolicy, Relationship, FSN_TYPE,
};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Loader errors
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("{file}:{line}: malformed record in column '{column}': {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        column: String,
        reason: String,
    },

    #[error("relationship type {0} does not occur in the loaded relationships")]
    UnknownRelationshipType(ConceptId),

    #[error("no {table} table found under {dir}")]
    MissingTable { dir: String, table: String },

    #[error("invalid release file pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },
}

impl LoaderError {
    pub(crate) fn io(file: impl Into<String>, source: io::Error) -> Self {
        LoaderError::Io {
            file: file.into(),
            source,
        }
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;

const CONCEPT_COLUMNS: &[&str] = &["id", "effectiveTime", "active", "moduleId"];
const RELATIONSHIP_COLUMNS: &[&str] = &[
    "id",
    "effectiveTime",
    "active",
    "sourceId",
    "destinationId",
    "typeId",
];
const CONCRETE_COLUMNS: &[&str] = &["id", "effectiveTime", "active", "sourceId", "value", "typeId"];
const DESCRIPTION_COLUMNS: &[&str] = &["id", "effectiveTime", "active", "conceptId", "typeId", "term"];

/// Row counts for one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    /// Data rows in the file
    pub rows: usize,
    /// Rows kept after the status filter and duplicate resolution
    pub kept: usize,
}

/// What a load read and kept
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    pub concepts: TableStats,
    pub relationships: TableStats,
    pub concrete_values: TableStats,
    pub descriptions: TableStats,
}

/// Loader options
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Keep rows whose status flag is 0
    pub include_inactive: bool,
}

/// A complete, self-consistent set of release records
#[derive(Debug, Clone, Default)]
pub struct LoadedRelease {
    pub concepts: Vec<Concept>,
    pub relationships: Vec<Relationship>,
    /// Release date, when known
    pub version: Option<String>,
    pub stats: LoadStats,
}

impl LoadedRelease {
    /// Assemble a release from records built in memory
    pub fn from_parts(concepts: Vec<Concept>, relationships: Vec<Relationship>) -> Self {
        let stats = LoadStats {
            concepts: TableStats {
                rows: concepts.len(),
                kept: concepts.len(),
            },
            relationships: TableStats {
                rows: relationships.len(),
                kept: relationships.len(),
            },
            ..LoadStats::default()
        };
        LoadedRelease {
            concepts,
            relationships,
            version: None,
            stats,
        }
    }

    /// Relationship count per type, in first-seen order
    pub fn relationship_types(&self) -> IndexMap<ConceptId, usize> {
        let mut counts = IndexMap::new();
        for rel in &self.relationships {
            *counts.entry(rel.type_id).or_insert(0) += 1;
        }
        counts
    }

    /// Relationships an edge policy keeps.
    ///
    /// Fails with `UnknownRelationshipType` when the policy names a type
    /// (the is-a type for `HierarchyOnly`) that no loaded relationship has.
    pub fn select_relationships(
        &self,
        policy: &RelationPolicy,
        is_a: ConceptId,
    ) -> LoaderResult<Vec<&Relationship>> {
        let wanted: Option<Vec<ConceptId>> = match policy {
            RelationPolicy::HierarchyOnly => Some(vec![is_a]),
            RelationPolicy::AllRelations => None,
            RelationPolicy::Selected(types) => Some(types.clone()),
        };

        let Some(wanted) = wanted else {
            return Ok(self.relationships.iter().filter(|r| r.active).collect());
        };

        let present = self.relationship_types();
        if let Some(missing) = wanted.iter().find(|t| !present.contains_key(*t)) {
            return Err(LoaderError::UnknownRelationshipType(*missing));
        }

        Ok(self
            .relationships
            .iter()
            .filter(|r| r.active && wanted.contains(&r.type_id))
            .collect())
    }
}

/// Reads release tables into a [`LoadedRelease`]
#[derive(Debug, Clone, Default)]
pub struct ReleaseLoader {
    options: LoadOptions,
}

impl ReleaseLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Load every table named in `files`
    pub fn load(&self, files: &ReleaseFiles) -> LoaderResult<LoadedRelease> {
        info!("Loading release {:?}", files.version.as_deref().unwrap_or("unversioned"));

        let (mut concepts, concept_stats) = self.load_concepts(&files.concepts)?;

        // row history is resolved over every relationship file together
        let mut rows = Vec::new();
        let mut seen = 0;
        for path in &files.relationships {
            let (file, reader) = open(path)?;
            let (parsed, count) = parse_relationships(&file, reader)?;
            rows.extend(parsed);
            seen += count;
        }
        let relationships = self.current(rows, |r| r.id, |r| r.effective_time, |r| r.active);
        let relationship_stats = TableStats {
            rows: seen,
            kept: relationships.len(),
        };

        let mut stats = LoadStats {
            concepts: concept_stats,
            relationships: relationship_stats,
            ..LoadStats::default()
        };

        let index: FxHashMap<ConceptId, usize> = concepts
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.id, idx))
            .collect();

        if let Some(path) = &files.concrete_values {
            let (values, table) = self.load_concrete_values(path)?;
            stats.concrete_values = table;
            for (source, value) in values {
                if let Some(&idx) = index.get(&source) {
                    concepts[idx].concrete_values.push(value);
                }
            }
        }

        if let Some(path) = &files.descriptions {
            let (names, table) = self.load_names(path)?;
            stats.descriptions = table;
            for (concept, name) in names {
                if let Some(&idx) = index.get(&concept) {
                    concepts[idx].name = Some(name);
                }
            }
        }

        info!(
            "Loaded {} concepts and {} relationships",
            concepts.len(),
            relationships.len()
        );

        Ok(LoadedRelease {
            concepts,
            relationships,
            version: files.version.clone(),
            stats,
        })
    }

    pub fn load_concepts(&self, path: &Path) -> LoaderResult<(Vec<Concept>, TableStats)> {
        let (file, reader) = open(path)?;
        self.read_concepts(&file, reader)
    }

    /// Parse a concept table.
    ///
    /// Repeated ids resolve to the row with the latest `effectiveTime`
    /// before the status filter runs, so a later retirement hides the id.
    pub fn read_concepts<R: BufRead>(
        &self,
        file: &str,
        reader: R,
    ) -> LoaderResult<(Vec<Concept>, TableStats)> {
        let (rows, seen) = read_table(file, reader, CONCEPT_COLUMNS, |row| {
            let definition_status_id = match row.text("definitionStatusId") {
                Ok(_) => Some(row.id("definitionStatusId")?),
                Err(_) => None,
            };
            Ok(Some(Concept {
                id: row.id("id")?,
                active: row.flag("active")?,
                effective_time: row.date("effectiveTime")?,
                module_id: row.id("moduleId")?,
                definition_status_id,
                name: None,
                concrete_values: Vec::new(),
            }))
        })?;

        let concepts = self.current(rows, |c| c.id, |c| c.effective_time, |c| c.active);
        debug!("{}: {} rows, {} concepts kept", file, seen, concepts.len());
        let stats = TableStats {
            rows: seen,
            kept: concepts.len(),
        };
        Ok((concepts, stats))
    }

    pub fn load_relationships(
        &self,
        path: &Path,
    ) -> LoaderResult<(Vec<Relationship>, TableStats)> {
        let (file, reader) = open(path)?;
        self.read_relationships(&file, reader)
    }

    /// Parse a single relationship table, resolving repeated row ids like
    /// [`read_concepts`](Self::read_concepts)
    pub fn read_relationships<R: BufRead>(
        &self,
        file: &str,
        reader: R,
    ) -> LoaderResult<(Vec<Relationship>, TableStats)> {
        let (rows, seen) = parse_relationships(file, reader)?;
        let relationships = self.current(rows, |r| r.id, |r| r.effective_time, |r| r.active);
        debug!("{}: {} rows, {} relationships kept", file, seen, relationships.len());
        let stats = TableStats {
            rows: seen,
            kept: relationships.len(),
        };
        Ok((relationships, stats))
    }

    pub fn load_concrete_values(
        &self,
        path: &Path,
    ) -> LoaderResult<(Vec<(ConceptId, ConcreteValue)>, TableStats)> {
        let (file, reader) = open(path)?;
        self.read_concrete_values(&file, reader)
    }

    /// Parse a concrete-value relationship table into `(source, value)` pairs
    pub fn read_concrete_values<R: BufRead>(
        &self,
        file: &str,
        reader: R,
    ) -> LoaderResult<(Vec<(ConceptId, ConcreteValue)>, TableStats)> {
        let (rows, seen) = read_table(file, reader, CONCRETE_COLUMNS, |row| {
            let raw = row.text("value")?;
            let value = ConcreteLiteral::parse(raw).ok_or_else(|| LoaderError::MalformedRecord {
                file: file.to_string(),
                line: row.line(),
                column: "value".to_string(),
                reason: format!("expected #number or \"text\", found {:?}", raw),
            })?;
            let group = match row.text("relationshipGroup") {
                Ok(_) => row.number("relationshipGroup")?,
                Err(_) => 0,
            };
            Ok(Some(HistoryRow {
                id: row.id("id")?,
                effective_time: row.date("effectiveTime")?,
                active: row.flag("active")?,
                record: (
                    row.id("sourceId")?,
                    ConcreteValue {
                        type_id: row.id("typeId")?,
                        group,
                        value,
                    },
                ),
            }))
        })?;

        let values: Vec<_> = self
            .current(rows, |r| r.id, |r| r.effective_time, |r| r.active)
            .into_iter()
            .map(|r| r.record)
            .collect();
        let stats = TableStats {
            rows: seen,
            kept: values.len(),
        };
        Ok((values, stats))
    }

    pub fn load_names(&self, path: &Path) -> LoaderResult<(Vec<(ConceptId, String)>, TableStats)> {
        let (file, reader) = open(path)?;
        self.read_names(&file, reader)
    }

    /// Active fully specified names from a description table
    pub fn read_names<R: BufRead>(
        &self,
        file: &str,
        reader: R,
    ) -> LoaderResult<(Vec<(ConceptId, String)>, TableStats)> {
        let (rows, seen) = read_table(file, reader, DESCRIPTION_COLUMNS, |row| {
            Ok(Some(HistoryRow {
                id: row.id("id")?,
                effective_time: row.date("effectiveTime")?,
                active: row.flag("active")?,
                record: (row.id("typeId")?, row.id("conceptId")?, row.text("term")?.to_string()),
            }))
        })?;

        // names are always filtered to active rows, whatever the options say
        let names: Vec<_> = latest_by_key(rows, |r| r.id, |r| r.effective_time)
            .into_iter()
            .filter(|r| r.active && r.record.0 == FSN_TYPE)
            .map(|r| (r.record.1, r.record.2))
            .collect();
        let stats = TableStats {
            rows: seen,
            kept: names.len(),
        };
        Ok((names, stats))
    }

    /// Resolve row history by key, then apply the status filter
    fn current<T, K, D, A>(&self, rows: Vec<T>, key: K, date: D, active: A) -> Vec<T>
    where
        K: Fn(&T) -> ConceptId,
        D: Fn(&T) -> u32,
        A: Fn(&T) -> bool,
    {
        let mut rows = latest_by_key(rows, key, date);
        if !self.options.include_inactive {
            rows.retain(|row| active(row));
        }
        rows
    }
}

/// A parsed row kept with the columns needed to resolve its history
struct HistoryRow<T> {
    id: ConceptId,
    effective_time: u32,
    active: bool,
    record: T,
}

fn parse_relationships<R: BufRead>(file: &str, reader: R) -> LoaderResult<(Vec<Relationship>, usize)> {
    read_table(file, reader, RELATIONSHIP_COLUMNS, |row| {
        let group = match row.text("relationshipGroup") {
            Ok(_) => row.number("relationshipGroup")?,
            Err(_) => 0,
        };
        Ok(Some(Relationship {
            id: row.id("id")?,
            source: row.id("sourceId")?,
            destination: row.id("destinationId")?,
            type_id: row.id("typeId")?,
            group,
            active: row.flag("active")?,
            effective_time: row.date("effectiveTime")?,
        }))
    })
}

fn open(path: &Path) -> LoaderResult<(String, BufReader<File>)> {
    let file = path.display().to_string();
    let handle = File::open(path).map_err(|e| LoaderError::io(file.clone(), e))?;
    Ok((file, BufReader::new(handle)))
}

/// Keep one record per key, the one with the latest date; first-seen order is preserved
fn latest_by_key<T, K, D>(rows: Vec<T>, key: K, date: D) -> Vec<T>
where
    K: Fn(&T) -> ConceptId,
    D: Fn(&T) -> u32,
{
    let mut position: FxHashMap<ConceptId, usize> = FxHashMap::default();
    let mut kept: Vec<T> = Vec::with_capacity(rows.len());

    for row in rows {
        match position.get(&key(&row)) {
            Some(&idx) => {
                if date(&row) >= date(&kept[idx]) {
                    kept[idx] = row;
                }
            }
            None => {
                position.insert(key(&row), kept.len());
                kept.push(row);
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::IS_A;
    use std::io::Cursor;

    const CONCEPTS: &str = "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId
138875005\t20020131\t1\t900000000000207008\t900000000000074008
404684003\t20020131\t1\t900000000000207008\t900000000000074008
123\t20020131\t0\t900000000000207008\t900000000000074008
404684003\t20230131\t1\t900000000000012004\t900000000000074008
";

    const RELATIONSHIPS: &str = "id\teffectiveTime\tactive\tmoduleId\tsourceId\tdestinationId\trelationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId
1\t20020131\t1\t900000000000207008\t404684003\t138875005\t0\t116680003\t900000000000011006\t900000000000451002
2\t20020131\t0\t900000000000207008\t404684003\t138875005\t0\t363698007\t900000000000011006\t900000000000451002
";

    #[test]
    fn test_concepts_filter_inactive_and_keep_latest_row() {
        let loader = ReleaseLoader::default();
        let (concepts, stats) = loader.read_concepts("c.txt", Cursor::new(CONCEPTS)).unwrap();

        assert_eq!(stats.rows, 4);
        assert_eq!(concepts.len(), 2);
        assert_eq!(concepts[1].id, ConceptId(404684003));
        assert_eq!(concepts[1].effective_time, 20230131);
        assert_eq!(concepts[1].module_id, ConceptId(900000000000012004));
    }

    #[test]
    fn test_include_inactive() {
        let loader = ReleaseLoader::new(LoadOptions {
            include_inactive: true,
        });
        let (concepts, _) = loader.read_concepts("c.txt", Cursor::new(CONCEPTS)).unwrap();
        assert_eq!(concepts.len(), 3);
        assert!(!concepts[2].active);
    }

    #[test]
    fn test_relationships_parse() {
        let loader = ReleaseLoader::default();
        let (rels, stats) = loader
            .read_relationships("r.txt", Cursor::new(RELATIONSHIPS))
            .unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].type_id, IS_A);
        assert_eq!(rels[0].source, ConceptId(404684003));
    }

    #[test]
    fn test_concrete_values_and_names() {
        let loader = ReleaseLoader::default();
        let concrete = "id\teffectiveTime\tactive\tmoduleId\tsourceId\tvalue\trelationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId
9\t20230131\t1\t1\t404684003\t#250\t1\t1142135004\t900000000000011006\t900000000000451002
";
        let (values, _) = loader
            .read_concrete_values("cv.txt", Cursor::new(concrete))
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].1.value, ConcreteLiteral::Numeric("250".to_string()));
        assert_eq!(values[0].1.group, 1);

        let descriptions = "id\teffectiveTime\tactive\tmoduleId\tconceptId\tlanguageCode\ttypeId\tterm\tcaseSignificanceId
5\t20020131\t1\t1\t404684003\ten\t900000000000003001\tClinical finding (finding)\t900000000000448009
6\t20020131\t1\t1\t404684003\ten\t900000000000013009\tClinical finding\t900000000000448009
";
        let (names, stats) = loader
            .read_names("d.txt", Cursor::new(descriptions))
            .unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(names, vec![(ConceptId(404684003), "Clinical finding (finding)".to_string())]);
    }

    #[test]
    fn test_select_relationships_requires_registered_type() {
        let rel = Relationship::new(1u64, 2u64, 3u64, 363698007u64);
        let release = LoadedRelease::from_parts(Vec::new(), vec![rel]);

        let err = release
            .select_relationships(&RelationPolicy::HierarchyOnly, IS_A)
            .unwrap_err();
        assert!(matches!(err, LoaderError::UnknownRelationshipType(t) if t == IS_A));

        let all = release
            .select_relationships(&RelationPolicy::AllRelations, IS_A)
            .unwrap();
        assert_eq!(all.len(), 1);

        let selected = release
            .select_relationships(&RelationPolicy::Selected(vec![ConceptId(363698007)]), IS_A)
            .unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_later_inactive_row_retires_concept_and_relationship() {
        let concepts = "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId
123\t20020131\t1\t900000000000207008\t900000000000074008
123\t20230131\t0\t900000000000207008\t900000000000074008
";
        let relationships = "id\teffectiveTime\tactive\tmoduleId\tsourceId\tdestinationId\trelationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId
7\t20230131\t0\t900000000000207008\t123\t138875005\t0\t116680003\t900000000000011006\t900000000000451002
7\t20020131\t1\t900000000000207008\t123\t138875005\t0\t116680003\t900000000000011006\t900000000000451002
";
        let loader = ReleaseLoader::default();
        let (c, stats) = loader.read_concepts("c.txt", Cursor::new(concepts)).unwrap();
        let (r, _) = loader
            .read_relationships("r.txt", Cursor::new(relationships))
            .unwrap();
        assert!(c.is_empty());
        assert!(r.is_empty());
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.kept, 0);

        let loader = ReleaseLoader::new(LoadOptions {
            include_inactive: true,
        });
        let (c, _) = loader.read_concepts("c.txt", Cursor::new(concepts)).unwrap();
        let (r, _) = loader
            .read_relationships("r.txt", Cursor::new(relationships))
            .unwrap();
        assert_eq!((c[0].active, c[0].effective_time), (false, 20230131));
        assert_eq!((r[0].active, r[0].effective_time), (false, 20230131));
    }

    #[test]
    fn test_relationship_history_spans_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let header = "id\teffectiveTime\tactive\tmoduleId\tsourceId\tdestinationId\trelationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId\n";
        let concepts = dir.path().join("concepts.txt");
        let first = dir.path().join("rel_a.txt");
        let second = dir.path().join("rel_b.txt");
        std::fs::write(&concepts, CONCEPTS).unwrap();
        std::fs::write(
            &first,
            format!("{header}1\t20020131\t1\t1\t404684003\t138875005\t0\t116680003\t1\t1\n"),
        )
        .unwrap();
        std::fs::write(
            &second,
            format!("{header}1\t20230131\t0\t1\t404684003\t138875005\t0\t116680003\t1\t1\n2\t20230131\t1\t1\t404684003\t138875005\t0\t116680003\t1\t1\n"),
        )
        .unwrap();

        let files = ReleaseFiles::new(&concepts, vec![first, second]);
        let release = ReleaseLoader::default().load(&files).unwrap();

        assert_eq!(release.stats.relationships.rows, 3);
        assert_eq!(release.relationships.len(), 1);
        assert_eq!(release.relationships[0].id, ConceptId(2));
    }
}

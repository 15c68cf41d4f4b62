//! Release directory discovery
//!
//! Finds RF2 snapshot tables by the dated-release naming convention, e.g.
//! `sct2_Concept_Snapshot_INT_20230430.txt`.

use super::{LoaderError, LoaderResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

const RELEASE_FILE_PATTERN: &str =
    r"^sct2_(Concept|Relationship|RelationshipConcreteValues|Description)_Snapshot(?:-[A-Za-z]{2})?_([A-Za-z0-9]+)_(\d{8})\.txt$";

fn release_file_pattern() -> LoaderResult<&'static Regex> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    if let Some(pattern) = PATTERN.get() {
        return Ok(pattern);
    }
    let compiled = Regex::new(RELEASE_FILE_PATTERN)?;
    Ok(PATTERN.get_or_init(|| compiled))
}

/// Located tables of one release
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseFiles {
    pub concepts: PathBuf,
    pub relationships: Vec<PathBuf>,
    pub concrete_values: Option<PathBuf>,
    pub descriptions: Option<PathBuf>,
    /// Release date (`YYYYMMDD`) taken from the concept table name
    pub version: Option<String>,
}

impl ReleaseFiles {
    /// Explicit paths, version read from the concept file name if it follows the convention
    pub fn new(concepts: impl Into<PathBuf>, relationships: Vec<PathBuf>) -> Self {
        let concepts = concepts.into();
        let version = release_version(&concepts);
        ReleaseFiles {
            concepts,
            relationships,
            concrete_values: None,
            descriptions: None,
            version,
        }
    }
}

/// Release date encoded in a file name
pub fn release_version(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    release_file_pattern()
        .ok()?
        .captures(name)
        .map(|caps| caps[3].to_string())
}

/// Walk `dir` and pick the snapshot tables out of it
pub fn discover_release_files(dir: impl AsRef<Path>) -> LoaderResult<ReleaseFiles> {
    let dir = dir.as_ref();
    let mut found = Vec::new();
    collect_files(dir, &mut found)?;
    found.sort();

    let mut concepts = None;
    let mut relationships = Vec::new();
    let mut concrete_values = None;
    let mut descriptions = None;
    let mut version = None;

    for path in found {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(caps) = release_file_pattern()?.captures(name) else {
            continue;
        };
        debug!("Found release table {:?}", path);
        match &caps[1] {
            "Concept" => {
                version = Some(caps[3].to_string());
                concepts = Some(path.clone());
            }
            "Relationship" => relationships.push(path.clone()),
            "RelationshipConcreteValues" => concrete_values = Some(path.clone()),
            "Description" => descriptions = Some(path.clone()),
            _ => {}
        }
    }

    let concepts = concepts.ok_or_else(|| LoaderError::MissingTable {
        dir: dir.display().to_string(),
        table: "sct2_Concept_Snapshot".to_string(),
    })?;
    if relationships.is_empty() {
        return Err(LoaderError::MissingTable {
            dir: dir.display().to_string(),
            table: "sct2_Relationship_Snapshot".to_string(),
        });
    }

    Ok(ReleaseFiles {
        concepts,
        relationships,
        concrete_values,
        descriptions,
        version,
    })
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> LoaderResult<()> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| LoaderError::io(dir.display().to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| LoaderError::io(dir.display().to_string(), e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_release_file_pattern_compiles() {
        let pattern = release_file_pattern().unwrap();
        assert!(pattern.is_match("sct2_Description_Snapshot-en_INT_20230430.txt"));
        assert!(!pattern.is_match("der2_cRefset_LanguageSnapshot-en_INT_20230430.txt"));
    }

    #[test]
    fn test_release_version_from_name() {
        let path = Path::new("data/sct2_Concept_Snapshot_INT_20230430.txt");
        assert_eq!(release_version(path), Some("20230430".to_string()));
        assert_eq!(release_version(Path::new("concepts.txt")), None);
    }

    #[test]
    fn test_discover_in_nested_directories() {
        let dir = TempDir::new().unwrap();
        let terminology = dir.path().join("Snapshot").join("Terminology");
        fs::create_dir_all(&terminology).unwrap();
        for name in [
            "sct2_Concept_Snapshot_INT_20250401.txt",
            "sct2_Relationship_Snapshot_INT_20250401.txt",
            "sct2_RelationshipConcreteValues_Snapshot_INT_20250401.txt",
            "sct2_Description_Snapshot-en_INT_20250401.txt",
            "sct2_StatedRelationship_Snapshot_INT_20250401.txt",
            "readme.txt",
        ] {
            fs::write(terminology.join(name), "").unwrap();
        }

        let files = discover_release_files(dir.path()).unwrap();
        assert!(files.concepts.ends_with("sct2_Concept_Snapshot_INT_20250401.txt"));
        assert_eq!(files.relationships.len(), 1);
        assert!(files.concrete_values.is_some());
        assert!(files.descriptions.is_some());
        assert_eq!(files.version.as_deref(), Some("20250401"));
    }

    #[test]
    fn test_missing_concept_table() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("sct2_Relationship_Snapshot_INT_20250401.txt"),
            "",
        )
        .unwrap();
        let err = discover_release_files(dir.path()).unwrap_err();
        assert!(matches!(err, LoaderError::MissingTable { .. }));
    }
}

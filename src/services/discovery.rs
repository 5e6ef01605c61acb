//! Entity and export file discovery
//!
//! Entities live either in a subdirectory named by their code
//! (`<root>/FR/FR-ALLMODELS-MAR-25.csv`) or as filename groups directly in
//! the data root (`<root>/FR-ALLMODELS-MAR-25.csv`). Both are scanned.

use crate::parsers::{is_entity_code, ExportFileName};
use crate::types::{ProcessedFileIndex, Result, RollupError};
use glob::{MatchOptions, Pattern};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Where one entity's exports may be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySource {
    pub entity: String,
    pub dirs: Vec<PathBuf>,
}

/// An export file belonging to an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub name: ExportFileName,
}

/// Outcome of filtering candidates against the processed-file index
#[derive(Debug, Default)]
pub struct Discovery {
    pub new_files: Vec<CandidateFile>,
    pub already_processed: usize,
}

/// Find every entity under the data root, sorted by entity code.
/// An unreadable root is an error.
pub fn discover_entities(root: &Path) -> Result<Vec<EntitySource>> {
    let mut found: BTreeMap<String, BTreeSet<PathBuf>> = BTreeMap::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if path.is_dir() {
            if is_entity_code(&name) {
                found
                    .entry(name.to_ascii_uppercase())
                    .or_default()
                    .insert(path);
            }
        } else if let Some(export) = ExportFileName::parse(&name) {
            found
                .entry(export.entity)
                .or_default()
                .insert(root.to_path_buf());
        }
    }

    Ok(found
        .into_iter()
        .map(|(entity, dirs)| EntitySource {
            entity,
            dirs: dirs.into_iter().collect(),
        })
        .collect())
}

/// List an entity's export files across its directories, sorted by
/// filename. Files not following the entity's naming convention are
/// ignored; a filename seen in two directories is listed once.
pub fn list_candidates(entity: &str, dirs: &[PathBuf]) -> Result<Vec<CandidateFile>> {
    let options = MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for dir in dirs {
        // Surface unreadable directories; glob would silently skip them
        fs::read_dir(dir)?;

        let pattern = Path::new(&Pattern::escape(&dir.to_string_lossy())).join("*.csv");
        let paths = glob::glob_with(&pattern.to_string_lossy(), options)
            .map_err(|e| RollupError::Config(format!("invalid scan pattern: {}", e)))?;

        for entry in paths {
            let path = entry.map_err(|e| RollupError::Io(e.into_error()))?;
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let Some(name) = ExportFileName::parse_for_entity(&file_name, entity) else {
                continue;
            };
            if seen.insert(file_name) {
                candidates.push(CandidateFile { path, name });
            }
        }
    }

    candidates.sort_by(|a, b| a.name.file_name.cmp(&b.name.file_name));
    Ok(candidates)
}

/// Keep only candidates whose filename is not in the index
pub fn filter_new(candidates: Vec<CandidateFile>, index: &ProcessedFileIndex) -> Discovery {
    let total = candidates.len();
    let new_files: Vec<CandidateFile> = candidates
        .into_iter()
        .filter(|c| !index.contains(&c.name.file_name))
        .collect();

    Discovery {
        already_processed: total - new_files.len(),
        new_files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "Week of Year\n").unwrap();
    }

    #[test]
    fn test_discover_entities_from_dirs_and_root_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("FR")).unwrap();
        fs::create_dir(root.join("de")).unwrap();
        fs::create_dir(root.join("archive-old")).unwrap();
        touch(root, "IT-ALLMODELS-JAN-25.csv");
        touch(root, "FR-ALLMODELS-FEB-25.csv");
        touch(root, "README.md");

        let entities = discover_entities(root).unwrap();
        let codes: Vec<&str> = entities.iter().map(|e| e.entity.as_str()).collect();
        assert_eq!(codes, vec!["DE", "FR", "IT"]);

        let fr = entities.iter().find(|e| e.entity == "FR").unwrap();
        assert_eq!(fr.dirs.len(), 2);
    }

    #[test]
    fn test_discover_entities_missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        let result = discover_entities(&temp.path().join("nope"));
        assert!(matches!(result, Err(RollupError::Io(_))));
    }

    #[test]
    fn test_list_candidates_filters_by_entity_and_pattern() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        touch(&dir, "FR-ALLMODELS-MAR-25.csv");
        touch(&dir, "FR-ALLMODELS-FEB-25.csv");
        touch(&dir, "DE-ALLMODELS-MAR-25.csv");
        touch(&dir, "FR-summary.csv");
        touch(&dir, "FR-ALLMODELS-MAR-25.txt");

        let candidates = list_candidates("FR", &[dir]).unwrap();
        let names: Vec<&str> = candidates
            .iter()
            .map(|c| c.name.file_name.as_str())
            .collect();
        assert_eq!(names, vec!["FR-ALLMODELS-FEB-25.csv", "FR-ALLMODELS-MAR-25.csv"]);
    }

    #[test]
    fn test_list_candidates_dedups_across_dirs() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        touch(&a, "FR-ALLMODELS-MAR-25.csv");
        touch(&b, "FR-ALLMODELS-MAR-25.csv");
        touch(&b, "FR-ALLMODELS-APR-25.csv");

        let candidates = list_candidates("FR", &[a, b]).unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_list_candidates_unreadable_dir_is_error() {
        let temp = TempDir::new().unwrap();
        let result = list_candidates("FR", &[temp.path().join("missing")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_new_skips_indexed() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        touch(&dir, "FR-ALLMODELS-MAR-25.csv");
        touch(&dir, "FR-ALLMODELS-APR-25.csv");

        let candidates = list_candidates("FR", &[dir]).unwrap();
        let index: ProcessedFileIndex = ["FR-ALLMODELS-MAR-25.csv"].into_iter().collect();
        let discovery = filter_new(candidates, &index);

        assert_eq!(discovery.already_processed, 1);
        assert_eq!(discovery.new_files.len(), 1);
        assert_eq!(discovery.new_files[0].name.file_name, "FR-ALLMODELS-APR-25.csv");
    }
}

//! Filesystem archive: where sources, records, the catalog, and
//! rendered outputs live, and which of them are out of date.
//!
//! Layout under the build root:
//!
//! ```text
//! build/
//! ├── _index.json              catalog of all published records
//! ├── about.md                 source, synced from the authoring dir
//! ├── about.json               canonical record for about.md
//! ├── about.html               rendered output, one per format
//! └── field-notes/
//!     └── ...                  same shape, nested arbitrarily
//! ```
//!
//! Staleness is pure mtime arithmetic: an output is stale when it does
//! not exist or its input was modified after it. Equal timestamps count
//! as fresh. A missing input is an error, never "fresh".

use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::config::Config;
use crate::index::INDEX_FILENAME;

/// Is `output` out of date with respect to `input`?
///
/// `None` output means the work is always performed. Missing input is an
/// error: there is nothing to build from.
pub fn is_stale(input: &Path, output: Option<&Path>) -> io::Result<bool> {
    let input_modified = std::fs::metadata(input)?.modified()?;
    let output = match output {
        Some(output) => output,
        None => return Ok(true),
    };
    match std::fs::metadata(output) {
        Ok(meta) => Ok(input_modified > meta.modified()?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

/// Handle on the archive directories.
pub struct Archivist {
    pub root: PathBuf,
    pub source: PathBuf,
}

impl Archivist {
    pub fn new(config: &Config) -> Self {
        Archivist {
            root: config.options.root.clone(),
            source: config.options.source.clone(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILENAME)
    }

    /// Sync the authoring directory into the archive, copying files that
    /// are stale there. Returns how many were copied.
    pub fn gather_sources(&self) -> io::Result<usize> {
        let mut copied = 0;
        for entry in WalkDir::new(&self.source).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.source)
                .map_err(io::Error::other)?;
            let dest = self.root.join(relative);
            if is_stale(entry.path(), Some(&dest))? {
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(entry.path(), &dest)?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Markdown sources in the archive whose record is missing or older.
    pub fn sources_needing_update(&self) -> io::Result<Vec<PathBuf>> {
        let mut pending = Vec::new();
        for path in self.files_with_extension("md")? {
            let record = path.with_extension("json");
            if is_stale(&path, Some(&record))? {
                pending.push(path);
            }
        }
        Ok(pending)
    }

    /// Records newer than the catalog.
    pub fn records_needing_indexing(&self) -> io::Result<Vec<PathBuf>> {
        let index = self.index_path();
        let mut pending = Vec::new();
        for path in self.record_paths()? {
            if is_stale(&path, Some(&index))? {
                pending.push(path);
            }
        }
        Ok(pending)
    }

    /// All record files in the archive, catalog excluded.
    pub fn record_paths(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .files_with_extension("json")?
            .into_iter()
            .filter(|p| p.file_name().map(|n| n != INDEX_FILENAME).unwrap_or(true))
            .collect())
    }

    fn files_with_extension(&self, extension: &str) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().map(|e| e == extension).unwrap_or(false)
            {
                paths.push(entry.path().to_path_buf());
            }
        }
        Ok(paths)
    }

    /// Read one JSON file, tolerating damage: a file that cannot be read
    /// or parsed is logged and skipped.
    pub fn load_json(&self, path: &Path) -> Option<Value> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read record");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed record, skipping");
                None
            }
        }
    }

    /// Write a JSON value pretty-printed with sorted keys.
    pub fn write_json(&self, path: &Path, value: &Value) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut raw = serde_json::to_string_pretty(value)?;
        raw.push('\n');
        std::fs::write(path, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    fn archivist(dir: &TempDir) -> Archivist {
        let mut config = Config::default();
        config.options.root = dir.path().join("build");
        config.options.source = dir.path().join("content");
        std::fs::create_dir_all(&config.options.root).unwrap();
        std::fs::create_dir_all(&config.options.source).unwrap();
        Archivist::new(&config)
    }

    // =========================================================================
    // Staleness arithmetic
    // =========================================================================

    #[test]
    fn missing_output_is_stale() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.md");
        std::fs::write(&input, "x").unwrap();
        assert!(is_stale(&input, Some(&dir.path().join("a.json"))).unwrap());
    }

    #[test]
    fn no_output_is_always_stale() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.md");
        std::fs::write(&input, "x").unwrap();
        assert!(is_stale(&input, None).unwrap());
    }

    #[test]
    fn equal_mtimes_are_fresh() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.md");
        let output = dir.path().join("a.json");
        std::fs::write(&input, "x").unwrap();
        std::fs::write(&output, "y").unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_mtime(&input, t);
        set_mtime(&output, t);
        assert!(!is_stale(&input, Some(&output)).unwrap());
    }

    #[test]
    fn newer_input_is_stale() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.md");
        let output = dir.path().join("a.json");
        std::fs::write(&input, "x").unwrap();
        std::fs::write(&output, "y").unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_mtime(&output, t);
        set_mtime(&input, t + Duration::from_secs(10));
        assert!(is_stale(&input, Some(&output)).unwrap());
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(is_stale(&dir.path().join("gone.md"), None).is_err());
    }

    // =========================================================================
    // Source sync
    // =========================================================================

    #[test]
    fn gather_copies_new_sources() {
        let dir = TempDir::new().unwrap();
        let archivist = archivist(&dir);
        std::fs::create_dir_all(archivist.source.join("notes")).unwrap();
        std::fs::write(archivist.source.join("a.md"), "Title: A\n\nbody\n").unwrap();
        std::fs::write(archivist.source.join("notes/b.md"), "Title: B\n\nbody\n").unwrap();

        assert_eq!(archivist.gather_sources().unwrap(), 2);
        assert!(archivist.root.join("a.md").exists());
        assert!(archivist.root.join("notes/b.md").exists());
    }

    #[test]
    fn gather_skips_fresh_copies() {
        let dir = TempDir::new().unwrap();
        let archivist = archivist(&dir);
        let src = archivist.source.join("a.md");
        std::fs::write(&src, "x").unwrap();
        assert_eq!(archivist.gather_sources().unwrap(), 1);

        // Mark the copy newer than the source.
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_mtime(&src, t);
        set_mtime(&archivist.root.join("a.md"), t + Duration::from_secs(10));
        assert_eq!(archivist.gather_sources().unwrap(), 0);
    }

    // =========================================================================
    // Pending-work queries
    // =========================================================================

    #[test]
    fn source_without_record_needs_update() {
        let dir = TempDir::new().unwrap();
        let archivist = archivist(&dir);
        std::fs::write(archivist.root.join("a.md"), "x").unwrap();
        let pending = archivist.sources_needing_update().unwrap();
        assert_eq!(pending, vec![archivist.root.join("a.md")]);
    }

    #[test]
    fn index_query_excludes_the_catalog_itself() {
        let dir = TempDir::new().unwrap();
        let archivist = archivist(&dir);
        std::fs::write(archivist.root.join("a.json"), "{}").unwrap();
        std::fs::write(archivist.index_path(), "{}").unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_mtime(&archivist.index_path(), t);
        set_mtime(&archivist.root.join("a.json"), t + Duration::from_secs(10));

        let pending = archivist.records_needing_indexing().unwrap();
        assert_eq!(pending, vec![archivist.root.join("a.json")]);
    }

    #[test]
    fn damaged_record_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let archivist = archivist(&dir);
        let path = archivist.root.join("bad.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(archivist.load_json(&path).is_none());
    }

    #[test]
    fn write_json_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let archivist = archivist(&dir);
        let path = archivist.root.join("deep/nested/a.json");
        archivist
            .write_json(&path, &serde_json::json!({"b": 1, "a": 2}))
            .unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        // Sorted keys, trailing newline.
        assert!(raw.find("\"a\"").unwrap() < raw.find("\"b\"").unwrap());
        assert!(raw.ends_with('\n'));
    }
}

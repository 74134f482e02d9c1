//! JSON document I/O with atomic writes
//!
//! A document is either fully replaced or left untouched; a crash mid-write
//! leaves only a stray `.tmp` sibling behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{SpendwiseError, SpendwiseResult};

fn storage_err(context: &str, path: &Path, err: impl std::fmt::Display) -> SpendwiseError {
    SpendwiseError::Storage(format!("{} {}: {}", context, path.display(), err))
}

/// Read a JSON document, returning the default value if the file doesn't exist
pub fn read_json<T, P>(path: P) -> SpendwiseResult<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path).map_err(|e| storage_err("Failed to open", path, e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| storage_err("Failed to parse", path, e))
}

/// Write a JSON document atomically (write a temp sibling, sync, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> SpendwiseResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| storage_err("Failed to create directory", parent, e))?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = path.with_extension("json.tmp");

    let file =
        File::create(&temp_path).map_err(|e| storage_err("Failed to create", &temp_path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| storage_err("Failed to serialize", path, e))?;
    writer
        .flush()
        .map_err(|e| storage_err("Failed to flush", &temp_path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| storage_err("Failed to sync", &temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        storage_err("Failed to replace", path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct Doc {
        entries: Vec<String>,
    }

    #[test]
    fn test_missing_file_reads_default() {
        let temp_dir = TempDir::new().unwrap();
        let doc: Doc = read_json(temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(doc, Doc::default());
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("doc.json");
        let doc = Doc {
            entries: vec!["a".into(), "b".into()],
        };

        write_json_atomic(&path, &doc).unwrap();

        let loaded: Doc = read_json(&path).unwrap();
        assert_eq!(loaded, doc);
        assert!(!temp_dir.path().join("nested").join("doc.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, "{ not json").unwrap();

        let result: SpendwiseResult<Doc> = read_json(&path);
        assert!(matches!(result, Err(SpendwiseError::Storage(_))));
    }
}

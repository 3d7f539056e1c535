//! Filesystem side of a round: lenient reads, change detection and atomic
//! publish.

use std::{
    fs,
    io::{self, Write},
    path::Path,
    time::SystemTime,
};

use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::CoordinatorError;

/// Read a JSON object from `path`.
///
/// A missing file, unreadable file, malformed JSON or non-object document
/// all yield an empty object.
pub fn read_json_or_empty(path: &Path) -> Value {
    let empty = || Value::Object(Map::new());

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "not present, treating as empty");
            return empty();
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable, treating as empty");
            return empty();
        },
    };

    match serde_json::from_str::<Value>(&contents) {
        Ok(doc @ Value::Object(_)) => doc,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "not a JSON object, treating as empty");
            empty()
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed JSON, treating as empty");
            empty()
        },
    }
}

/// Modification time of `path`, or `None` if it does not exist.
pub fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Write `doc` as pretty JSON to `path` atomically.
///
/// The document goes to a temp file in the same directory, which is then
/// renamed over `path`. A concurrent reader sees the old file or the new
/// one, never a partial write.
pub fn write_atomic<T: Serialize>(path: &Path, doc: &T) -> Result<(), CoordinatorError> {
    let publish_error = |source: io::Error| CoordinatorError::Publish {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(publish_error)?;
    serde_json::to_writer_pretty(&mut temp, doc)?;
    temp.write_all(b"\n").map_err(publish_error)?;
    temp.as_file().sync_all().map_err(publish_error)?;
    temp.persist(path).map_err(|e| publish_error(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_and_malformed_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(read_json_or_empty(&missing), json!({}));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{not json").unwrap();
        assert_eq!(read_json_or_empty(&garbage), json!({}));

        let array = dir.path().join("array.json");
        fs::write(&array, "[1, 2, 3]").unwrap();
        assert_eq!(read_json_or_empty(&array), json!({}));
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.json");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, &json!({"pairs": []})).unwrap();

        assert_eq!(read_json_or_empty(&path), json!({"pairs": []}));
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temp file was renamed, not left behind");
    }

    #[test]
    fn atomic_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("view.json");

        let result = write_atomic(&path, &json!({}));
        assert!(matches!(result, Err(CoordinatorError::Publish { .. })));
    }

    #[test]
    fn modified_tracks_presence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update.json");
        assert!(modified(&path).is_none());

        fs::write(&path, "{}").unwrap();
        assert!(modified(&path).is_some());
    }
}

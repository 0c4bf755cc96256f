// storage.rs - Persistence helpers
// Bank and case log documents live as JSON files in the data directory.
// A missing file means "start fresh"; a corrupt one is an error so nothing
// gets silently overwritten.

use crate::json::{self, JsonError};
use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const BANK_FILE: &str = "bank.json";
pub const MODLOG_FILE: &str = "modlog.json";

/// Load a document, or its default when the file does not exist yet
pub fn load_or_default<T>(path: &Path) -> Result<T, JsonError>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        debug!("[STORAGE] {} not found, starting with defaults", path.display());
        return Ok(T::default());
    }
    let file = fs::File::open(path)?;
    let value = json::load(file)?;
    info!("[STORAGE] Loaded {}", path.display());
    Ok(value)
}

/// Write a document atomically: a uniquely named temp file beside the
/// target, then a rename over it
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), JsonError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    let mut tmp = NamedTempFile::new_in(dir)?;
    json::dump(value, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!("[STORAGE] Saved {}", path.display());
    Ok(())
}

/// `save` on the blocking pool, for callers inside async tasks
pub async fn save_in_background<T>(path: PathBuf, value: T) -> Result<(), JsonError>
where
    T: Serialize + Send + 'static,
{
    tokio::task::spawn_blocking(move || save(&path, &value))
        .await
        .map_err(|e| JsonError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: BTreeMap<u64, String> = load_or_default(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        let mut doc = BTreeMap::new();
        doc.insert(7u64, "seven".to_string());

        save(&path, &doc).unwrap();
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);

        let loaded: BTreeMap<u64, String> = load_or_default(&path).unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_leave_one_valid_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");

        let mut tasks = Vec::new();
        for n in 0..16u64 {
            let path = path.clone();
            let doc: BTreeMap<u64, String> = (0..200).map(|k| (k, format!("writer {}", n))).collect();
            tasks.push(tokio::spawn(save_in_background(path, doc)));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let loaded: BTreeMap<u64, String> = load_or_default(&path).unwrap();
        assert_eq!(loaded.len(), 200);
        let writer = loaded[&0].clone();
        assert!(loaded.values().all(|v| *v == writer));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{").unwrap();
        assert!(load_or_default::<BTreeMap<u64, String>>(&path).is_err());
    }
}

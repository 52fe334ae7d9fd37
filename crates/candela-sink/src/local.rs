//! Directory-backed feature store.
//!
//! Layout under the store root, per feature group:
//!
//! ```text
//! <root>/<name>_v<version>/online.jsonl          latest row per primary key
//! <root>/<name>_v<version>/staging.jsonl         rows not yet materialized
//! <root>/<name>_v<version>/offline/part-NNNNN.parquet
//! ```

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use candela_types::Record;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{FeatureGroup, FeatureStore, StoreError};

const ONLINE_FILE: &str = "online.jsonl";
const STAGING_FILE: &str = "staging.jsonl";
const OFFLINE_DIR: &str = "offline";

/// Feature store kept in a local directory.
///
/// Writes are serialized within one store instance.
#[derive(Debug)]
pub struct LocalFeatureStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl LocalFeatureStore {
    /// Creates a store rooted at `root`. Directories are created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory holding a group's tables.
    #[must_use]
    pub fn group_dir(&self, group: &FeatureGroup) -> PathBuf {
        self.root.join(group.to_string())
    }

    /// Reads the online table of a group. A group never written is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or parsed.
    pub fn read_online(&self, group: &FeatureGroup) -> Result<Vec<Record>, StoreError> {
        read_jsonl(&self.group_dir(group).join(ONLINE_FILE))
    }

    /// Reads the rows staged for the next offline materialization.
    ///
    /// # Errors
    ///
    /// Returns an error if the staging log cannot be read or parsed.
    pub fn read_staged(&self, group: &FeatureGroup) -> Result<Vec<Record>, StoreError> {
        read_jsonl(&self.group_dir(group).join(STAGING_FILE))
    }

    /// Lists the materialized Parquet parts of a group in write order.
    ///
    /// # Errors
    ///
    /// Returns an error if the offline directory cannot be listed.
    pub fn offline_parts(&self, group: &FeatureGroup) -> Result<Vec<PathBuf>, StoreError> {
        list_parts(&self.group_dir(group).join(OFFLINE_DIR))
    }

    /// Materializes the staged rows of a group into a new Parquet part.
    ///
    /// Returns the written part, or `None` if nothing was staged.
    ///
    /// # Errors
    ///
    /// Returns an error if the part cannot be written.
    pub async fn materialize(&self, group: &FeatureGroup) -> Result<Option<PathBuf>, StoreError> {
        let _guard = self.lock.lock().await;
        let dir = self.group_dir(group);
        run_blocking(move || materialize_blocking(&dir)).await
    }
}

#[async_trait]
impl FeatureStore for LocalFeatureStore {
    async fn upsert(
        &self,
        batch: &[Record],
        group: &FeatureGroup,
        materialize_offline: bool,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let dir = self.group_dir(group);
        let batch = batch.to_vec();
        let group = group.clone();
        run_blocking(move || {
            let staged_from = upsert_blocking(&dir, &batch, &group)?;
            if materialize_offline {
                if let Err(e) = materialize_blocking(&dir) {
                    // A retried batch is staged again, so unstage this one.
                    unstage(&dir, staged_from)?;
                    return Err(e);
                }
            }
            Ok(())
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
}

/// Upserts `batch` into the online table and stages it.
///
/// Returns the staging file length before the batch was appended.
fn upsert_blocking(dir: &Path, batch: &[Record], group: &FeatureGroup) -> Result<u64, StoreError> {
    let keys = batch
        .iter()
        .map(|record| group.key_of(record))
        .collect::<Result<Vec<_>, _>>()?;

    fs::create_dir_all(dir)?;
    let online_path = dir.join(ONLINE_FILE);
    let mut rows = read_jsonl(&online_path)?;
    let mut index: HashMap<Vec<String>, usize> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| group.key_of(row).ok().map(|key| (key, i)))
        .collect();

    for (key, record) in keys.into_iter().zip(batch) {
        match index.get(&key) {
            Some(&i) => rows[i] = record.clone(),
            None => {
                index.insert(key, rows.len());
                rows.push(record.clone());
            }
        }
    }

    let tmp_path = dir.join(format!("{ONLINE_FILE}.tmp"));
    write_jsonl(File::create(&tmp_path)?, &rows)?;
    fs::rename(&tmp_path, &online_path)?;

    let staging = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(STAGING_FILE))?;
    let staged_from = staging.metadata()?.len();
    write_jsonl(staging, batch)?;

    debug!(group = %group, records = batch.len(), online_rows = rows.len(), "online table updated");
    Ok(staged_from)
}

/// Truncates the staging file back to `len` bytes.
fn unstage(dir: &Path, len: u64) -> Result<(), StoreError> {
    let staging = OpenOptions::new().write(true).open(dir.join(STAGING_FILE))?;
    staging.set_len(len)?;
    debug!(dir = %dir.display(), len, "staged batch rolled back");
    Ok(())
}

#[cfg(feature = "parquet")]
fn materialize_blocking(dir: &Path) -> Result<Option<PathBuf>, StoreError> {
    let staging_path = dir.join(STAGING_FILE);
    let staged = read_jsonl(&staging_path)?;
    if staged.is_empty() {
        return Ok(None);
    }

    let offline_dir = dir.join(OFFLINE_DIR);
    fs::create_dir_all(&offline_dir)?;
    let part = offline_dir.join(format!("part-{:05}.parquet", list_parts(&offline_dir)?.len()));

    let written = File::create(&part)
        .map_err(StoreError::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            crate::write_records(&staged, &mut writer)?;
            writer.flush()?;
            Ok(())
        });
    if let Err(e) = written {
        let _ = fs::remove_file(&part);
        return Err(e);
    }
    File::create(&staging_path)?;

    info!(part = %part.display(), rows = staged.len(), "offline part materialized");
    Ok(Some(part))
}

#[cfg(not(feature = "parquet"))]
fn materialize_blocking(_dir: &Path) -> Result<Option<PathBuf>, StoreError> {
    Err(StoreError::MaterializeUnsupported)
}

fn list_parts(offline_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match fs::read_dir(offline_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut parts = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "parquet") {
            parts.push(path);
        }
    }
    parts.sort();
    Ok(parts)
}

fn read_jsonl(path: &Path) -> Result<Vec<Record>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(StoreError::from))
        .collect()
}

fn write_jsonl(file: File, rows: &[Record]) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(ts: i64, close: f64) -> Record {
        match json!({"product_id": "BTC/USD", "timestamp_ms": ts, "close": close}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_upsert_by_primary_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFeatureStore::new(dir.path());
        let group = FeatureGroup::new("ohlcv", 1);

        store.upsert(&[record(10, 1.0), record(20, 2.0)], &group, false).await.unwrap();
        store.upsert(&[record(20, 5.0), record(30, 3.0)], &group, false).await.unwrap();

        let online = store.read_online(&group).unwrap();
        assert_eq!(online.len(), 3);
        assert_eq!(online[1]["close"], 5.0);
        assert_eq!(store.read_staged(&group).unwrap().len(), 4);
        assert!(store.offline_parts(&group).unwrap().is_empty());

        // A fresh instance sees the persisted table.
        let reopened = LocalFeatureStore::new(dir.path());
        assert_eq!(reopened.read_online(&group).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_materialize_offline() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFeatureStore::new(dir.path());
        let group = FeatureGroup::new("ohlcv", 1);

        store.upsert(&[record(10, 1.0)], &group, false).await.unwrap();
        store.upsert(&[record(20, 2.0)], &group, true).await.unwrap();

        let parts = store.offline_parts(&group).unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].ends_with("ohlcv_v1/offline/part-00000.parquet"));
        assert!(store.read_staged(&group).unwrap().is_empty());

        store.upsert(&[record(30, 3.0)], &group, false).await.unwrap();
        let part = store.materialize(&group).await.unwrap().unwrap();
        assert!(part.ends_with("part-00001.parquet"));
        assert_eq!(store.materialize(&group).await.unwrap(), None);
    }

    #[cfg(feature = "parquet")]
    #[tokio::test]
    async fn test_failed_materialize_is_not_staged_twice() {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let dir = tempfile::tempdir().unwrap();
        let store = LocalFeatureStore::new(dir.path());
        let group = FeatureGroup::new("ohlcv", 1);
        store.upsert(&[record(10, 1.0)], &group, false).await.unwrap();

        // A plain file where the offline directory belongs makes materializing fail.
        let offline = store.group_dir(&group).join(OFFLINE_DIR);
        fs::write(&offline, b"").unwrap();
        let batch = [record(20, 2.0), record(30, 3.0)];
        assert!(store.upsert(&batch, &group, true).await.is_err());
        assert_eq!(store.read_staged(&group).unwrap().len(), 1);

        fs::remove_file(&offline).unwrap();
        store.upsert(&batch, &group, true).await.unwrap();

        assert_eq!(store.read_online(&group).unwrap().len(), 3);
        assert!(store.read_staged(&group).unwrap().is_empty());
        let parts = store.offline_parts(&group).unwrap();
        assert_eq!(parts.len(), 1);
        let reader = SerializedFileReader::new(File::open(&parts[0]).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 3);
    }

    #[tokio::test]
    async fn test_missing_field_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFeatureStore::new(dir.path());
        let group = FeatureGroup::new("ohlcv", 1);
        let mut bad = record(10, 1.0);
        bad.remove("timestamp_ms");

        let err = store.upsert(&[record(5, 1.0), bad], &group, false).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingField { .. }));
        assert!(store.read_online(&group).unwrap().is_empty());
        assert!(store.read_staged(&group).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_group_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFeatureStore::new(dir.path());
        assert!(store.read_online(&FeatureGroup::new("none", 1)).unwrap().is_empty());
    }
}

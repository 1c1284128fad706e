/// 目录存储实现
///
/// 每条记录一个 JSON 文件：`rom-<id>.json` 与 `history-<id>.json`。
/// 写入先落到同目录的临时文件，再原子替换目标文件。
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::traits::ArtifactStore;
use crate::artifact::Artifact;
use crate::editor::HistoryRecord;
use crate::utils::StamperError;

const ARTIFACT_PREFIX: &str = "rom-";
const HISTORY_PREFIX: &str = "history-";
const RECORD_EXTENSION: &str = ".json";

/// 基于文件系统目录的制品存储
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// 打开（必要时创建）存储目录
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StamperError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, id: &str) -> PathBuf {
        self.root
            .join(format!("{}{}{}", ARTIFACT_PREFIX, id, RECORD_EXTENSION))
    }

    fn history_path(&self, artifact_id: &str) -> PathBuf {
        self.root
            .join(format!("{}{}{}", HISTORY_PREFIX, artifact_id, RECORD_EXTENSION))
    }

    /// 原子写入一条记录
    fn write_record<T: Serialize>(&self, path: &Path, record: &T) -> Result<(), StamperError> {
        let write_failed = |e: std::io::Error| {
            StamperError::StorageWriteFailed(format!("{}: {}", path.display(), e))
        };

        let json = serde_json::to_vec_pretty(record)?;
        let mut temp = tempfile::NamedTempFile::new_in(&self.root).map_err(write_failed)?;
        temp.write_all(&json).map_err(write_failed)?;
        temp.as_file().sync_all().map_err(write_failed)?;
        temp.persist(path).map_err(|e| write_failed(e.error))?;
        Ok(())
    }

    fn read_record<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StamperError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StamperError::CorruptRecord(format!("{}: {}", path.display(), e)))
    }

    fn remove_record(&self, path: &Path) -> Result<bool, StamperError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StamperError::StorageWriteFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// id 只允许字母、数字、`-` 和 `_`，防止路径穿越
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_writable_id(id: &str) -> Result<(), StamperError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(StamperError::StorageWriteFailed(format!(
            "invalid record id: {:?}",
            id
        )))
    }
}

impl ArtifactStore for DirStore {
    fn get_artifact(&self, id: &str) -> Result<Option<Artifact>, StamperError> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        self.read_record(&self.artifact_path(id))
    }

    fn put_artifact(&mut self, artifact: &Artifact) -> Result<(), StamperError> {
        check_writable_id(&artifact.id)?;
        self.write_record(&self.artifact_path(&artifact.id), artifact)
    }

    fn delete_artifact(&mut self, id: &str) -> Result<bool, StamperError> {
        if !is_valid_id(id) {
            return Ok(false);
        }
        self.remove_record(&self.artifact_path(id))
    }

    fn list_artifacts(&self) -> Result<Vec<Artifact>, StamperError> {
        let mut artifacts = Vec::new();

        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_artifact = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(ARTIFACT_PREFIX) && name.ends_with(RECORD_EXTENSION))
                .unwrap_or(false);
            if !is_artifact {
                continue;
            }

            // 单个损坏的记录不影响列表
            match self.read_record::<Artifact>(&path) {
                Ok(Some(artifact)) => artifacts.push(artifact),
                Ok(None) => {}
                Err(e) => log::warn!("skipping unreadable record: {}", e),
            }
        }

        Ok(artifacts)
    }

    fn get_history(&self, artifact_id: &str) -> Result<Option<HistoryRecord>, StamperError> {
        if !is_valid_id(artifact_id) {
            return Ok(None);
        }
        self.read_record(&self.history_path(artifact_id))
    }

    fn put_history(&mut self, record: &HistoryRecord) -> Result<(), StamperError> {
        check_writable_id(&record.artifact_id)?;
        self.write_record(&self.history_path(&record.artifact_id), record)
    }

    fn delete_history(&mut self, artifact_id: &str) -> Result<bool, StamperError> {
        if !is_valid_id(artifact_id) {
            return Ok(false);
        }
        self.remove_record(&self.history_path(artifact_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact::new("1700000000000", "kernal.bin", vec![0x20u8; 8192]);

        let mut store = DirStore::open(dir.path()).unwrap();
        store.put_artifact(&artifact).unwrap();
        assert!(dir.path().join("rom-1700000000000.json").exists());

        let reopened = DirStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get_artifact("1700000000000").unwrap(), Some(artifact));
    }

    #[test]
    fn test_history_file_is_separate() {
        let dir = TempDir::new().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();

        store.put_history(&HistoryRecord::empty("7")).unwrap();
        assert!(dir.path().join("history-7.json").exists());
        assert_eq!(store.get_history("7").unwrap(), Some(HistoryRecord::empty("7")));

        assert!(store.delete_history("7").unwrap());
        assert!(!store.delete_history("7").unwrap());
        assert!(store.get_history("7").unwrap().is_none());
    }

    #[test]
    fn test_list_skips_corrupt_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();
        store.put_artifact(&Artifact::new("1", "a.bin", vec![0u8; 4096])).unwrap();
        store.put_history(&HistoryRecord::empty("1")).unwrap();
        std::fs::write(dir.path().join("rom-2.json"), b"{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let listed = store.list_artifacts().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "1");

        assert!(matches!(store.get_artifact("2"), Err(StamperError::CorruptRecord(_))));
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();

        let artifact = Artifact::new("../escape", "a.bin", vec![0u8; 4096]);
        assert!(matches!(
            store.put_artifact(&artifact),
            Err(StamperError::StorageWriteFailed(_))
        ));
        assert!(store.get_artifact("../escape").unwrap().is_none());
    }

    #[test]
    fn test_creates_missing_root() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("store").join("roms");
        let store = DirStore::open(&nested).unwrap();
        assert!(store.root().is_dir());
    }
}

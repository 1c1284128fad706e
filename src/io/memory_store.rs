/// 内存存储实现
///
/// 可选的字节配额用于模拟浏览器存储的配额超限
use std::collections::HashMap;

use super::traits::ArtifactStore;
use crate::artifact::Artifact;
use crate::editor::HistoryRecord;
use crate::utils::StamperError;

/// 基于 HashMap 的制品存储
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    artifacts: HashMap<String, Artifact>,
    histories: HashMap<String, HistoryRecord>,
    /// 每个键占用的序列化字节数
    usage: HashMap<String, usize>,
    /// 总字节配额
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带配额的存储，所有记录序列化后的总大小不得超过 `quota`
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// 修改配额（None 表示不限）
    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    /// 当前已使用的字节数
    pub fn used_bytes(&self) -> usize {
        self.usage.values().sum()
    }

    /// 检查写入 `key` 后是否会超出配额
    fn reserve(&self, key: &str, size: usize) -> Result<(), StamperError> {
        if let Some(quota) = self.quota {
            let current = self.usage.get(key).copied().unwrap_or(0);
            let total = self.used_bytes() - current + size;
            if total > quota {
                return Err(StamperError::StorageWriteFailed(format!(
                    "quota exceeded: {} of {} bytes",
                    total, quota
                )));
            }
        }
        Ok(())
    }
}

fn artifact_key(id: &str) -> String {
    format!("rom-{}", id)
}

fn history_key(artifact_id: &str) -> String {
    format!("history-{}", artifact_id)
}

impl ArtifactStore for MemoryStore {
    fn get_artifact(&self, id: &str) -> Result<Option<Artifact>, StamperError> {
        Ok(self.artifacts.get(id).cloned())
    }

    fn put_artifact(&mut self, artifact: &Artifact) -> Result<(), StamperError> {
        let key = artifact_key(&artifact.id);
        let size = serde_json::to_vec(artifact)?.len();
        self.reserve(&key, size)?;

        self.usage.insert(key, size);
        self.artifacts.insert(artifact.id.clone(), artifact.clone());
        Ok(())
    }

    fn delete_artifact(&mut self, id: &str) -> Result<bool, StamperError> {
        self.usage.remove(&artifact_key(id));
        Ok(self.artifacts.remove(id).is_some())
    }

    fn list_artifacts(&self) -> Result<Vec<Artifact>, StamperError> {
        Ok(self.artifacts.values().cloned().collect())
    }

    fn get_history(&self, artifact_id: &str) -> Result<Option<HistoryRecord>, StamperError> {
        Ok(self.histories.get(artifact_id).cloned())
    }

    fn put_history(&mut self, record: &HistoryRecord) -> Result<(), StamperError> {
        let key = history_key(&record.artifact_id);
        let size = serde_json::to_vec(record)?.len();
        self.reserve(&key, size)?;

        self.usage.insert(key, size);
        self.histories.insert(record.artifact_id.clone(), record.clone());
        Ok(())
    }

    fn delete_history(&mut self, artifact_id: &str) -> Result<bool, StamperError> {
        self.usage.remove(&history_key(artifact_id));
        Ok(self.histories.remove(artifact_id).is_some())
    }
}

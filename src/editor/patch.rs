/// 补丁应用模块
///
/// 把字段集编码进存储中的最新字节，并写回存储。
use crate::artifact::Artifact;
use crate::codec::{self, FieldSet};
use crate::io::ArtifactStore;
use crate::utils::StamperError;

/// 补丁应用器
///
/// 要么完整写入新缓冲区，要么失败且存储中的制品保持不变
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchApplier;

impl PatchApplier {
    /// 将字段集保存到制品
    ///
    /// # 行为
    /// - 重新读取存储中的当前字节（保留带外修改）
    /// - 编码字段集，写回存储
    /// - 更新 `last_modified`，`change_count` 加一
    ///
    /// # 返回
    /// 返回保存后的制品
    pub fn save(
        &self,
        store: &mut dyn ArtifactStore,
        artifact_id: &str,
        fields: &FieldSet,
    ) -> Result<Artifact, StamperError> {
        let stored = store
            .get_artifact(artifact_id)?
            .ok_or_else(|| StamperError::ArtifactNotFound(artifact_id.to_string()))?;

        let patched = codec::encode(&stored.payload, fields)?;
        let saved = stored.with_saved_payload(patched);
        store.put_artifact(&saved)?;

        log::info!(
            "saved {} ({}), {} edits",
            saved.name,
            saved.id,
            saved.metadata.change_count
        );
        Ok(saved)
    }
}

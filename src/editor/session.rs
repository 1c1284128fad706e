/// 编辑会话模块
///
/// 持有当前打开制品的字段集，把修改记入历史，并在保存时调用补丁应用器。
/// 所有修改仅在内存中进行，需要显式调用 `save`。
use crate::artifact::Artifact;
use crate::codec::{self, FieldName, FieldSet, FieldValue};
use crate::io::ArtifactStore;
use crate::utils::StamperError;

use super::history::{ChangeData, HistoryLog, HistorySummary};
use super::patch::PatchApplier;

/// 编辑会话 - 管理一个制品的编辑状态
///
/// # 核心特性
/// - **Stateful**: 维护当前字段集，支持多次修改后统一保存
/// - **可追踪**: 每次有效修改都记入历史，支持撤销/重做
/// - **失败无副作用**: 历史写入失败时，字段集与历史都保持原样
///
/// # 使用示例
///
/// ```rust,ignore
/// use kernel_stamper::{EditSession, FieldName};
/// use kernel_stamper::io::MemoryStore;
///
/// let mut session = EditSession::open(&store, "1700000000000")?;
/// session.set_field(&mut store, FieldName::Line1, "HELLO WORLD")?;
/// session.undo(&mut store)?;
/// session.save(&mut store)?;
/// ```
#[derive(Debug, Clone)]
pub struct EditSession {
    artifact_id: String,
    fields: FieldSet,
    history: HistoryLog,
}

impl EditSession {
    /// 打开制品：解码字段，并挂上它的历史（不存在则新建）
    pub fn open(store: &dyn ArtifactStore, artifact_id: &str) -> Result<Self, StamperError> {
        let artifact = store
            .get_artifact(artifact_id)?
            .ok_or_else(|| StamperError::ArtifactNotFound(artifact_id.to_string()))?;

        let fields = codec::decode(&artifact.payload)?;
        let history = match store.get_history(artifact_id)? {
            Some(record) => HistoryLog::from_record(record)?,
            None => HistoryLog::new(artifact_id),
        };

        log::debug!(
            "opened {} ({}), {}",
            artifact.name,
            artifact.id,
            history.summary()
        );

        Ok(Self {
            artifact_id: artifact.id,
            fields,
            history,
        })
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// 当前字段集（只读）
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn summary(&self) -> HistorySummary {
        self.history.summary()
    }

    /// 修改单个字段
    ///
    /// # 返回
    /// 记录了新变更返回 `Ok(true)`；值与当前值相同则不做任何事，返回 `Ok(false)`
    pub fn set_field(
        &mut self,
        store: &mut dyn ArtifactStore,
        name: FieldName,
        value: impl Into<FieldValue>,
    ) -> Result<bool, StamperError> {
        let new_value = value.into();
        let mut next_fields = self.fields.clone();
        next_fields.set(name, new_value.clone())?;

        let old_value = self.fields.get(name);
        if old_value == new_value {
            return Ok(false);
        }

        let mut next_history = self.history.clone();
        next_history.record_change(
            name,
            ChangeData {
                old_value,
                new_value,
            },
            self.fields.clone(),
        );
        store.put_history(&next_history.to_record())?;

        self.fields = next_fields;
        self.history = next_history;
        Ok(true)
    }

    /// 撤销：把字段集恢复为该条目的修改前快照
    pub fn undo(&mut self, store: &mut dyn ArtifactStore) -> Result<&FieldSet, StamperError> {
        let mut next_history = self.history.clone();
        let restored = next_history.undo()?.previous_field_set.clone();
        store.put_history(&next_history.to_record())?;

        self.fields = restored;
        self.history = next_history;
        Ok(&self.fields)
    }

    /// 重做：在当前字段集上重放该条目的新值
    pub fn redo(&mut self, store: &mut dyn ArtifactStore) -> Result<&FieldSet, StamperError> {
        let mut next_history = self.history.clone();
        let mut next_fields = self.fields.clone();
        next_history.redo()?.replay_onto(&mut next_fields)?;
        store.put_history(&next_history.to_record())?;

        self.fields = next_fields;
        self.history = next_history;
        Ok(&self.fields)
    }

    /// 保存：基于存储中的最新字节写入当前字段集
    pub fn save(&self, store: &mut dyn ArtifactStore) -> Result<Artifact, StamperError> {
        PatchApplier.save(store, &self.artifact_id, &self.fields)
    }

    /// 关闭会话；已持久化的历史不受影响
    pub fn close(self) {
        log::debug!("closed session on {}", self.artifact_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStore;

    fn setup() -> (MemoryStore, EditSession) {
        let mut store = MemoryStore::new();
        store
            .put_artifact(&Artifact::new("1", "kernal.bin", vec![0u8; 8192]))
            .unwrap();
        let session = EditSession::open(&store, "1").unwrap();
        (store, session)
    }

    #[test]
    fn test_open_missing() {
        let store = MemoryStore::new();
        assert!(matches!(
            EditSession::open(&store, "nope"),
            Err(StamperError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn test_open_malformed() {
        let mut store = MemoryStore::new();
        store
            .put_artifact(&Artifact::new("1", "short.bin", vec![0u8; 64]))
            .unwrap();
        assert!(matches!(
            EditSession::open(&store, "1"),
            Err(StamperError::MalformedArtifact { len: 64 })
        ));
    }

    #[test]
    fn test_set_field_is_idempotent() {
        let (mut store, mut session) = setup();

        assert!(session.set_field(&mut store, FieldName::Line1, "HELLO").unwrap());
        assert!(!session.set_field(&mut store, FieldName::Line1, "HELLO").unwrap());
        assert_eq!(session.summary().total_changes, 1);
        assert_eq!(store.get_history("1").unwrap().unwrap().changes.len(), 1);
    }

    #[test]
    fn test_set_field_records_snapshot() {
        let (mut store, mut session) = setup();
        let before = session.fields().clone();

        session.set_field(&mut store, FieldName::BorderColor, 2u8).unwrap();

        let change = session.history().iter().next().unwrap();
        assert_eq!(change.change_type, FieldName::BorderColor);
        assert_eq!(change.change_data.old_value, FieldValue::Color(0));
        assert_eq!(change.change_data.new_value, FieldValue::Color(2));
        assert_eq!(change.previous_field_set, before);
    }

    #[test]
    fn test_set_field_type_mismatch() {
        let (mut store, mut session) = setup();
        let result = session.set_field(&mut store, FieldName::TextColor, "red");
        assert!(matches!(result, Err(StamperError::FieldTypeMismatch { .. })));
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_undo_redo_inverse() {
        let (mut store, mut session) = setup();
        let initial = session.fields().clone();

        session.set_field(&mut store, FieldName::Line1, "HELLO").unwrap();
        session.set_field(&mut store, FieldName::Line2, "WORLD").unwrap();
        session.set_field(&mut store, FieldName::TextColor, 1u8).unwrap();
        session.set_field(&mut store, FieldName::Line1, "GOODBYE").unwrap();
        let last = session.fields().clone();

        for _ in 0..4 {
            session.undo(&mut store).unwrap();
        }
        assert_eq!(session.fields(), &initial);
        assert!(matches!(session.undo(&mut store), Err(StamperError::NothingToUndo)));

        for _ in 0..4 {
            session.redo(&mut store).unwrap();
        }
        assert_eq!(session.fields(), &last);
        assert!(matches!(session.redo(&mut store), Err(StamperError::NothingToRedo)));
    }

    #[test]
    fn test_branch_truncation() {
        let (mut store, mut session) = setup();
        session.set_field(&mut store, FieldName::BorderColor, 1u8).unwrap();
        session.set_field(&mut store, FieldName::BorderColor, 2u8).unwrap();

        session.undo(&mut store).unwrap();
        session.set_field(&mut store, FieldName::BackgroundColor, 3u8).unwrap();

        assert!(matches!(session.redo(&mut store), Err(StamperError::NothingToRedo)));
        assert_eq!(session.fields().border_color, 1);
        assert_eq!(session.fields().background_color, 3);
    }

    #[test]
    fn test_failed_history_write_keeps_state() {
        let (mut store, mut session) = setup();
        session.set_field(&mut store, FieldName::Line1, "HELLO").unwrap();
        let fields = session.fields().clone();
        let summary = session.summary();

        store.set_quota(Some(store.used_bytes()));
        let result = session.set_field(&mut store, FieldName::Line2, "A MUCH LONGER LINE");
        assert!(matches!(result, Err(StamperError::StorageWriteFailed(_))));
        assert_eq!(session.fields(), &fields);
        assert_eq!(session.summary(), summary);
    }

    #[test]
    fn test_save_keeps_out_of_band_bytes() {
        let (mut store, mut session) = setup();
        session.set_field(&mut store, FieldName::Line1, "HELLO").unwrap();

        // 打开之后，存储中的字节被其他途径修改
        let mut stored = store.get_artifact("1").unwrap().unwrap();
        stored.payload[0] = 0x42;
        stored.payload[1141] = b'X';
        store.put_artifact(&stored).unwrap();

        let saved = session.save(&mut store).unwrap();
        assert_eq!(saved.payload[0], 0x42);
        assert_eq!(&saved.payload[1141..1146], b"HELLO");
    }

    #[test]
    fn test_history_survives_reopen() {
        let (mut store, mut session) = setup();
        session.set_field(&mut store, FieldName::Line1, "HELLO").unwrap();
        session.set_field(&mut store, FieldName::Line1, "WORLD").unwrap();
        session.undo(&mut store).unwrap();
        session.close();

        let reopened = EditSession::open(&store, "1").unwrap();
        let summary = reopened.summary();
        assert_eq!(summary.total_changes, 2);
        assert_eq!(summary.current_position, 1);
        assert!(summary.can_redo);
    }
}

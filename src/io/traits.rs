/// IO 抽象层 - trait 定义
///
/// 制品存储的抽象接口，支持依赖注入和测试 mock。
/// 制品记录与历史记录使用不同的键，可以独立删除。
use crate::artifact::Artifact;
use crate::editor::HistoryRecord;
use crate::utils::StamperError;

/// 制品存储 trait
///
/// # 职责
/// - 按 id 读写制品记录与历史记录
/// - 不负责解析字段，仅负责持久化
///
/// # 约定
/// - 所有调用同步完成后才返回
/// - 写入被拒绝时返回 `StorageWriteFailed`，且不留下半写入的记录
pub trait ArtifactStore {
    /// 读取制品，不存在时返回 `Ok(None)`
    fn get_artifact(&self, id: &str) -> Result<Option<Artifact>, StamperError>;

    /// 写入（新建或覆盖）制品记录
    fn put_artifact(&mut self, artifact: &Artifact) -> Result<(), StamperError>;

    /// 删除制品记录，返回记录是否存在
    fn delete_artifact(&mut self, id: &str) -> Result<bool, StamperError>;

    /// 列出所有制品
    fn list_artifacts(&self) -> Result<Vec<Artifact>, StamperError>;

    /// 读取制品的历史记录
    fn get_history(&self, artifact_id: &str) -> Result<Option<HistoryRecord>, StamperError>;

    /// 写入历史记录
    fn put_history(&mut self, record: &HistoryRecord) -> Result<(), StamperError>;

    /// 删除历史记录，返回记录是否存在
    fn delete_history(&mut self, artifact_id: &str) -> Result<bool, StamperError>;

    /// 检查制品是否存在
    fn contains_artifact(&self, id: &str) -> Result<bool, StamperError> {
        Ok(self.get_artifact(id)?.is_some())
    }
}

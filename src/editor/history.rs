/// 变更历史模块
///
/// 每个制品一份线性历史，带游标，支持撤销/重做。
/// 历史与制品分开持久化，随制品一起删除。
use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{FieldName, FieldSet, FieldValue};
use crate::utils::StamperError;
use crate::HISTORY_CAPACITY;

/// 变更历史
///
/// # 实现细节
/// - `changes` 按时间顺序保存，`applied` 为已应用的条目数（即 cursor + 1）
/// - 下标 >= `applied` 的条目是重做尾部，记录新变更时被丢弃
/// - 超出容量时淘汰最旧的条目，游标保持指向同一条逻辑记录
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLog {
    artifact_id: String,
    changes: VecDeque<ChangeRecord>,
    applied: usize,
    capacity: usize,
}

/// 单次已提交的字段修改
///
/// 同时保存修改前的完整字段快照，撤销时直接恢复快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub timestamp: DateTime<Utc>,
    pub change_type: FieldName,
    pub change_data: ChangeData,
    pub previous_field_set: FieldSet,
}

/// 修改前后的值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeData {
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

/// 历史摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub total_changes: usize,
    pub current_position: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// 历史的持久化记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub artifact_id: String,
    pub changes: Vec<ChangeRecord>,
    /// -1 表示没有已应用的变更
    pub cursor: i64,
    pub capacity: usize,
}

impl HistoryRecord {
    /// 空历史记录
    pub fn empty(artifact_id: impl Into<String>) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            changes: Vec::new(),
            cursor: -1,
            capacity: HISTORY_CAPACITY,
        }
    }
}

impl ChangeRecord {
    pub fn new(change_type: FieldName, change_data: ChangeData, previous_field_set: FieldSet) -> Self {
        Self {
            timestamp: Utc::now(),
            change_type,
            change_data,
            previous_field_set,
        }
    }

    /// 在给定字段集上重放这次修改（只写入 `change_type` 对应的字段）
    pub fn replay_onto(&self, fields: &mut FieldSet) -> Result<(), StamperError> {
        fields.set(self.change_type, self.change_data.new_value.clone())
    }
}

impl HistoryLog {
    /// 创建默认容量的空历史
    pub fn new(artifact_id: impl Into<String>) -> Self {
        Self::with_capacity(artifact_id, HISTORY_CAPACITY)
    }

    /// 创建指定容量的空历史（容量至少为 1）
    pub fn with_capacity(artifact_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            changes: VecDeque::new(),
            applied: 0,
            capacity: capacity.max(1),
        }
    }

    /// 从持久化记录恢复
    ///
    /// 游标越界视为记录损坏；条目数超过容量时淘汰最旧的条目
    pub fn from_record(record: HistoryRecord) -> Result<Self, StamperError> {
        let len = record.changes.len() as i64;
        if record.cursor < -1 || record.cursor > len - 1 {
            return Err(StamperError::CorruptRecord(format!(
                "history cursor {} out of range for {} changes of {}",
                record.cursor, len, record.artifact_id
            )));
        }

        let mut log = Self {
            artifact_id: record.artifact_id,
            changes: record.changes.into(),
            applied: (record.cursor + 1) as usize,
            capacity: record.capacity.max(1),
        };

        if log.changes.len() > log.capacity {
            log::warn!(
                "history of {} holds {} changes, trimming to capacity {}",
                log.artifact_id,
                log.changes.len(),
                log.capacity
            );
            while log.changes.len() > log.capacity {
                log.evict_oldest();
            }
        }

        Ok(log)
    }

    /// 转为持久化记录
    pub fn to_record(&self) -> HistoryRecord {
        HistoryRecord {
            artifact_id: self.artifact_id.clone(),
            changes: self.changes.iter().cloned().collect(),
            cursor: self.cursor() as i64,
            capacity: self.capacity,
        }
    }

    /// 记录一次新变更
    ///
    /// # 行为
    /// - 丢弃游标之后的重做尾部（不可恢复）
    /// - 追加新条目，游标指向它
    /// - 超出容量时淘汰最旧的条目
    pub fn record_change(
        &mut self,
        change_type: FieldName,
        change_data: ChangeData,
        previous_field_set: FieldSet,
    ) -> &ChangeRecord {
        if self.applied < self.changes.len() {
            log::debug!(
                "discarding {} redo entries of {}",
                self.changes.len() - self.applied,
                self.artifact_id
            );
            self.changes.truncate(self.applied);
        }

        self.changes
            .push_back(ChangeRecord::new(change_type, change_data, previous_field_set));
        self.applied = self.changes.len();

        if self.changes.len() > self.capacity {
            self.evict_oldest();
        }

        &self.changes[self.applied - 1]
    }

    /// 撤销：返回游标处的条目，游标后退一位
    ///
    /// 调用方应把字段集恢复为 `previous_field_set`
    pub fn undo(&mut self) -> Result<&ChangeRecord, StamperError> {
        if self.applied == 0 {
            return Err(StamperError::NothingToUndo);
        }
        self.applied -= 1;
        log::debug!("undo {}: cursor -> {}", self.artifact_id, self.cursor());
        Ok(&self.changes[self.applied])
    }

    /// 重做：游标前进一位，返回新游标处的条目
    ///
    /// 调用方应在当前字段集上重放 `change_data.new_value`
    pub fn redo(&mut self) -> Result<&ChangeRecord, StamperError> {
        if self.applied == self.changes.len() {
            return Err(StamperError::NothingToRedo);
        }
        self.applied += 1;
        log::debug!("redo {}: cursor -> {}", self.artifact_id, self.cursor());
        Ok(&self.changes[self.applied - 1])
    }

    fn evict_oldest(&mut self) {
        self.changes.pop_front();
        self.applied = self.applied.saturating_sub(1);
    }

    /// 生成摘要
    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            total_changes: self.changes.len(),
            current_position: self.applied,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// 最后一次已应用变更的下标，-1 表示没有
    pub fn cursor(&self) -> isize {
        self.applied as isize - 1
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 条目总数（包括重做尾部）
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.changes.len()
    }

    /// 按时间顺序遍历所有条目
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.changes.iter()
    }
}

impl fmt::Display for HistorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} change{}, position {}, can undo: {}, can redo: {}",
            self.total_changes,
            if self.total_changes == 1 { "" } else { "s" },
            self.current_position,
            self.can_undo,
            self.can_redo
        )
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} -> {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.change_type,
            self.change_data.old_value,
            self.change_data.new_value
        )
    }
}

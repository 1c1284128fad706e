/// 编辑器层模块
///
/// 该模块提供有状态的编辑接口，支持变更追踪、撤销/重做。
/// 遵循"修改-保存分离"原则，字段修改只改内存状态与历史，字节写回需要显式保存。
///
/// # 架构设计
///
/// - **history**: 变更历史，带游标与容量上限
/// - **patch**: 补丁应用器，把字段集写回存储中的字节
/// - **session**: 编辑会话，管理当前打开制品的字段集
/// - **command**: 文本形式的编辑命令
///
/// # 使用示例
///
/// ```rust,ignore
/// use kernel_stamper::{EditSession, FieldName};
///
/// let mut session = EditSession::open(&store, &id)?;
/// session.set_field(&mut store, FieldName::BorderColor, 2u8)?;
/// println!("{}", session.summary());
/// session.save(&mut store)?;
/// ```
pub mod command;
pub mod history;
pub mod patch;
pub mod session;

// === 导出公共接口 ===
pub use command::EditCommand;
pub use history::{ChangeData, ChangeRecord, HistoryLog, HistoryRecord, HistorySummary};
pub use patch::PatchApplier;
pub use session::EditSession;

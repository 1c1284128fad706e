pub mod artifact;
pub mod codec;
pub mod editor;
pub mod io;
pub mod library;
pub mod palette;
pub mod utils;

// 重新导出主要结构
pub use artifact::{Artifact, ArtifactMetadata};
pub use codec::{decode, encode, FieldName, FieldSet, FieldValue};
pub use editor::{
    ChangeData, ChangeRecord, EditCommand, EditSession, HistoryLog, HistoryRecord,
    HistorySummary, PatchApplier,
};
pub use library::{ImportOutcome, RomLibrary};
pub use utils::{validate_rom_file, StamperError};

// 常量定义
pub const SUPPORTED_EXTENSIONS: &[&str] = &["bin", "rom"];

/// 可导入 ROM 的最小字节数
pub const MIN_ROM_SIZE: usize = 4096;

/// 可导入 ROM 的最大字节数
pub const MAX_ROM_SIZE: usize = 65536;

/// C64 kernal ROM 的典型大小（8KB）
pub const TYPICAL_ROM_SIZE: usize = 8192;

/// 每个制品保留的历史条目上限
pub const HISTORY_CAPACITY: usize = 50;

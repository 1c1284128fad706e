use std::path::Path;
use thiserror::Error;

use crate::{MAX_ROM_SIZE, MIN_ROM_SIZE, SUPPORTED_EXTENSIONS, TYPICAL_ROM_SIZE};

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum StamperError {
    #[error("Malformed artifact: {len} bytes, at least {} required", crate::codec::MIN_ARTIFACT_LEN)]
    MalformedArtifact { len: usize },

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Storage write failed: {0}")]
    StorageWriteFailed(String),

    #[error("Value type does not match field {field}")]
    FieldTypeMismatch { field: String },

    #[error("Invalid ROM upload: {}", .0.join("; "))]
    InvalidUpload(Vec<String>),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Unknown edit command: {0}")]
    UnknownCommand(String),

    #[error("No artifact is open")]
    NoOpenSession,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// 校验待导入的 ROM 文件
///
/// 扩展名与大小的所有问题会合并为一个 `InvalidUpload` 错误返回；
/// 大小合法但不是典型的 8KB 时，作为警告返回。
pub fn validate_rom_file(name: &str, size: usize) -> Result<Vec<String>, StamperError> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    if !SUPPORTED_EXTENSIONS.iter().any(|&ext| Some(ext) == extension.as_deref()) {
        errors.push(format!(
            "Invalid file type. Please upload a ROM file with extension: {}",
            SUPPORTED_EXTENSIONS
                .iter()
                .map(|ext| format!(".{}", ext))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    if size < MIN_ROM_SIZE {
        errors.push(format!(
            "File is too small ({} bytes). ROM files should be at least {} bytes.",
            size, MIN_ROM_SIZE
        ));
    } else if size > MAX_ROM_SIZE {
        errors.push(format!(
            "File is too large ({} bytes). ROM files should not exceed {} bytes.",
            size, MAX_ROM_SIZE
        ));
    } else if size != TYPICAL_ROM_SIZE {
        warnings.push(format!(
            "File size is {} bytes. Typical C64 ROM size is {} bytes (8KB).",
            size, TYPICAL_ROM_SIZE
        ));
    }

    if !errors.is_empty() {
        return Err(StamperError::InvalidUpload(errors));
    }

    Ok(warnings)
}

/// ROM 库模块
///
/// 应用层控制器：持有存储与唯一的编辑会话，负责导入、导出、删除等
/// 跨制品的操作。会话作为显式对象由库持有，不存在全局状态。
use std::path::Path;

use chrono::Utc;

use crate::artifact::Artifact;
use crate::codec::{FieldName, FieldSet, FieldValue};
use crate::editor::{EditCommand, EditSession, HistoryLog, HistoryRecord};
use crate::io::ArtifactStore;
use crate::utils::{validate_rom_file, StamperError};

/// 导入结果
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub artifact: Artifact,
    /// 非致命的校验提示（例如大小不是 8KB）
    pub warnings: Vec<String>,
}

/// ROM 库
///
/// # 使用示例
///
/// ```rust,ignore
/// use kernel_stamper::{RomLibrary, FieldName};
/// use kernel_stamper::io::DirStore;
///
/// let mut library = RomLibrary::new(DirStore::open(".kernel-stamper")?);
/// let outcome = library.import("kernal.bin", std::fs::read("kernal.bin")?)?;
/// library.set_field(FieldName::Line1, "HELLO WORLD")?;
/// library.save()?;
/// ```
#[derive(Debug)]
pub struct RomLibrary<S: ArtifactStore> {
    store: S,
    session: Option<EditSession>,
}

impl<S: ArtifactStore> RomLibrary<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            session: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// 当前打开的会话
    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// 导入新的 ROM：校验、持久化、创建空历史，然后打开它
    pub fn import(&mut self, name: &str, bytes: Vec<u8>) -> Result<ImportOutcome, StamperError> {
        let warnings = validate_rom_file(name, bytes.len())?;
        for warning in &warnings {
            log::warn!("{}: {}", name, warning);
        }

        let id = self.next_id()?;
        let artifact = Artifact::new(id, name, bytes);
        self.store.put_artifact(&artifact)?;
        if let Err(e) = self.store.put_history(&HistoryRecord::empty(&artifact.id)) {
            // 历史写入失败时撤回制品，避免留下半个导入
            self.store.delete_artifact(&artifact.id)?;
            return Err(e);
        }

        log::info!("imported {} as {} ({} bytes)", artifact.name, artifact.id, artifact.size);
        self.open(&artifact.id)?;

        Ok(ImportOutcome { artifact, warnings })
    }

    /// 打开制品，替换之前的会话
    ///
    /// 打开失败时之前的会话保持不变
    pub fn open(&mut self, id: &str) -> Result<&EditSession, StamperError> {
        let session = EditSession::open(&self.store, id)?;
        if let Some(previous) = self.session.take() {
            previous.close();
        }
        let session = self.session.insert(session);
        Ok(&*session)
    }

    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }

    pub fn set_field(
        &mut self,
        name: FieldName,
        value: impl Into<FieldValue>,
    ) -> Result<bool, StamperError> {
        let session = self.session.as_mut().ok_or(StamperError::NoOpenSession)?;
        session.set_field(&mut self.store, name, value)
    }

    /// 执行一条文本编辑命令
    pub fn apply(&mut self, command: &EditCommand) -> Result<bool, StamperError> {
        let session = self.session.as_mut().ok_or(StamperError::NoOpenSession)?;
        command.apply(session, &mut self.store)
    }

    pub fn undo(&mut self) -> Result<&FieldSet, StamperError> {
        let session = self.session.as_mut().ok_or(StamperError::NoOpenSession)?;
        session.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> Result<&FieldSet, StamperError> {
        let session = self.session.as_mut().ok_or(StamperError::NoOpenSession)?;
        session.redo(&mut self.store)
    }

    /// 保存当前会话
    pub fn save(&mut self) -> Result<Artifact, StamperError> {
        let session = self.session.as_ref().ok_or(StamperError::NoOpenSession)?;
        session.save(&mut self.store)
    }

    /// 导出制品的原始字节
    ///
    /// 如果导出的是当前会话的制品，先保存以写入待定的修改
    pub fn export(&mut self, id: &str) -> Result<Vec<u8>, StamperError> {
        if self.is_open(id) {
            self.save()?;
        }
        Ok(self.get(id)?.payload)
    }

    /// 删除制品及其历史；若它是当前会话的制品，同时关闭会话
    pub fn delete(&mut self, id: &str) -> Result<(), StamperError> {
        let existed = self.store.delete_artifact(id)?;
        self.store.delete_history(id)?;
        if self.is_open(id) {
            self.close();
        }

        if !existed {
            return Err(StamperError::ArtifactNotFound(id.to_string()));
        }
        log::info!("deleted {}", id);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Artifact, StamperError> {
        self.store
            .get_artifact(id)?
            .ok_or_else(|| StamperError::ArtifactNotFound(id.to_string()))
    }

    /// 按导入时间列出所有制品
    pub fn list(&self) -> Result<Vec<Artifact>, StamperError> {
        let mut artifacts = self.store.list_artifacts()?;
        artifacts.sort_by(|a, b| {
            a.upload_date
                .cmp(&b.upload_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(artifacts)
    }

    /// 读取制品的历史（会话打开时返回会话中的历史）
    pub fn history(&self, id: &str) -> Result<HistoryLog, StamperError> {
        if let Some(session) = self.session.as_ref().filter(|s| s.artifact_id() == id) {
            return Ok(session.history().clone());
        }
        if !self.store.contains_artifact(id)? {
            return Err(StamperError::ArtifactNotFound(id.to_string()));
        }
        match self.store.get_history(id)? {
            Some(record) => HistoryLog::from_record(record),
            None => Ok(HistoryLog::new(id)),
        }
    }

    /// 重命名制品，不改动字节与历史
    pub fn rename(&mut self, id: &str, name: &str) -> Result<Artifact, StamperError> {
        let mut artifact = self.get(id)?;
        artifact.name = name.to_string();
        self.store.put_artifact(&artifact)?;
        Ok(artifact)
    }

    /// 复制制品（存储中的字节，不含会话中未保存的修改）
    ///
    /// 副本的 `parent_id` 指向源制品，历史为空
    pub fn duplicate(&mut self, id: &str, name: Option<&str>) -> Result<Artifact, StamperError> {
        let source = self.get(id)?;
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| copy_name(&source.name));

        let copy = source.derive_copy(self.next_id()?, name);
        self.store.put_artifact(&copy)?;
        if let Err(e) = self.store.put_history(&HistoryRecord::empty(&copy.id)) {
            self.store.delete_artifact(&copy.id)?;
            return Err(e);
        }

        log::info!("duplicated {} as {}", source.id, copy.id);
        Ok(copy)
    }

    fn is_open(&self, id: &str) -> bool {
        self.session
            .as_ref()
            .map(|s| s.artifact_id() == id)
            .unwrap_or(false)
    }

    /// 以毫秒时间戳作为 id，冲突时递增
    fn next_id(&self) -> Result<String, StamperError> {
        let mut candidate = Utc::now().timestamp_millis();
        while self.store.contains_artifact(&candidate.to_string())? {
            candidate += 1;
        }
        Ok(candidate.to_string())
    }
}

/// `kernal.bin` -> `kernal-copy.bin`
fn copy_name(name: &str) -> String {
    let path = Path::new(name);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) {
        (Some(stem), Some(ext)) => format!("{}-copy.{}", stem, ext),
        _ => format!("{}-copy", name),
    }
}

/// ROM 制品及其持久化格式
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一个已存储的 ROM 镜像
///
/// 字节内容只由 `PatchApplier::save` 修改，且只改动五个字段区间。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub name: String,
    /// 原始字节，持久化为 base64 数据 URL
    #[serde(with = "data_url")]
    pub payload: Vec<u8>,
    pub size: usize,
    pub upload_date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub metadata: ArtifactMetadata,
}

/// 制品元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    /// 已保存的次数
    pub change_count: u32,
    /// 是否为直接导入（而非复制得到）
    pub is_original: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Default for ArtifactMetadata {
    fn default() -> Self {
        Self {
            change_count: 0,
            is_original: true,
            parent_id: None,
        }
    }
}

impl Artifact {
    /// 创建新导入的制品
    pub fn new(id: impl Into<String>, name: impl Into<String>, payload: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            size: payload.len(),
            payload,
            upload_date: now,
            last_modified: now,
            metadata: ArtifactMetadata::default(),
        }
    }

    /// 以新的字节内容生成一次保存后的制品
    ///
    /// 更新 `last_modified`，`change_count` 加一
    pub fn with_saved_payload(&self, payload: Vec<u8>) -> Self {
        let mut saved = self.clone();
        saved.size = payload.len();
        saved.payload = payload;
        saved.last_modified = Utc::now();
        saved.metadata.change_count += 1;
        saved
    }

    /// 生成一份派生副本，元数据指向源制品
    pub fn derive_copy(&self, id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut copy = Artifact::new(id, name, self.payload.clone());
        copy.metadata = ArtifactMetadata {
            change_count: 0,
            is_original: false,
            parent_id: Some(self.id.clone()),
        };
        copy
    }
}

/// `data:<mime>;base64,<data>` 格式的字节序列化
mod data_url {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const PREFIX: &str = "data:application/octet-stream;base64,";

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}{}", PREFIX, STANDARD.encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;

        // 任意 MIME 类型都接受，只要求 base64 编码
        let (header, data) = text
            .split_once(',')
            .ok_or_else(|| D::Error::custom("payload is not a data URL"))?;
        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(D::Error::custom(format!(
                "unsupported payload encoding: {}",
                header
            )));
        }

        STANDARD.decode(data).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_artifact() {
        let artifact = Artifact::new("1", "kernal.bin", vec![0u8; 8192]);
        assert_eq!(artifact.size, 8192);
        assert_eq!(artifact.upload_date, artifact.last_modified);
        assert_eq!(artifact.metadata, ArtifactMetadata::default());
        assert!(artifact.metadata.is_original);
    }

    #[test]
    fn test_saved_payload_bumps_metadata() {
        let artifact = Artifact::new("1", "kernal.bin", vec![0u8; 8192]);
        let saved = artifact.with_saved_payload(vec![1u8; 8192]);
        assert_eq!(saved.metadata.change_count, 1);
        assert!(saved.last_modified >= artifact.last_modified);
        assert_eq!(saved.upload_date, artifact.upload_date);
        assert_eq!(saved.payload[0], 1);
    }

    #[test]
    fn test_derive_copy() {
        let artifact = Artifact::new("1", "kernal.bin", vec![7u8; 4096]);
        let copy = artifact.derive_copy("2", "kernal copy.bin");
        assert_eq!(copy.payload, artifact.payload);
        assert_eq!(copy.metadata.parent_id.as_deref(), Some("1"));
        assert!(!copy.metadata.is_original);
    }

    #[test]
    fn test_record_json_format() {
        let artifact = Artifact::new("42", "kernal.rom", vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let json = serde_json::to_value(&artifact).unwrap();

        assert_eq!(json["payload"], "data:application/octet-stream;base64,3q2+7w==");
        assert_eq!(json["metadata"]["changeCount"], 0);
        assert_eq!(json["metadata"]["isOriginal"], true);
        assert!(json["metadata"].get("parentId").is_none());
        assert!(json.get("uploadDate").is_some());

        let parsed: Artifact = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, artifact);
    }

    #[test]
    fn test_record_without_metadata() {
        // 旧记录没有 metadata 字段
        let json = r#"{
            "id": "1700000000000",
            "name": "kernal.bin",
            "payload": "data:application/macbinary;base64,AAEC",
            "size": 3,
            "uploadDate": "2024-01-01T00:00:00Z",
            "lastModified": "2024-01-01T00:00:00Z"
        }"#;
        let artifact: Artifact = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.payload, vec![0, 1, 2]);
        assert_eq!(artifact.metadata.change_count, 0);
    }

    #[test]
    fn test_rejects_non_base64_payload() {
        let json = r#"{
            "id": "1", "name": "a.bin", "payload": "data:text/plain,hello", "size": 5,
            "uploadDate": "2024-01-01T00:00:00Z", "lastModified": "2024-01-01T00:00:00Z"
        }"#;
        assert!(serde_json::from_str::<Artifact>(json).is_err());
    }
}

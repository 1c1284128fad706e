/// 字段编解码模块
///
/// 在 ROM 原始字节与 `FieldSet` 之间做固定偏移的解码/编码。
/// 编码只覆写五个字段的字节区间，其余字节原样保留。
///
/// | 字段 | 偏移区间 | 宽度 |
/// |---|---|---|
/// | line1 | [1141, 1178) | 37 |
/// | line2 | [1178, 1195) | 17 |
/// | textColor | [1333, 1334) | 1 |
/// | borderColor | [3289, 3290) | 1 |
/// | backgroundColor | [3290, 3291) | 1 |
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::StamperError;

pub const LINE1_RANGE: Range<usize> = 1141..1178;
pub const LINE2_RANGE: Range<usize> = 1178..1195;
pub const TEXT_COLOR_RANGE: Range<usize> = 1333..1334;
pub const BORDER_COLOR_RANGE: Range<usize> = 3289..3290;
pub const BACKGROUND_COLOR_RANGE: Range<usize> = 3290..3291;

/// 可解码的最小缓冲区长度（最高字段的结束偏移）
pub const MIN_ARTIFACT_LEN: usize = 3291;

/// 文本字段的填充字符
const PAD_BYTE: u8 = b' ';

/// 字段名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    Line1,
    Line2,
    BorderColor,
    BackgroundColor,
    TextColor,
}

impl FieldName {
    pub const ALL: [FieldName; 5] = [
        FieldName::Line1,
        FieldName::Line2,
        FieldName::BorderColor,
        FieldName::BackgroundColor,
        FieldName::TextColor,
    ];

    /// 字段在 ROM 中的字节区间
    pub fn byte_range(&self) -> Range<usize> {
        match self {
            FieldName::Line1 => LINE1_RANGE,
            FieldName::Line2 => LINE2_RANGE,
            FieldName::BorderColor => BORDER_COLOR_RANGE,
            FieldName::BackgroundColor => BACKGROUND_COLOR_RANGE,
            FieldName::TextColor => TEXT_COLOR_RANGE,
        }
    }

    pub fn width(&self) -> usize {
        self.byte_range().len()
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FieldName::Line1 | FieldName::Line2)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Line1 => "line1",
            FieldName::Line2 => "line2",
            FieldName::BorderColor => "borderColor",
            FieldName::BackgroundColor => "backgroundColor",
            FieldName::TextColor => "textColor",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = StamperError;

    /// 接受持久化名称（`borderColor`）以及命令行简写（`border`）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "line1" => Ok(FieldName::Line1),
            "line2" => Ok(FieldName::Line2),
            "border" | "bordercolor" => Ok(FieldName::BorderColor),
            "background" | "backgroundcolor" => Ok(FieldName::BackgroundColor),
            "text" | "textcolor" => Ok(FieldName::TextColor),
            _ => Err(StamperError::UnknownCommand(s.to_string())),
        }
    }
}

/// 单个字段的值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Color(u8),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        FieldValue::Color(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => write!(f, "\"{}\"", text),
            FieldValue::Color(index) => write!(f, "{}", index),
        }
    }
}

/// 解码后的语义字段集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSet {
    pub line1: String,
    pub line2: String,
    pub border_color: u8,
    pub background_color: u8,
    pub text_color: u8,
}

impl Default for FieldSet {
    /// 空文本 + 原版开机画面配色（浅蓝边框、蓝色背景、浅蓝文字）
    fn default() -> Self {
        Self {
            line1: String::new(),
            line2: String::new(),
            border_color: 14,
            background_color: 6,
            text_color: 14,
        }
    }
}

impl FieldSet {
    /// 读取单个字段
    pub fn get(&self, name: FieldName) -> FieldValue {
        match name {
            FieldName::Line1 => FieldValue::Text(self.line1.clone()),
            FieldName::Line2 => FieldValue::Text(self.line2.clone()),
            FieldName::BorderColor => FieldValue::Color(self.border_color),
            FieldName::BackgroundColor => FieldValue::Color(self.background_color),
            FieldName::TextColor => FieldValue::Color(self.text_color),
        }
    }

    /// 写入单个字段
    ///
    /// 值的类型必须与字段匹配，否则返回 `FieldTypeMismatch` 且不做任何修改
    pub fn set(&mut self, name: FieldName, value: FieldValue) -> Result<(), StamperError> {
        match (name, value) {
            (FieldName::Line1, FieldValue::Text(text)) => self.line1 = text,
            (FieldName::Line2, FieldValue::Text(text)) => self.line2 = text,
            (FieldName::BorderColor, FieldValue::Color(index)) => self.border_color = index,
            (FieldName::BackgroundColor, FieldValue::Color(index)) => self.background_color = index,
            (FieldName::TextColor, FieldValue::Color(index)) => self.text_color = index,
            (name, _) => {
                return Err(StamperError::FieldTypeMismatch {
                    field: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

/// 从 ROM 缓冲区解码字段
///
/// 文本逐字节取出（Latin-1，一字节对应一个字符，不裁剪填充），
/// 颜色取原始字节值，不做范围检查。
pub fn decode(buffer: &[u8]) -> Result<FieldSet, StamperError> {
    ensure_len(buffer)?;

    let fields = FieldSet {
        line1: decode_text(&buffer[LINE1_RANGE]),
        line2: decode_text(&buffer[LINE2_RANGE]),
        border_color: buffer[BORDER_COLOR_RANGE.start],
        background_color: buffer[BACKGROUND_COLOR_RANGE.start],
        text_color: buffer[TEXT_COLOR_RANGE.start],
    };

    log::debug!(
        "decoded fields: line1=[{}] line2=[{}] border={} background={} text={}",
        fields.line1,
        fields.line2,
        fields.border_color,
        fields.background_color,
        fields.text_color
    );

    Ok(fields)
}

/// 将字段编码回 ROM 缓冲区，返回新的缓冲区
///
/// 超长文本被截断，短文本用空格补齐；颜色值原样写入。
/// 五个字段区间以外的字节与输入完全一致。
pub fn encode(buffer: &[u8], fields: &FieldSet) -> Result<Vec<u8>, StamperError> {
    ensure_len(buffer)?;

    let mut output = buffer.to_vec();
    output[LINE1_RANGE].copy_from_slice(&encode_text(&fields.line1, LINE1_RANGE.len()));
    output[LINE2_RANGE].copy_from_slice(&encode_text(&fields.line2, LINE2_RANGE.len()));
    output[BORDER_COLOR_RANGE.start] = fields.border_color;
    output[BACKGROUND_COLOR_RANGE.start] = fields.background_color;
    output[TEXT_COLOR_RANGE.start] = fields.text_color;

    Ok(output)
}

fn ensure_len(buffer: &[u8]) -> Result<(), StamperError> {
    if buffer.len() < MIN_ARTIFACT_LEN {
        return Err(StamperError::MalformedArtifact { len: buffer.len() });
    }
    Ok(())
}

fn decode_text(bytes: &[u8]) -> String {
    encoding_rs::mem::decode_latin1(bytes).into_owned()
}

/// 文本转为定宽字节：截断或补空格
///
/// 超出 Latin-1 的字符写为 `?`
fn encode_text(text: &str, width: usize) -> Vec<u8> {
    let bytes: Cow<[u8]> = if encoding_rs::mem::is_str_latin1(text) {
        encoding_rs::mem::encode_latin1_lossy(text)
    } else {
        Cow::Owned(
            text.chars()
                .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
                .collect(),
        )
    };

    let mut field = vec![PAD_BYTE; width];
    let len = bytes.len().min(width);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

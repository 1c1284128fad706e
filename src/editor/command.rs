/// 文本形式的编辑命令
///
/// 格式：`line1=TEXT`、`line2=TEXT`、`border=N`、`background=N`、`text=N`、`undo`、`redo`
use std::fmt;
use std::str::FromStr;

use crate::codec::{FieldName, FieldValue};
use crate::io::ArtifactStore;
use crate::utils::StamperError;

use super::session::EditSession;

/// 调色板大小，命令行输入的颜色必须小于该值
const PALETTE_SIZE: u8 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    Set(FieldName, FieldValue),
    Undo,
    Redo,
}

impl EditCommand {
    /// 在会话上执行命令
    ///
    /// # 返回
    /// 字段集发生变化返回 true
    pub fn apply(
        &self,
        session: &mut EditSession,
        store: &mut dyn ArtifactStore,
    ) -> Result<bool, StamperError> {
        match self {
            EditCommand::Set(name, value) => session.set_field(store, *name, value.clone()),
            EditCommand::Undo => session.undo(store).map(|_| true),
            EditCommand::Redo => session.redo(store).map(|_| true),
        }
    }
}

impl FromStr for EditCommand {
    type Err = StamperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "undo" => return Ok(EditCommand::Undo),
            "redo" => return Ok(EditCommand::Redo),
            _ => {}
        }

        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| StamperError::UnknownCommand(s.to_string()))?;
        let name: FieldName = name
            .trim()
            .parse()
            .map_err(|_| StamperError::UnknownCommand(s.to_string()))?;

        // 文本值保留原样（包括首尾空格）
        if name.is_text() {
            return Ok(EditCommand::Set(name, FieldValue::Text(value.to_string())));
        }

        match value.trim().parse::<u8>() {
            Ok(index) if index < PALETTE_SIZE => Ok(EditCommand::Set(name, FieldValue::Color(index))),
            _ => Err(StamperError::UnknownCommand(format!(
                "{} (colour must be 0-{})",
                s,
                PALETTE_SIZE - 1
            ))),
        }
    }
}

impl fmt::Display for EditCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditCommand::Set(name, value) => write!(f, "{} = {}", name, value),
            EditCommand::Undo => f.write_str("undo"),
            EditCommand::Redo => f.write_str("redo"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::io::MemoryStore;

    #[test]
    fn test_parse_commands() {
        assert_eq!("undo".parse::<EditCommand>().unwrap(), EditCommand::Undo);
        assert_eq!(" REDO ".parse::<EditCommand>().unwrap(), EditCommand::Redo);
        assert_eq!(
            "line1= READY ".parse::<EditCommand>().unwrap(),
            EditCommand::Set(FieldName::Line1, FieldValue::Text(" READY ".to_string()))
        );
        assert_eq!(
            "border=14".parse::<EditCommand>().unwrap(),
            EditCommand::Set(FieldName::BorderColor, FieldValue::Color(14))
        );
        // 文本中可以包含 '='
        assert_eq!(
            "line2=A=B".parse::<EditCommand>().unwrap(),
            EditCommand::Set(FieldName::Line2, FieldValue::Text("A=B".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_commands() {
        assert!("jump".parse::<EditCommand>().is_err());
        assert!("line3=x".parse::<EditCommand>().is_err());
        assert!("border=16".parse::<EditCommand>().is_err());
        assert!("text=blue".parse::<EditCommand>().is_err());
    }

    #[test]
    fn test_apply_commands() {
        let mut store = MemoryStore::new();
        store
            .put_artifact(&Artifact::new("1", "kernal.bin", vec![0u8; 8192]))
            .unwrap();
        let mut session = EditSession::open(&store, "1").unwrap();

        let commands: Vec<EditCommand> = ["text=5", "text=5", "undo", "redo"]
            .iter()
            .map(|c| c.parse().unwrap())
            .collect();
        let changed: Vec<bool> = commands
            .iter()
            .map(|c| c.apply(&mut session, &mut store).unwrap())
            .collect();

        assert_eq!(changed, vec![true, false, true, true]);
        assert_eq!(session.fields().text_color, 5);
    }
}

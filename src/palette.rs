/// C64 调色板与开机画面预览
use crate::codec::FieldSet;

/// 调色板条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub name: &'static str,
    pub hex: &'static str,
}

/// 16 色调色板，下标即字段中保存的颜色值
pub static PALETTE: [PaletteColor; 16] = [
    PaletteColor { name: "black", hex: "000000" },
    PaletteColor { name: "white", hex: "FFFFFF" },
    PaletteColor { name: "red", hex: "880000" },
    PaletteColor { name: "cyan", hex: "AAFFEE" },
    PaletteColor { name: "purple", hex: "CC44CC" },
    PaletteColor { name: "green", hex: "00CC55" },
    PaletteColor { name: "blue", hex: "0000AA" },
    PaletteColor { name: "yellow", hex: "EEEE77" },
    PaletteColor { name: "orange", hex: "DD8855" },
    PaletteColor { name: "brown", hex: "664400" },
    PaletteColor { name: "light red", hex: "FF7777" },
    PaletteColor { name: "dark grey", hex: "333333" },
    PaletteColor { name: "grey", hex: "777777" },
    PaletteColor { name: "light green", hex: "AAFF66" },
    PaletteColor { name: "light blue", hex: "0088FF" },
    PaletteColor { name: "light grey", hex: "BBBBBB" },
];

/// 按下标查找颜色，越界返回 None
pub fn color(index: u8) -> Option<&'static PaletteColor> {
    PALETTE.get(index as usize)
}

/// 颜色的可读描述，例如 `14 (light blue #0088FF)`
pub fn describe(index: u8) -> String {
    match color(index) {
        Some(c) => format!("{} ({} #{})", index, c.name, c.hex),
        None => format!("{} (out of palette)", index),
    }
}

/// 生成开机画面文本
pub fn render_screen(fields: &FieldSet) -> String {
    format!(
        "\r{}{}38911 BASIC BYTES FREE \r\rREADY.\r█",
        fields.line1, fields.line2
    )
}

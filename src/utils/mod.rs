pub mod fountain_constants;
pub mod fdx_constants;

pub use fountain_constants::{FountainConstants, line_regex, title_regex};
pub use fdx_constants::FdxConstants;

/// 检查一行文本是否为空行（只含空白字符）
pub fn is_blank_line(text: &str) -> bool {
    text.trim().is_empty()
}

/// 统一换行符，拆分成行
///
/// `\r\n` 和单独的 `\r` 都视作换行；末尾换行不会产生额外的空行。
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

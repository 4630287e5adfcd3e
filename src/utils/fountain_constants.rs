use std::collections::HashMap;
use lazy_static::lazy_static;
use regex::Regex;

pub struct FountainConstants;

impl FountainConstants {
    /// 分页符
    pub const PAGE_BREAK: &'static str = "===";
    pub const BONEYARD_BEGIN: &'static str = "/*";
    pub const BONEYARD_END: &'static str = "*/";
    pub const NOTE_BEGIN: &'static str = "[[";
    pub const NOTE_END: &'static str = "]]";
    /// 多值标题页条目续行的缩进
    pub const TITLE_INDENT: &'static str = "    ";
}

lazy_static! {
    // 标题页
    pub static ref TITLE_REGEX: HashMap<&'static str, Regex> = {
        let mut map = HashMap::new();
        // 只认常见的标题页字段，其他 `XXX:` 开头的行（比如 FADE IN:）属于正文
        map.insert("key_value", Regex::new(r"^((?i:title|credit|authors?|source|notes|draft date|date|watermark|contact(?: info)?|revision|copyright|tl|tc|tr|cc|br|bl|header|footer))[ \t]*:[ \t]*(.*?)\s*$").unwrap());
        map.insert("continuation", Regex::new(r"^(?:\t| {2,})\s*(\S.*?)\s*$").unwrap());
        map
    };

    // 正文逐行识别
    pub static ref LINE_REGEX: HashMap<&'static str, Regex> = {
        let mut map = HashMap::new();
        map.insert("scene_heading", Regex::new(r"^(?i:int|ext|est|int[.]?/ext|i[.]?/e)[. ]").unwrap());
        map.insert("numbered_scene_heading", Regex::new(r"^(\d+[A-Za-z]?)\.?[ \t]+((?i:int|ext|est|int[.]?/ext|i[.]?/e)[. ].*)$").unwrap());
        map.insert("scene_number", Regex::new(r"\s*#([^#\s][^#]*?)\s*#\s*$").unwrap());
        map.insert("section", Regex::new(r"^(#+)[ \t]*(.*?)\s*$").unwrap());
        map.insert("transition", Regex::new(r"^[\p{Lu}0-9 ]+TO:$").unwrap());
        map.insert("centered", Regex::new(r"^>\s*(.*?)\s*<$").unwrap());
        map.insert("character", Regex::new(r"^((\p{Lu}[^\p{Ll}\r\n@]*)|(@[^\r\n\(（\^]*))(\(.*\)|（.*）)?(\s*\^)?\s*$").unwrap());
        map.insert("character_letters", Regex::new(r"\p{L}").unwrap());
        map.insert("dual_marker", Regex::new(r"\s*\^\s*$").unwrap());
        map.insert("parenthetical", Regex::new(r"^(\(.*\)|（.*）)$").unwrap());
        map.insert("parenthetical_start", Regex::new(r"^(?:\(|（)[^\)）]*$").unwrap());
        map.insert("parenthetical_end", Regex::new(r"(?:\)|）)$").unwrap());
        map.insert("page_break", Regex::new(r"^===$").unwrap());
        map.insert("line_break", Regex::new(r"^ {2,}$").unwrap());
        map
    };
}

/// 取出预编译的正则
pub fn line_regex(name: &str) -> &'static Regex {
    &LINE_REGEX[name]
}

/// 取出预编译的标题页正则
pub fn title_regex(name: &str) -> &'static Regex {
    &TITLE_REGEX[name]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_heading_prefixes() {
        let re = line_regex("scene_heading");
        for line in ["INT. OFFICE - DAY", "EXT. PARK", "int. kitchen", "EST. CITY", "INT./EXT. CAR", "I/E TRAIN"] {
            assert!(re.is_match(line), "{}", line);
        }
        assert!(!re.is_match("INTERIOR DESIGN"));
    }

    #[test]
    fn numbered_scene_heading_splits_label() {
        let caps = line_regex("numbered_scene_heading").captures("12A. INT. HOUSE - DAY").unwrap();
        assert_eq!(&caps[1], "12A");
        assert_eq!(&caps[2], "INT. HOUSE - DAY");
    }

    #[test]
    fn character_cues() {
        let re = line_regex("character");
        assert!(re.is_match("JOHN"));
        assert!(re.is_match("JOHN (V.O.)"));
        assert!(re.is_match("MARY ^"));
        assert!(re.is_match("@McCLANE"));
        assert!(!re.is_match("John"));
    }

    #[test]
    fn page_break_is_exactly_three_equals() {
        let re = line_regex("page_break");
        assert!(re.is_match("==="));
        assert!(!re.is_match("===="));
        assert!(!re.is_match("== ="));
    }

    #[test]
    fn title_key_value() {
        let caps = title_regex("key_value").captures("Draft date: 1/2/2024").unwrap();
        assert_eq!(&caps[1], "Draft date");
        assert_eq!(&caps[2], "1/2/2024");
        assert!(title_regex("key_value").is_match("CONTACT INFO:"));
        assert!(!title_regex("key_value").is_match("FADE IN:"));
        assert!(!title_regex("key_value").is_match("Note: it rains."));
        assert!(title_regex("continuation").is_match("    Jane Doe"));
        assert!(!title_regex("continuation").is_match("Jane Doe"));
    }
}

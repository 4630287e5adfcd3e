use std::collections::HashMap;
use lazy_static::lazy_static;
use crate::models::ElementKind;

pub struct FdxConstants;

impl FdxConstants {
    pub const ROOT: &'static str = "FinalDraft";
    pub const CONTENT: &'static str = "Content";
    pub const TITLE_PAGE: &'static str = "TitlePage";
    pub const PARAGRAPH: &'static str = "Paragraph";
    pub const TEXT: &'static str = "Text";
    pub const SCENE_PROPERTIES: &'static str = "SceneProperties";
    pub const DUAL_DIALOGUE: &'static str = "DualDialogue";
    pub const SECTION_HEADING: &'static str = "Section Heading";
}

lazy_static! {
    // Paragraph Type -> 元素类型；章节标题的层级另外从 Level 属性读取
    pub static ref PARAGRAPH_TYPES: HashMap<&'static str, ElementKind> = {
        let mut map = HashMap::new();
        map.insert("Scene Heading", ElementKind::SceneHeading);
        map.insert("Action", ElementKind::Action);
        map.insert("General", ElementKind::Action);
        map.insert("Character", ElementKind::Character);
        map.insert("Dialogue", ElementKind::Dialogue);
        map.insert("Parenthetical", ElementKind::Parenthetical);
        map.insert("Transition", ElementKind::Transition);
        map.insert("Shot", ElementKind::Shot);
        map.insert("Synopsis", ElementKind::Synopsis);
        map.insert("Comment", ElementKind::Comment);
        map.insert("Lyrics", ElementKind::Lyrics);
        map.insert("Boneyard", ElementKind::Boneyard);
        map.insert("Page Break", ElementKind::PageBreak);
        map.insert("Centered", ElementKind::Centered);
        map
    };
}

/// 根据 Type 和 Level 属性查表，未知类型返回 `None`
pub fn paragraph_kind(type_name: &str, level: Option<&str>) -> Option<ElementKind> {
    let type_name = type_name.trim();
    if type_name == FdxConstants::SECTION_HEADING {
        let depth = level.and_then(|l| l.trim().parse::<usize>().ok()).unwrap_or(1);
        return Some(ElementKind::section(depth));
    }
    PARAGRAPH_TYPES.get(type_name).copied()
}

/// 元素类型反查 Type 属性
pub fn paragraph_type(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::SceneHeading => "Scene Heading",
        ElementKind::Action | ElementKind::Centered => "Action",
        ElementKind::Character => "Character",
        ElementKind::Dialogue => "Dialogue",
        ElementKind::Parenthetical => "Parenthetical",
        ElementKind::Transition => "Transition",
        ElementKind::Shot => "Shot",
        ElementKind::Section { .. } => FdxConstants::SECTION_HEADING,
        ElementKind::Synopsis => "Synopsis",
        ElementKind::Comment => "Comment",
        ElementKind::Boneyard => "Boneyard",
        ElementKind::Lyrics => "Lyrics",
        ElementKind::PageBreak => "Page Break",
        ElementKind::TitlePageKey | ElementKind::TitlePageValue => "General",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_reverse_agree() {
        for kind in [
            ElementKind::SceneHeading,
            ElementKind::Character,
            ElementKind::Dialogue,
            ElementKind::Parenthetical,
            ElementKind::Transition,
            ElementKind::Shot,
            ElementKind::Synopsis,
            ElementKind::Comment,
            ElementKind::Lyrics,
            ElementKind::Boneyard,
            ElementKind::PageBreak,
            ElementKind::section(4),
        ] {
            let level = kind.section_depth().map(|d| d.to_string());
            assert_eq!(paragraph_kind(paragraph_type(kind), level.as_deref()), Some(kind));
        }
    }

    #[test]
    fn general_maps_to_action_and_unknown_is_none() {
        assert_eq!(paragraph_kind("General", None), Some(ElementKind::Action));
        assert_eq!(paragraph_kind("Cast List", None), None);
        assert_eq!(paragraph_kind("Section Heading", Some("x")), Some(ElementKind::section(1)));
    }
}

use std::fmt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 元素类型
///
/// 章节标题带层级（1-6），不拆成多个类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    SceneHeading,
    Action,
    Character,
    Dialogue,
    Parenthetical,
    Transition,
    Section { depth: u8 },
    Synopsis,
    Comment,
    Boneyard,
    Lyrics,
    PageBreak,
    TitlePageKey,
    TitlePageValue,
    /// 居中文本 `> text <`
    Centered,
    /// 镜头（仅 FDX 有）
    Shot,
}

impl ElementKind {
    /// 章节标题层级上限
    pub const MAX_SECTION_DEPTH: u8 = 6;

    /// 创建章节标题类型，层级被限制在 1-6
    pub fn section(depth: usize) -> Self {
        let depth = depth.clamp(1, Self::MAX_SECTION_DEPTH as usize) as u8;
        ElementKind::Section { depth }
    }

    /// 是否为章节标题
    pub fn section_depth(&self) -> Option<u8> {
        match self {
            ElementKind::Section { depth } => Some(*depth),
            _ => None,
        }
    }

    /// 是否属于对白块（角色、括号、对白）
    pub fn is_dialogue_part(&self) -> bool {
        matches!(
            self,
            ElementKind::Character | ElementKind::Dialogue | ElementKind::Parenthetical
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::SceneHeading => "scene_heading",
            ElementKind::Action => "action",
            ElementKind::Character => "character",
            ElementKind::Dialogue => "dialogue",
            ElementKind::Parenthetical => "parenthetical",
            ElementKind::Transition => "transition",
            ElementKind::Section { .. } => "section",
            ElementKind::Synopsis => "synopsis",
            ElementKind::Comment => "comment",
            ElementKind::Boneyard => "boneyard",
            ElementKind::Lyrics => "lyrics",
            ElementKind::PageBreak => "page_break",
            ElementKind::TitlePageKey => "title_page_key",
            ElementKind::TitlePageValue => "title_page_value",
            ElementKind::Centered => "centered",
            ElementKind::Shot => "shot",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Section { depth } => write!(f, "section({})", depth),
            other => f.write_str(other.as_str()),
        }
    }
}

/// 排序键 `(chapter_index, position_index)`
///
/// 按字段顺序比较，先比章再比章内位置。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderKey {
    pub chapter_index: u32,
    pub position_index: u64,
}

impl OrderKey {
    pub fn new(chapter_index: u32, position_index: u64) -> Self {
        OrderKey { chapter_index, position_index }
    }
}

/// 剧本元素
///
/// 解析器产出后即不可变；修改只能通过消费式的 `with_*` 方法得到新元素，
/// 排序键只能通过 [`Element::with_order`] 整体替换。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    id: Uuid,
    kind: ElementKind,
    text: String,
    scene_number: Option<String>,
    dual_dialogue: bool,
    #[serde(flatten)]
    order: OrderKey,
}

impl Element {
    pub fn new(kind: ElementKind, text: impl Into<String>) -> Self {
        Element {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            scene_number: None,
            dual_dialogue: false,
            order: OrderKey::default(),
        }
    }

    pub fn with_scene_number(mut self, number: Option<String>) -> Self {
        self.scene_number = number.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_dual_dialogue(mut self, dual: bool) -> Self {
        self.dual_dialogue = dual;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// 重新盖章：章序号和章内位置总是一起替换
    pub fn with_order(mut self, order: OrderKey) -> Self {
        self.order = order;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn scene_number(&self) -> Option<&str> {
        self.scene_number.as_deref()
    }

    pub fn is_dual_dialogue(&self) -> bool {
        self.dual_dialogue
    }

    pub fn order(&self) -> OrderKey {
        self.order
    }

    pub fn chapter_index(&self) -> u32 {
        self.order.chapter_index
    }

    pub fn position_index(&self) -> u64 {
        self.order.position_index
    }

    /// 是否为开启新章的二级章节标题
    pub fn is_chapter_boundary(&self) -> bool {
        self.kind.section_depth() == Some(2)
    }

    /// 内容比较：类型、文本、场景编号（不含 id 和排序键）
    pub fn same_content(&self, other: &Element) -> bool {
        self.kind == other.kind && self.text == other.text && self.scene_number == other.scene_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_depth_is_clamped() {
        assert_eq!(ElementKind::section(0), ElementKind::Section { depth: 1 });
        assert_eq!(ElementKind::section(9), ElementKind::Section { depth: 6 });
        assert_eq!(ElementKind::section(3).section_depth(), Some(3));
    }

    #[test]
    fn order_key_compares_chapter_first() {
        assert!(OrderKey::new(0, 99) < OrderKey::new(1, 0));
        assert!(OrderKey::new(2, 1) < OrderKey::new(2, 2));
    }

    #[test]
    fn restamp_keeps_identity() {
        let el = Element::new(ElementKind::Action, "He runs.");
        let id = el.id();
        let el = el.with_order(OrderKey::new(3, 7));
        assert_eq!(el.id(), id);
        assert_eq!(el.chapter_index(), 3);
        assert_eq!(el.position_index(), 7);
    }

    #[test]
    fn with_text_keeps_id_and_order() {
        let el = Element::new(ElementKind::Dialogue, "Hi.").with_order(OrderKey::new(1, 4));
        let edited = el.clone().with_text("Hello.");
        assert_eq!(edited.id(), el.id());
        assert_eq!(edited.order(), el.order());
        assert_eq!(edited.text(), "Hello.");
        assert!(!edited.same_content(&el));
    }

    #[test]
    fn blank_scene_number_is_dropped() {
        let el = Element::new(ElementKind::SceneHeading, "INT. HOUSE").with_scene_number(Some("  ".into()));
        assert_eq!(el.scene_number(), None);
    }
}

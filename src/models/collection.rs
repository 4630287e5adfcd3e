use serde::{Deserialize, Serialize};
use crate::models::element::{Element, ElementKind, OrderKey};

/// 标题页条目，同一个 key 可以出现多次（例如多个作者）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitlePageEntry {
    pub key: String,
    pub value: String,
}

impl TitlePageEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        TitlePageEntry {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// 来源信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// 原始文件名
    pub filename: Option<String>,
    /// 重新输出时是否隐藏场景编号
    pub suppress_scene_numbers: bool,
}

/// 解析结果
///
/// 元素始终按 `(chapter_index, position_index)` 排好序；经过无序存储的消费者
/// 需要自己按排序键重新排序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCollection")]
pub struct ElementCollection {
    elements: Vec<Element>,
    title_page: Vec<TitlePageEntry>,
    source: SourceMetadata,
}

#[derive(Deserialize)]
struct RawCollection {
    elements: Vec<Element>,
    #[serde(default)]
    title_page: Vec<TitlePageEntry>,
    #[serde(default)]
    source: SourceMetadata,
}

impl From<RawCollection> for ElementCollection {
    fn from(raw: RawCollection) -> Self {
        ElementCollection::new(raw.elements, raw.title_page, raw.source)
    }
}

impl ElementCollection {
    pub fn new(mut elements: Vec<Element>, title_page: Vec<TitlePageEntry>, source: SourceMetadata) -> Self {
        elements.sort_by_key(|e| e.order());
        ElementCollection {
            elements,
            title_page,
            source,
        }
    }

    pub fn empty() -> Self {
        ElementCollection::new(Vec::new(), Vec::new(), SourceMetadata::default())
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.source.filename = Some(filename.into());
        self
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    pub fn title_page(&self) -> &[TitlePageEntry] {
        &self.title_page
    }

    pub fn source(&self) -> &SourceMetadata {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// 标题页中某个 key 的全部值，key 不区分大小写
    pub fn title_values(&self, key: &str) -> Vec<&str> {
        self.title_page
            .iter()
            .filter(|e| e.key.eq_ignore_ascii_case(key))
            .map(|e| e.value.as_str())
            .collect()
    }

    /// 按排序键返回元素副本，不依赖内部顺序
    pub fn sorted_elements(&self) -> Vec<&Element> {
        let mut sorted: Vec<&Element> = self.elements.iter().collect();
        sorted.sort_by_key(|e| e.order());
        sorted
    }

    /// 章节数量（不含第 0 章的前置内容）
    pub fn chapter_count(&self) -> u32 {
        self.elements.iter().map(|e| e.chapter_index()).max().unwrap_or(0)
    }

    /// 某一章的所有元素
    pub fn chapter(&self, chapter_index: u32) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.chapter_index() == chapter_index)
    }

    /// 将标题页旁路数据转成 key/value 元素序列
    ///
    /// 这是一条独立的序列（全部在第 0 章，位置从 0 递增），不与正文混排。
    pub fn title_page_as_elements(&self) -> Vec<Element> {
        let mut out = Vec::with_capacity(self.title_page.len() * 2);
        let mut position = 0u64;
        for entry in &self.title_page {
            for (kind, text) in [
                (ElementKind::TitlePageKey, entry.key.as_str()),
                (ElementKind::TitlePageValue, entry.value.as_str()),
            ] {
                out.push(Element::new(kind, text).with_order(OrderKey::new(0, position)));
                position += 1;
            }
        }
        out
    }
}

impl Default for ElementCollection {
    fn default() -> Self {
        Self::empty()
    }
}

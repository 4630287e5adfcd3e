use std::time::Instant;

use roxmltree::{Document, Node};

use crate::error::{ParseError, ParseResult};
use crate::models::{
    Conf,
    Element,
    ElementCollection,
    ElementKind,
    SourceMetadata,
    TitlePageEntry,
};
use crate::parser::ordering::assign_chapter_order;
use crate::progress::{ParseControl, ProgressReporter};
use crate::utils::fdx_constants::{paragraph_kind, FdxConstants};

/// FDX（Final Draft XML）解析器
#[derive(Debug, Clone, Default)]
pub struct FdxParser {
    conf: Conf,
}

impl FdxParser {
    pub fn new() -> Self {
        FdxParser { conf: Conf::default() }
    }

    pub fn with_conf(conf: Conf) -> Self {
        FdxParser { conf }
    }

    pub fn conf(&self) -> &Conf {
        &self.conf
    }

    /// 解析 FDX 字节
    ///
    /// XML 不合法（或不是 UTF-8）时返回 [`ParseError::MalformedInput`]，
    /// 不会返回部分结果。
    pub fn parse(&self, bytes: &[u8], control: ParseControl<'_>) -> ParseResult<ElementCollection> {
        let started = Instant::now();
        let mut reporter = ProgressReporter::new(control, &self.conf, "读取 FDX 结构");
        reporter.check_cancelled()?;
        // 结构解析前总量未知
        reporter.emit(false);

        let source = std::str::from_utf8(bytes)
            .map_err(|e| ParseError::MalformedInput(format!("不是有效的 UTF-8 文本: {}", e)))?;
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let document = Document::parse(source)
            .map_err(|e| ParseError::MalformedInput(format!("XML 格式错误: {}", e)))?;
        reporter.check_cancelled()?;

        let root = document.root_element();
        if !root.has_tag_name(FdxConstants::ROOT) {
            log::debug!("fdx root element is <{}>, reading it anyway", root.tag_name().name());
        }

        // 标题页先于正文处理
        let title_page = child(root, FdxConstants::TITLE_PAGE)
            .map(parse_title_page)
            .unwrap_or_default();

        let paragraphs = child(root, FdxConstants::CONTENT)
            .map(collect_paragraphs)
            .unwrap_or_default();

        // 结构解析算前一半，段落转换算后一半
        let count = paragraphs.len() as i64;
        reporter.set_description("转换 FDX 段落");
        reporter.set_total(Some(count * 2));
        reporter.set_completed(count);
        reporter.emit(true);

        let mut mapper = ParagraphMapper::new();
        for paragraph in &paragraphs {
            mapper.map(*paragraph);
            reporter.advance(1)?;
        }

        let mut elements = assign_chapter_order(mapper.finish());
        if !self.conf.use_dual_dialogue {
            elements = elements.into_iter().map(|e| e.with_dual_dialogue(false)).collect();
        }
        reporter.finish();

        let collection = ElementCollection::new(
            elements,
            title_page,
            SourceMetadata {
                filename: None,
                suppress_scene_numbers: self.conf.suppress_scene_numbers,
            },
        );
        log::debug!(
            "fdx parse: {} paragraphs, {} elements, {} title entries, {} chapters in {}ms",
            paragraphs.len(),
            collection.len(),
            collection.title_page().len(),
            collection.chapter_count(),
            started.elapsed().as_millis()
        );
        Ok(collection)
    }
}

/// 第一个指定名字的子元素
fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

/// 按文档顺序收集正文段落
///
/// 包裹 `<DualDialogue>` 的外层 Paragraph 本身不是内容，跳过它，
/// 只取里面的段落。
fn collect_paragraphs<'a, 'input>(content: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    content
        .descendants()
        .filter(|n| n.has_tag_name(FdxConstants::PARAGRAPH))
        .filter(|n| child(*n, FdxConstants::DUAL_DIALOGUE).is_none())
        .collect()
}

/// 段落文本：所有 `<Text>` 片段按顺序拼接
fn paragraph_text(paragraph: Node<'_, '_>) -> String {
    paragraph
        .children()
        .filter(|c| c.has_tag_name(FdxConstants::TEXT))
        .flat_map(|t| t.descendants().filter(|d| d.is_text()).filter_map(|d| d.text()))
        .collect::<String>()
        .trim()
        .to_string()
}

/// 场景编号：`SceneProperties@Number` 优先，其次 `Paragraph@Number`
fn scene_number(paragraph: Node<'_, '_>) -> Option<String> {
    child(paragraph, FdxConstants::SCENE_PROPERTIES)
        .and_then(|p| p.attribute("Number"))
        .or_else(|| paragraph.attribute("Number"))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

fn parse_title_page(title_page: Node<'_, '_>) -> Vec<TitlePageEntry> {
    let mut entries: Vec<TitlePageEntry> = Vec::new();
    for paragraph in title_page
        .descendants()
        .filter(|n| n.has_tag_name(FdxConstants::PARAGRAPH))
    {
        let value = paragraph_text(paragraph);
        // Type 就是 key；普通段落第一条当标题，其余当备注。空的普通段落只是排版用的空行
        let key = match paragraph.attribute("Type").map(str::trim) {
            Some(t) if !t.is_empty() && t != "Action" && t != "General" => t.to_string(),
            _ if value.is_empty() => continue,
            _ if entries.is_empty() => "Title".to_string(),
            _ => "Notes".to_string(),
        };
        entries.push(TitlePageEntry::new(key, value));
    }
    entries
}

/// 段落到元素的转换状态，主要用来跟踪双人对白
struct ParagraphMapper<'a, 'input> {
    elements: Vec<Element>,
    wrapper: Option<Node<'a, 'input>>,
    wrapper_characters: usize,
    characters_seen: usize,
    block_dual: bool,
}

impl<'a, 'input> ParagraphMapper<'a, 'input> {
    fn new() -> Self {
        ParagraphMapper {
            elements: Vec::new(),
            wrapper: None,
            wrapper_characters: 0,
            characters_seen: 0,
            block_dual: false,
        }
    }

    fn finish(self) -> Vec<Element> {
        self.elements
    }

    fn map(&mut self, paragraph: Node<'a, 'input>) {
        let type_name = paragraph.attribute("Type").unwrap_or("");
        let kind = match paragraph_kind(type_name, paragraph.attribute("Level")) {
            Some(ElementKind::Action) if paragraph.attribute("Alignment") == Some("Center") => {
                ElementKind::Centered
            }
            Some(kind) => kind,
            None => {
                if !type_name.is_empty() {
                    log::warn!("unknown fdx paragraph type {:?}, treated as action", type_name);
                }
                ElementKind::Action
            }
        };

        if paragraph.attribute("StartsNewPage") == Some("Yes") && kind != ElementKind::PageBreak {
            self.elements.push(Element::new(ElementKind::PageBreak, ""));
        }
        if kind == ElementKind::PageBreak {
            self.elements.push(Element::new(ElementKind::PageBreak, ""));
            return;
        }

        let text = paragraph_text(paragraph);
        if text.is_empty() {
            log::debug!("skipping empty fdx paragraph of type {:?}", type_name);
            return;
        }

        let dual = self.track_dual(paragraph, kind);
        let mut element = Element::new(kind, text).with_dual_dialogue(dual);
        if matches!(kind, ElementKind::SceneHeading | ElementKind::Shot) {
            element = element.with_scene_number(scene_number(paragraph));
        }
        self.elements.push(element);
    }

    /// 计算当前段落是否属于双人对白
    ///
    /// 同一个 `<DualDialogue>` 里第二个及以后的角色块是双人对白；
    /// 只有一个角色块时它自己就是。
    fn track_dual(&mut self, paragraph: Node<'a, 'input>, kind: ElementKind) -> bool {
        let wrapper = paragraph
            .ancestors()
            .skip(1)
            .find(|n| n.has_tag_name(FdxConstants::DUAL_DIALOGUE));
        if wrapper != self.wrapper {
            self.wrapper = wrapper;
            self.characters_seen = 0;
            self.wrapper_characters = wrapper.map(count_characters).unwrap_or(0);
        }

        match kind {
            ElementKind::Character => {
                self.characters_seen += 1;
                self.block_dual = self.wrapper.is_some()
                    && (self.wrapper_characters == 1 || self.characters_seen >= 2);
            }
            ElementKind::Dialogue | ElementKind::Parenthetical => {}
            _ => self.block_dual = false,
        }
        kind.is_dialogue_part() && self.block_dual
    }
}

fn count_characters(wrapper: Node<'_, '_>) -> usize {
    wrapper
        .descendants()
        .filter(|n| n.has_tag_name(FdxConstants::PARAGRAPH) && n.attribute("Type") == Some("Character"))
        .count()
}

/// 解析 FDX 字节
pub fn parse_fdx(bytes: &[u8], control: ParseControl<'_>) -> ParseResult<ElementCollection> {
    FdxParser::new().parse(bytes, control)
}

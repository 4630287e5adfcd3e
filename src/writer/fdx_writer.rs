use std::time::Instant;

use crate::models::{Element, ElementCollection, ElementKind, TitlePageEntry};
use crate::utils::fdx_constants::{paragraph_type, FdxConstants};

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\" ?>\n";

/// 输出时的段落分组：对白块整体处理，方便包裹双人对白
enum Block<'a> {
    Single(&'a Element),
    Dialogue { elements: Vec<&'a Element>, dual: bool },
}

/// FDX 输出
///
/// 场景编号总是写出；隐藏编号只影响纯文本输出。
#[derive(Debug, Clone, Copy, Default)]
pub struct FdxWriter;

impl FdxWriter {
    pub fn new() -> Self {
        FdxWriter
    }

    pub fn write(&self, collection: &ElementCollection) -> Vec<u8> {
        let started = Instant::now();
        let elements = collection.sorted_elements();
        let blocks = group_blocks(&elements);

        let mut out = String::from(XML_HEADER);
        out.push_str(&format!(
            "<{} DocumentType=\"Script\" Template=\"No\" Version=\"4\">\n",
            FdxConstants::ROOT
        ));
        out.push_str(&format!("  <{}>\n", FdxConstants::CONTENT));

        let mut i = 0;
        while i < blocks.len() {
            match (&blocks[i], blocks.get(i + 1)) {
                // 非双人对白块后面紧跟双人对白块：两块包进同一个 DualDialogue
                (first @ Block::Dialogue { dual: false, .. }, Some(second @ Block::Dialogue { dual: true, .. })) => {
                    write_dual(&mut out, &[first, second]);
                    i += 2;
                }
                (block @ Block::Dialogue { dual: true, .. }, _) => {
                    write_dual(&mut out, &[block]);
                    i += 1;
                }
                (block, _) => {
                    write_block(&mut out, block, 4);
                    i += 1;
                }
            }
        }

        out.push_str(&format!("  </{}>\n", FdxConstants::CONTENT));
        write_title_page(&mut out, collection.title_page());
        out.push_str(&format!("</{}>\n", FdxConstants::ROOT));

        log::debug!(
            "fdx write: {} elements, {} bytes in {}ms",
            elements.len(),
            out.len(),
            started.elapsed().as_millis()
        );
        out.into_bytes()
    }
}

fn group_blocks<'a>(elements: &[&'a Element]) -> Vec<Block<'a>> {
    let mut blocks: Vec<Block<'a>> = Vec::new();
    for &element in elements {
        match element.kind() {
            ElementKind::Character => blocks.push(Block::Dialogue {
                elements: vec![element],
                dual: element.is_dual_dialogue(),
            }),
            ElementKind::Dialogue | ElementKind::Parenthetical => match blocks.last_mut() {
                Some(Block::Dialogue { elements, .. }) => elements.push(element),
                _ => blocks.push(Block::Single(element)),
            },
            _ => blocks.push(Block::Single(element)),
        }
    }
    blocks
}

fn write_block(out: &mut String, block: &Block<'_>, indent: usize) {
    match block {
        Block::Single(element) => write_paragraph(out, element, indent),
        Block::Dialogue { elements, .. } => {
            for element in elements {
                write_paragraph(out, element, indent);
            }
        }
    }
}

fn write_dual(out: &mut String, blocks: &[&Block<'_>]) {
    out.push_str(&format!("    <{}>\n", FdxConstants::PARAGRAPH));
    out.push_str(&format!("      <{}>\n", FdxConstants::DUAL_DIALOGUE));
    for block in blocks {
        write_block(out, block, 8);
    }
    out.push_str(&format!("      </{}>\n", FdxConstants::DUAL_DIALOGUE));
    out.push_str(&format!("    </{}>\n", FdxConstants::PARAGRAPH));
}

fn write_paragraph(out: &mut String, element: &Element, indent: usize) {
    let pad = " ".repeat(indent);
    let kind = element.kind();
    let mut attrs = format!("Type=\"{}\"", paragraph_type(kind));
    if let Some(depth) = kind.section_depth() {
        attrs.push_str(&format!(" Level=\"{}\"", depth));
    }
    if kind == ElementKind::Centered {
        attrs.push_str(" Alignment=\"Center\"");
    }

    if kind == ElementKind::PageBreak {
        out.push_str(&format!("{}<{} {}/>\n", pad, FdxConstants::PARAGRAPH, attrs));
        return;
    }

    out.push_str(&format!("{}<{} {}>\n", pad, FdxConstants::PARAGRAPH, attrs));
    if let Some(number) = element.scene_number() {
        out.push_str(&format!(
            "{}  <{} Number=\"{}\"/>\n",
            pad,
            FdxConstants::SCENE_PROPERTIES,
            escape_attribute(number)
        ));
    }
    out.push_str(&format!(
        "{}  <{}>{}</{}>\n",
        pad,
        FdxConstants::TEXT,
        escape_text(element.text()),
        FdxConstants::TEXT
    ));
    out.push_str(&format!("{}</{}>\n", pad, FdxConstants::PARAGRAPH));
}

fn write_title_page(out: &mut String, entries: &[TitlePageEntry]) {
    if entries.is_empty() {
        return;
    }
    out.push_str(&format!("  <{}>\n", FdxConstants::TITLE_PAGE));
    out.push_str(&format!("    <{}>\n", FdxConstants::CONTENT));
    for entry in entries {
        out.push_str(&format!(
            "      <{} Type=\"{}\">\n",
            FdxConstants::PARAGRAPH,
            escape_attribute(&entry.key)
        ));
        out.push_str(&format!(
            "        <{}>{}</{}>\n",
            FdxConstants::TEXT,
            escape_text(&entry.value),
            FdxConstants::TEXT
        ));
        out.push_str(&format!("      </{}>\n", FdxConstants::PARAGRAPH));
    }
    out.push_str(&format!("    </{}>\n", FdxConstants::CONTENT));
    out.push_str(&format!("  </{}>\n", FdxConstants::TITLE_PAGE));
}

/// 去掉 XML 1.0 不允许出现的控制字符
fn xml_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{fffe}' && c != '\u{ffff}'))
        .collect()
}

fn escape_text(text: &str) -> String {
    html_escape::encode_text(&xml_chars(text)).replace('\r', "&#xD;")
}

// 属性值里的换行和制表符会被解析器规范化成空格，改写成字符引用
fn escape_attribute(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(&xml_chars(text))
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
        .replace('\t', "&#x9;")
}

/// 输出 FDX 字节
pub fn write_fdx(collection: &ElementCollection) -> Vec<u8> {
    FdxWriter::new().write(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceMetadata;
    use crate::parser::{assign_chapter_order, parse_fdx};
    use crate::progress::ParseControl;
    use pretty_assertions::assert_eq;

    fn collection(elements: Vec<Element>, title_page: Vec<TitlePageEntry>) -> ElementCollection {
        ElementCollection::new(assign_chapter_order(elements), title_page, SourceMetadata::default())
    }

    fn written(collection: &ElementCollection) -> String {
        String::from_utf8(write_fdx(collection)).unwrap()
    }

    #[test]
    fn writes_paragraphs_with_scene_properties() {
        let doc = collection(
            vec![
                Element::new(ElementKind::SceneHeading, "INT. BAR & GRILL - NIGHT")
                    .with_scene_number(Some("3".to_string())),
                Element::new(ElementKind::Action, "<beat>"),
            ],
            Vec::new(),
        );
        assert_eq!(
            written(&doc),
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\" ?>\n",
                "<FinalDraft DocumentType=\"Script\" Template=\"No\" Version=\"4\">\n",
                "  <Content>\n",
                "    <Paragraph Type=\"Scene Heading\">\n",
                "      <SceneProperties Number=\"3\"/>\n",
                "      <Text>INT. BAR &amp; GRILL - NIGHT</Text>\n",
                "    </Paragraph>\n",
                "    <Paragraph Type=\"Action\">\n",
                "      <Text>&lt;beat&gt;</Text>\n",
                "    </Paragraph>\n",
                "  </Content>\n",
                "</FinalDraft>\n",
            )
        );
    }

    #[test]
    fn dual_block_is_wrapped_with_previous_block() {
        let doc = collection(
            vec![
                Element::new(ElementKind::Character, "BRICK"),
                Element::new(ElementKind::Dialogue, "Screw retirement."),
                Element::new(ElementKind::Character, "STEEL").with_dual_dialogue(true),
                Element::new(ElementKind::Dialogue, "Screw you.").with_dual_dialogue(true),
            ],
            Vec::new(),
        );
        let xml = written(&doc);
        assert_eq!(xml.matches("<DualDialogue>").count(), 1);

        let reparsed = parse_fdx(xml.as_bytes(), ParseControl::default()).unwrap();
        let duals: Vec<bool> = reparsed.elements().iter().map(|e| e.is_dual_dialogue()).collect();
        assert_eq!(duals, vec![false, false, true, true]);
    }

    #[test]
    fn writes_title_page_and_sections() {
        let doc = collection(
            vec![
                Element::new(ElementKind::section(2), "One"),
                Element::new(ElementKind::Centered, "THE END"),
                Element::new(ElementKind::PageBreak, ""),
            ],
            vec![TitlePageEntry::new("Title", "Brick \"&\" Steel")],
        );
        let xml = written(&doc);
        assert!(xml.contains("<Paragraph Type=\"Section Heading\" Level=\"2\">"));
        assert!(xml.contains("<Paragraph Type=\"Action\" Alignment=\"Center\">"));
        assert!(xml.contains("<Paragraph Type=\"Page Break\"/>"));
        assert!(xml.contains("<TitlePage>"));

        let reparsed = parse_fdx(xml.as_bytes(), ParseControl::default()).unwrap();
        assert_eq!(reparsed.title_page().to_vec(), doc.title_page().to_vec());
        for (a, b) in doc.elements().iter().zip(reparsed.elements()) {
            assert!(a.same_content(b), "{:?} != {:?}", a, b);
        }
        assert_eq!(reparsed.len(), doc.len());
    }

    #[test]
    fn strips_invalid_control_characters() {
        let doc = collection(vec![Element::new(ElementKind::Action, "bell\u{7}\r\nnext")], Vec::new());
        let xml = written(&doc);
        assert!(xml.contains("<Text>bell&#xD;\nnext</Text>"));
        assert!(parse_fdx(xml.as_bytes(), ParseControl::default()).is_ok());
    }

    #[test]
    fn output_is_deterministic() {
        let doc = collection(vec![Element::new(ElementKind::Action, "Same.")], Vec::new());
        assert_eq!(write_fdx(&doc), write_fdx(&doc.clone()));
    }
}

use std::time::Instant;

use crate::models::{Element, ElementCollection, ElementKind, TitlePageEntry};
use crate::utils::{line_regex, title_regex, FountainConstants};

/// Fountain 纯文本输出
///
/// 不保存状态；相同的集合总是得到逐字节相同的输出。
#[derive(Debug, Clone, Copy, Default)]
pub struct FountainWriter {
    suppress_scene_numbers: bool,
}

impl FountainWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 无论集合本身的设置如何都隐藏场景编号
    pub fn suppress_scene_numbers(mut self, suppress: bool) -> Self {
        self.suppress_scene_numbers = suppress;
        self
    }

    pub fn write(&self, collection: &ElementCollection) -> String {
        let started = Instant::now();
        let suppress = self.suppress_scene_numbers || collection.source().suppress_scene_numbers;
        let mut out = String::new();

        write_title_page(&mut out, collection.title_page());
        let at_start = out.is_empty();

        // 不信任集合内部顺序，按排序键重新排
        let elements = collection.sorted_elements();
        let mut previous: Option<&Element> = None;
        for element in elements.iter().copied() {
            if let Some(prev) = previous {
                out.push_str(separator(prev, element));
            }
            out.push_str(&render(element, suppress, at_start && previous.is_none()));
            previous = Some(element);
        }
        if !elements.is_empty() {
            out.push('\n');
        }

        log::debug!(
            "fountain write: {} elements, {} bytes in {}ms",
            elements.len(),
            out.len(),
            started.elapsed().as_millis()
        );
        out
    }
}

/// 对白块内部只换行，其余元素之间空一行
fn separator(prev: &Element, next: &Element) -> &'static str {
    let in_dialogue = prev.kind().is_dialogue_part()
        && matches!(next.kind(), ElementKind::Dialogue | ElementKind::Parenthetical);
    if in_dialogue {
        "\n"
    } else {
        "\n\n"
    }
}

// 标题页：同一个 key 连续多个值时改用缩进续行
fn write_title_page(out: &mut String, entries: &[TitlePageEntry]) {
    if entries.is_empty() {
        return;
    }

    let mut i = 0;
    while i < entries.len() {
        let key = entries[i].key.replace(':', "");
        let key = key.trim();
        let mut j = i + 1;
        while j < entries.len() && entries[j].key == entries[i].key {
            j += 1;
        }

        let group = &entries[i..j];
        if group.len() == 1 && group[0].value.trim().is_empty() {
            out.push_str(&format!("{}:\n", key));
        } else if group.len() == 1 && !group[0].value.contains('\n') {
            out.push_str(&format!("{}: {}\n", key, group[0].value.trim()));
        } else {
            out.push_str(&format!("{}:\n", key));
            for entry in group {
                for line in entry.value.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    out.push_str(FountainConstants::TITLE_INDENT);
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        i = j;
    }
    out.push('\n');
}

/// 多行文本压成一行
fn single_line(text: &str) -> String {
    text.split('\n').map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ")
}

/// 段落里的空行写成两个空格，避免把段落拆开
fn paragraph_lines<'a>(text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    text.split('\n').map(|line| if line.trim().is_empty() { "  " } else { line })
}

fn render(element: &Element, suppress_scene_numbers: bool, document_start: bool) -> String {
    let text = element.text();
    match element.kind() {
        ElementKind::SceneHeading => {
            let heading = single_line(text);
            let mut line = if looks_like_scene_heading(&heading) {
                heading
            } else {
                format!(".{}", heading)
            };
            if let (Some(number), false) = (element.scene_number(), suppress_scene_numbers) {
                line.push_str(&format!(" #{}#", number));
            }
            line
        }
        ElementKind::Shot => format!(".{}", single_line(text)),
        ElementKind::Action => paragraph_lines(text)
            .enumerate()
            .map(|(i, line)| {
                if needs_action_force(line, document_start && i == 0) {
                    format!("!{}", line)
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ElementKind::Character => {
            let name = single_line(text).to_uppercase();
            let mut line = if needs_character_force(&name) {
                format!("@{}", name)
            } else {
                name
            };
            if element.is_dual_dialogue() {
                line.push_str(" ^");
            }
            line
        }
        ElementKind::Parenthetical => {
            let inner = text.trim();
            if inner.starts_with('(') && inner.ends_with(')') {
                inner.to_string()
            } else {
                format!("({})", inner)
            }
        }
        ElementKind::Dialogue => paragraph_lines(text.trim()).collect::<Vec<_>>().join("\n"),
        ElementKind::Transition => {
            let line = single_line(text);
            if line_regex("transition").is_match(&line) {
                line
            } else {
                format!("> {}", line)
            }
        }
        ElementKind::Centered => format!("> {} <", single_line(text)),
        ElementKind::Section { depth } => {
            format!("{} {}", "#".repeat(depth as usize), single_line(text))
        }
        ElementKind::Synopsis => format!("= {}", single_line(text)),
        ElementKind::Comment => {
            format!("{}{}{}", FountainConstants::NOTE_BEGIN, text, FountainConstants::NOTE_END)
        }
        ElementKind::Boneyard => format!(
            "{}{}{}",
            FountainConstants::BONEYARD_BEGIN,
            text,
            FountainConstants::BONEYARD_END
        ),
        ElementKind::Lyrics => text
            .split('\n')
            .map(|line| format!("~{}", line))
            .collect::<Vec<_>>()
            .join("\n"),
        ElementKind::PageBreak => FountainConstants::PAGE_BREAK.to_string(),
        // 正文里混入的标题页元素按普通动作输出
        ElementKind::TitlePageKey | ElementKind::TitlePageValue => format!("!{}", single_line(text)),
    }
}

fn looks_like_scene_heading(text: &str) -> bool {
    line_regex("scene_heading").is_match(text) || line_regex("numbered_scene_heading").is_match(text)
}

/// 动作行是否会被误认成其他元素，需要加 `!`
fn needs_action_force(line: &str, document_start: bool) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if document_start && title_regex("key_value").is_match(line) {
        return true;
    }
    const MARKERS: [&str; 10] = ["!", "@", "#", "=", "~", ">", ".", "/*", "[[", "==="];
    MARKERS.iter().any(|m| trimmed.starts_with(m))
        || looks_like_scene_heading(trimmed)
        || line_regex("transition").is_match(trimmed)
        || line_regex("character").is_match(trimmed)
}

/// 角色名不加 `@` 时能否被识别为角色
fn needs_character_force(name: &str) -> bool {
    !line_regex("character").is_match(name)
        || !line_regex("character_letters").is_match(name)
        || looks_like_scene_heading(name)
        || name.starts_with('.')
}

/// 使用集合自带的设置输出
pub fn write_fountain(collection: &ElementCollection) -> String {
    FountainWriter::new().write(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderKey, SourceMetadata};
    use crate::parser::assign_chapter_order;
    use pretty_assertions::assert_eq;

    fn collection(elements: Vec<Element>, title_page: Vec<TitlePageEntry>) -> ElementCollection {
        ElementCollection::new(assign_chapter_order(elements), title_page, SourceMetadata::default())
    }

    #[test]
    fn writes_basic_scene() {
        let doc = collection(
            vec![
                Element::new(ElementKind::SceneHeading, "INT. OFFICE - DAY")
                    .with_scene_number(Some("1".to_string())),
                Element::new(ElementKind::Action, "The phone rings."),
                Element::new(ElementKind::Character, "John"),
                Element::new(ElementKind::Parenthetical, "quietly"),
                Element::new(ElementKind::Dialogue, "Hello?"),
                Element::new(ElementKind::Transition, "CUT TO:"),
            ],
            Vec::new(),
        );
        assert_eq!(
            write_fountain(&doc),
            "INT. OFFICE - DAY #1#\n\nThe phone rings.\n\nJOHN\n(quietly)\nHello?\n\nCUT TO:\n"
        );
    }

    #[test]
    fn suppressed_scene_numbers_are_dropped() {
        let doc = collection(
            vec![Element::new(ElementKind::SceneHeading, "EXT. PARK").with_scene_number(Some("7".to_string()))],
            Vec::new(),
        );
        assert_eq!(FountainWriter::new().suppress_scene_numbers(true).write(&doc), "EXT. PARK\n");
    }

    #[test]
    fn title_page_groups_repeated_keys() {
        let doc = collection(
            vec![Element::new(ElementKind::Action, "Go.")],
            vec![
                TitlePageEntry::new("Title", "Brick & Steel"),
                TitlePageEntry::new("Author", "A"),
                TitlePageEntry::new("Author", "B"),
            ],
        );
        assert_eq!(
            write_fountain(&doc),
            "Title: Brick & Steel\nAuthor:\n    A\n    B\n\nGo.\n"
        );
    }

    #[test]
    fn forces_ambiguous_lines() {
        let doc = collection(
            vec![
                Element::new(ElementKind::SceneHeading, "THE MOON"),
                Element::new(ElementKind::Action, "BOOM\nThe ground shakes.\n\n# not a section"),
                Element::new(ElementKind::Character, "1st guard"),
                Element::new(ElementKind::Dialogue, "Halt."),
                Element::new(ElementKind::Transition, "Fade out."),
                Element::new(ElementKind::Centered, "THE END"),
            ],
            Vec::new(),
        );
        assert_eq!(
            write_fountain(&doc),
            ".THE MOON\n\n!BOOM\nThe ground shakes.\n  \n!# not a section\n\n@1ST GUARD\nHalt.\n\n> Fade out.\n\n> THE END <\n"
        );
    }

    #[test]
    fn structure_and_notes() {
        let doc = collection(
            vec![
                Element::new(ElementKind::section(2), "Chapter 1"),
                Element::new(ElementKind::Synopsis, "Things happen."),
                Element::new(ElementKind::Comment, "check this"),
                Element::new(ElementKind::Boneyard, "old\nscene"),
                Element::new(ElementKind::Lyrics, "La la\nLa"),
                Element::new(ElementKind::PageBreak, ""),
                Element::new(ElementKind::Character, "Mary").with_dual_dialogue(true),
                Element::new(ElementKind::Dialogue, "Hi."),
            ],
            Vec::new(),
        );
        assert_eq!(
            write_fountain(&doc),
            "## Chapter 1\n\n= Things happen.\n\n[[check this]]\n\n/*old\nscene*/\n\n~La la\n~La\n\n===\n\nMARY ^\nHi.\n"
        );
    }

    #[test]
    fn sorts_defensively() {
        let late = Element::new(ElementKind::Action, "Second.").with_order(OrderKey::new(1, 0));
        let early = Element::new(ElementKind::Action, "First.").with_order(OrderKey::new(0, 3));
        let doc = ElementCollection::new(vec![late, early], Vec::new(), SourceMetadata::default());
        assert_eq!(write_fountain(&doc), "First.\n\nSecond.\n");
    }

    #[test]
    fn key_like_first_action_is_forced() {
        let doc = collection(vec![Element::new(ElementKind::Action, "Notes: it rains.")], Vec::new());
        assert_eq!(write_fountain(&doc), "!Notes: it rains.\n");

        // 不是标题页字段的 `XXX:` 原样输出
        let doc = collection(vec![Element::new(ElementKind::Action, "Meanwhile: it rains.")], Vec::new());
        assert_eq!(write_fountain(&doc), "Meanwhile: it rains.\n");
    }

    #[test]
    fn empty_title_value_round_trips() {
        let doc = collection(
            vec![Element::new(ElementKind::Action, "FADE IN:")],
            vec![TitlePageEntry::new("Title", "X"), TitlePageEntry::new("Notes", "")],
        );
        let text = write_fountain(&doc);
        assert_eq!(text, "Title: X\nNotes:\n\n!FADE IN:\n");

        let reparsed = crate::parser::parse_fountain(&text, crate::progress::ParseControl::default()).unwrap();
        assert_eq!(reparsed.title_page(), doc.title_page());
        assert!(reparsed.elements()[0].same_content(&doc.elements()[0]));
    }

    #[test]
    fn empty_collection_writes_nothing() {
        assert_eq!(write_fountain(&ElementCollection::empty()), "");
    }
}

use std::time::Instant;

use crate::error::ParseResult;
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
use crate::utils::{is_blank_line, line_regex, split_lines, title_regex, FountainConstants};

/// Fountain 纯文本解析器
///
/// 只保存配置；每次 `parse` 的中间状态都在调用内部创建并丢弃，
/// 同一个解析器可以在多个线程里同时使用。
#[derive(Debug, Clone, Default)]
pub struct FountainParser {
    conf: Conf,
}

/// 逐行处理后的游标移动
enum Step<'a> {
    /// 消耗了 n 行
    Advance(usize),
    /// 消耗了 skip 行，第 skip 行（相对当前行）还剩下 rest 需要重新识别
    Carry { skip: usize, rest: &'a str },
}

/// 当前所在的块
#[derive(Debug, Clone, Copy, PartialEq)]
enum BlockState {
    Normal,
    Dialogue { dual: bool, parenthetical_open: bool },
}

/// 尚未落地的多行段落（动作、歌词、对白、多行括号）
struct Pending {
    kind: ElementKind,
    lines: Vec<String>,
    dual: bool,
}

/// 单次解析的局部状态
struct BodyState<'c> {
    conf: &'c Conf,
    elements: Vec<Element>,
    pending: Option<Pending>,
    block: BlockState,
    last_was_blank: bool,
}

impl FountainParser {
    pub fn new() -> Self {
        FountainParser { conf: Conf::default() }
    }

    pub fn with_conf(conf: Conf) -> Self {
        FountainParser { conf }
    }

    pub fn conf(&self) -> &Conf {
        &self.conf
    }

    /// 解析 Fountain 文本
    ///
    /// 对任何输入都会给出结果；只有取消会返回错误。
    pub fn parse(&self, script: &str, control: ParseControl<'_>) -> ParseResult<ElementCollection> {
        let started = Instant::now();
        let mut reporter = ProgressReporter::new(control, &self.conf, "解析 Fountain 剧本");
        reporter.check_cancelled()?;

        let lines = split_lines(script);
        reporter.set_total(Some(lines.len() as i64));
        reporter.emit(false);

        // 第一阶段：标题页
        let (title_page, body_start) = parse_title_page(&lines, &mut reporter)?;

        // 第二阶段：正文逐行识别
        let mut state = BodyState::new(&self.conf);
        let mut i = body_start;
        let mut carry: Option<&str> = None;
        while i < lines.len() {
            let line = carry.take().unwrap_or(lines[i]);
            match state.process_line(&lines, i, line) {
                Step::Advance(n) => {
                    reporter.advance(n as i64)?;
                    i += n;
                }
                Step::Carry { skip, rest } => {
                    reporter.advance(skip as i64)?;
                    i += skip;
                    carry = Some(rest);
                }
            }
        }

        let elements = assign_chapter_order(state.finish());
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
            "fountain parse: {} lines, {} elements, {} title entries, {} chapters in {}ms",
            lines.len(),
            collection.len(),
            collection.title_page().len(),
            collection.chapter_count(),
            started.elapsed().as_millis()
        );
        Ok(collection)
    }
}

/// 是否为标题页的 `Key: Value` 行（只认已知的字段名）
fn is_title_key_line(line: &str) -> bool {
    title_regex("key_value").is_match(line)
}

/// 解析文档开头的标题页
///
/// 返回标题页条目和正文开始的行号。标题页必须从第一行开始，遇到空行
/// （空行一并消耗）或第一个非元数据行时结束。值为空且没有续行的字段
/// 记成空值条目。
fn parse_title_page(
    lines: &[&str],
    reporter: &mut ProgressReporter<'_>,
) -> ParseResult<(Vec<TitlePageEntry>, usize)> {
    let mut entries = Vec::new();
    match lines.first() {
        Some(first) if is_title_key_line(first) => {}
        _ => return Ok((entries, 0)),
    }

    let mut current_key: Option<String> = None;
    // 值为空、还在等续行的字段
    let mut empty_key: Option<String> = None;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if is_blank_line(line) {
            i += 1;
            reporter.advance(1)?;
            break;
        }

        if let Some(caps) = title_regex("key_value").captures(line) {
            if let Some(key) = empty_key.take() {
                entries.push(TitlePageEntry::new(key, ""));
            }
            let key = caps[1].trim().to_string();
            let value = caps[2].trim();
            if value.is_empty() {
                empty_key = Some(key.clone());
            } else {
                entries.push(TitlePageEntry::new(key.clone(), value));
            }
            current_key = Some(key);
        } else if let (Some(key), Some(caps)) = (&current_key, title_regex("continuation").captures(line)) {
            // 缩进的续行：同一个 key 的另一个值
            empty_key = None;
            entries.push(TitlePageEntry::new(key.clone(), caps[1].trim()));
        } else {
            // 非元数据行，留给正文
            break;
        }

        i += 1;
        reporter.advance(1)?;
    }

    if let Some(key) = empty_key {
        entries.push(TitlePageEntry::new(key, ""));
    }
    Ok((entries, i))
}

/// 从 `/*` 或 `[[` 开始截取注释块
///
/// 返回（内容，完整消耗的行数，闭合标记后同一行的剩余内容）。
/// 没有闭合标记时一直截取到文档末尾。
fn take_enclosed<'a>(
    lines: &[&'a str],
    index: usize,
    line: &'a str,
    open: &str,
    close: &str,
) -> (String, usize, Option<&'a str>) {
    let opened = line.trim_start();
    let after_open = &opened[open.len()..];

    if let Some(pos) = after_open.find(close) {
        let rest = &after_open[pos + close.len()..];
        return (after_open[..pos].trim().to_string(), 0, Some(rest));
    }

    let mut parts = vec![after_open];
    let mut j = index + 1;
    while j < lines.len() {
        if let Some(pos) = lines[j].find(close) {
            parts.push(&lines[j][..pos]);
            let rest = &lines[j][pos + close.len()..];
            return (parts.join("\n").trim().to_string(), j - index, Some(rest));
        }
        parts.push(lines[j]);
        j += 1;
    }

    (parts.join("\n").trim().to_string(), lines.len() - index - 1, None)
}

impl<'c> BodyState<'c> {
    fn new(conf: &'c Conf) -> Self {
        BodyState {
            conf,
            elements: Vec::new(),
            pending: None,
            block: BlockState::Normal,
            // 正文开头视作前面有空行
            last_was_blank: true,
        }
    }

    fn finish(mut self) -> Vec<Element> {
        self.flush();
        self.elements
    }

    // 把未完成的多行段落落地
    fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            let text = pending.lines.join("\n");
            let text = text.trim_end_matches('\n');
            self.elements
                .push(Element::new(pending.kind, text).with_dual_dialogue(pending.dual));
        }
    }

    fn push(&mut self, element: Element) {
        self.flush();
        self.elements.push(element);
    }

    // 追加到同类型的多行段落，类型不同则先落地
    fn append(&mut self, kind: ElementKind, line: &str, dual: bool) {
        match &mut self.pending {
            Some(pending) if pending.kind == kind && pending.dual == dual => {
                pending.lines.push(line.to_string());
            }
            _ => {
                self.flush();
                self.pending = Some(Pending {
                    kind,
                    lines: vec![line.to_string()],
                    dual,
                });
            }
        }
    }

    fn process_line<'a>(&mut self, lines: &[&'a str], index: usize, line: &'a str) -> Step<'a> {
        let next_blank = index + 1 >= lines.len() || is_blank_line(lines[index + 1]);

        // 空行
        if is_blank_line(line) {
            // 两个以上空格的空行：对白和动作里保留为段内空行
            let keeps_paragraph = matches!(
                &self.pending,
                Some(p) if p.kind == ElementKind::Action || p.kind == ElementKind::Dialogue
            );
            if keeps_paragraph && line_regex("line_break").is_match(line) {
                if let Some(pending) = &mut self.pending {
                    pending.lines.push(String::new());
                }
                return Step::Advance(1);
            }

            self.flush();
            self.block = BlockState::Normal;
            self.last_was_blank = true;
            return Step::Advance(1);
        }

        let trimmed = line.trim();

        // 注释块不影响前后的空行判断
        if trimmed.starts_with(FountainConstants::BONEYARD_BEGIN) {
            let (content, consumed, rest) = take_enclosed(
                lines,
                index,
                line,
                FountainConstants::BONEYARD_BEGIN,
                FountainConstants::BONEYARD_END,
            );
            self.push(Element::new(ElementKind::Boneyard, content));
            return Self::after_enclosed(consumed, rest);
        }
        if trimmed.starts_with(FountainConstants::NOTE_BEGIN) {
            let (content, consumed, rest) = take_enclosed(
                lines,
                index,
                line,
                FountainConstants::NOTE_BEGIN,
                FountainConstants::NOTE_END,
            );
            self.push(Element::new(ElementKind::Comment, content));
            return Self::after_enclosed(consumed, rest);
        }

        match self.block {
            BlockState::Dialogue { dual, parenthetical_open } => {
                self.process_dialogue_line(trimmed, dual, parenthetical_open);
            }
            BlockState::Normal => {
                self.process_normal_line(line, trimmed, next_blank);
            }
        }
        self.last_was_blank = false;
        Step::Advance(1)
    }

    fn after_enclosed<'a>(consumed: usize, rest: Option<&'a str>) -> Step<'a> {
        match rest {
            Some(rest) if !rest.trim().is_empty() => Step::Carry { skip: consumed, rest },
            _ => Step::Advance(consumed + 1),
        }
    }

    // 对白块内：括号或对白
    fn process_dialogue_line(&mut self, trimmed: &str, dual: bool, parenthetical_open: bool) {
        if parenthetical_open {
            self.append(ElementKind::Parenthetical, trimmed, dual);
            if line_regex("parenthetical_end").is_match(trimmed) {
                self.flush();
                self.block = BlockState::Dialogue { dual, parenthetical_open: false };
            }
        } else if line_regex("parenthetical").is_match(trimmed) {
            self.push(Element::new(ElementKind::Parenthetical, trimmed).with_dual_dialogue(dual));
        } else if line_regex("parenthetical_start").is_match(trimmed) {
            self.append(ElementKind::Parenthetical, trimmed, dual);
            self.block = BlockState::Dialogue { dual, parenthetical_open: true };
        } else {
            self.append(ElementKind::Dialogue, trimmed, dual);
        }
    }

    fn process_normal_line(&mut self, line: &str, trimmed: &str, next_blank: bool) {
        let prev_blank = self.last_was_blank;

        // 分页符（必须在概要之前检查，=== 也以 = 开头）
        if line_regex("page_break").is_match(trimmed) {
            self.push(Element::new(ElementKind::PageBreak, ""));
            return;
        }

        // 章节标题
        if trimmed.starts_with('#') {
            if let Some(caps) = line_regex("section").captures(trimmed) {
                let depth = caps[1].len();
                if depth <= ElementKind::MAX_SECTION_DEPTH as usize {
                    self.push(Element::new(ElementKind::section(depth), &caps[2]));
                    return;
                }
            }
        }

        // 概要
        if let Some(rest) = trimmed.strip_prefix('=') {
            self.push(Element::new(ElementKind::Synopsis, rest.trim()));
            return;
        }

        // 歌词，连续多行合并
        if let Some(rest) = trimmed.strip_prefix('~') {
            self.append(ElementKind::Lyrics, rest.trim_start(), false);
            return;
        }

        // 居中 > text <
        if let Some(caps) = line_regex("centered").captures(trimmed) {
            if !caps[1].is_empty() {
                self.push(Element::new(ElementKind::Centered, &caps[1]));
                return;
            }
        }

        // 强制转场 > text
        if let Some(rest) = trimmed.strip_prefix('>') {
            let rest = rest.trim();
            if !rest.is_empty() {
                self.push(Element::new(ElementKind::Transition, rest));
                return;
            }
        }

        // 强制动作 !
        if let Some(rest) = trimmed.strip_prefix('!') {
            self.append(ElementKind::Action, rest, false);
            return;
        }

        if prev_blank {
            // 强制场景标题 .（排除省略号）
            if trimmed.starts_with('.') && !trimmed.starts_with("..") {
                self.scene_heading(trimmed[1..].trim_start());
                return;
            }

            if line_regex("scene_heading").is_match(trimmed)
                || line_regex("numbered_scene_heading").is_match(trimmed)
            {
                self.scene_heading(trimmed);
                return;
            }

            if next_blank && line_regex("transition").is_match(trimmed) {
                self.push(Element::new(ElementKind::Transition, trimmed));
                return;
            }

            if !next_blank && line_regex("character").is_match(trimmed) && self.character(trimmed) {
                return;
            }
        }

        log::trace!("line classified as action: {:?}", trimmed);
        self.append(ElementKind::Action, line.trim_end(), false);
    }

    // 场景标题：结尾 #编号# 优先，其次是开头的数字编号
    fn scene_heading(&mut self, raw: &str) {
        let mut text = raw.trim();
        let mut number: Option<String> = None;

        if let Some(m) = line_regex("scene_number").captures(text) {
            number = Some(m[1].trim().to_string());
            if let Some(whole) = m.get(0) {
                text = text[..whole.start()].trim_end();
            }
        }

        if let Some(caps) = line_regex("numbered_scene_heading").captures(text) {
            if number.is_none() {
                number = Some(caps[1].to_string());
            }
            if let Some(heading) = caps.get(2) {
                text = &text[heading.start()..];
            }
        }

        self.push(Element::new(ElementKind::SceneHeading, text.trim()).with_scene_number(number));
    }

    // 角色名：去掉 @ 和结尾的 ^，返回是否识别成功
    fn character(&mut self, trimmed: &str) -> bool {
        let forced = trimmed.starts_with('@');
        let name = trimmed.strip_prefix('@').unwrap_or(trimmed);
        let marked_dual = line_regex("dual_marker").is_match(name);
        let name = line_regex("dual_marker").replace(name, "");
        let name = name.trim();

        if name.is_empty() || (!forced && !line_regex("character_letters").is_match(name)) {
            return false;
        }

        let dual = marked_dual && self.conf.use_dual_dialogue;
        self.push(Element::new(ElementKind::Character, name).with_dual_dialogue(dual));
        self.block = BlockState::Dialogue { dual, parenthetical_open: false };
        true
    }
}

/// 使用默认配置解析
pub fn parse_fountain(script: &str, control: ParseControl<'_>) -> ParseResult<ElementCollection> {
    FountainParser::new().parse(script, control)
}

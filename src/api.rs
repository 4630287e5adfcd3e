//! 对外接口
//!
//! 同步入口直接在调用线程上解析；`*_async` 入口把解析放到 tokio 的阻塞线程池，
//! 进度回调会在那个线程上被调用。

use std::sync::Arc;

use crate::error::{ParseError, ParseResult};
use crate::models::{Conf, ElementCollection};
use crate::parser::{FdxParser, FountainParser};
use crate::progress::{CancellationToken, ParseControl, ProgressSink};
use crate::writer::{write_fdx, write_fountain};

/// 输入格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Fountain,
    Fdx,
}

fn control_from(progress: Option<&dyn ProgressSink>) -> ParseControl<'_> {
    match progress {
        Some(sink) => ParseControl::new().with_progress(sink),
        None => ParseControl::new(),
    }
}

/// 解析 Fountain 纯文本
pub fn parse_plain_text(text: &str, progress: Option<&dyn ProgressSink>) -> ParseResult<ElementCollection> {
    parse_plain_text_with_conf(text, &Conf::default(), control_from(progress))
}

pub fn parse_plain_text_with_conf(
    text: &str,
    conf: &Conf,
    control: ParseControl<'_>,
) -> ParseResult<ElementCollection> {
    FountainParser::with_conf(conf.clone()).parse(text, control)
}

/// 解析 FDX 字节
pub fn parse_interchange_xml(bytes: &[u8], progress: Option<&dyn ProgressSink>) -> ParseResult<ElementCollection> {
    parse_interchange_xml_with_conf(bytes, &Conf::default(), control_from(progress))
}

pub fn parse_interchange_xml_with_conf(
    bytes: &[u8],
    conf: &Conf,
    control: ParseControl<'_>,
) -> ParseResult<ElementCollection> {
    FdxParser::with_conf(conf.clone()).parse(bytes, control)
}

/// 输出 Fountain 纯文本
pub fn write_plain_text(collection: &ElementCollection) -> String {
    write_fountain(collection)
}

/// 输出 FDX 字节
pub fn write_interchange_xml(collection: &ElementCollection) -> Vec<u8> {
    write_fdx(collection)
}

/// 根据内容判断格式：第一个非空白字符是 `<` 就当作 FDX
pub fn detect_format(bytes: &[u8]) -> SourceFormat {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'<') => SourceFormat::Fdx,
        _ => SourceFormat::Fountain,
    }
}

/// 自动识别格式后解析；纯文本里的非 UTF-8 字节按替换字符处理
pub fn parse_any(bytes: &[u8], conf: &Conf, control: ParseControl<'_>) -> ParseResult<ElementCollection> {
    match detect_format(bytes) {
        SourceFormat::Fdx => parse_interchange_xml_with_conf(bytes, conf, control),
        SourceFormat::Fountain => {
            let text = String::from_utf8_lossy(bytes);
            parse_plain_text_with_conf(&text, conf, control)
        }
    }
}

/// 导出为 JSON
pub fn collection_to_json(collection: &ElementCollection) -> serde_json::Result<String> {
    serde_json::to_string_pretty(collection)
}

/// 在阻塞线程池里解析 Fountain 纯文本
pub async fn parse_plain_text_async(
    text: String,
    conf: Conf,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: Option<CancellationToken>,
) -> ParseResult<ElementCollection> {
    run_blocking(move || {
        let control = build_control(progress.as_deref(), cancel.as_ref());
        FountainParser::with_conf(conf).parse(&text, control)
    })
    .await
}

/// 在阻塞线程池里解析 FDX 字节
pub async fn parse_interchange_xml_async(
    bytes: Vec<u8>,
    conf: Conf,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: Option<CancellationToken>,
) -> ParseResult<ElementCollection> {
    run_blocking(move || {
        let control = build_control(progress.as_deref(), cancel.as_ref());
        FdxParser::with_conf(conf).parse(&bytes, control)
    })
    .await
}

fn build_control<'a>(
    progress: Option<&'a dyn ProgressSink>,
    cancel: Option<&'a CancellationToken>,
) -> ParseControl<'a> {
    ParseControl { progress, cancel }
}

async fn run_blocking<F>(job: F) -> ParseResult<ElementCollection>
where
    F: FnOnce() -> ParseResult<ElementCollection> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result,
        // 解析线程 panic 原样抛给调用方
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(ParseError::Cancelled),
    }
}

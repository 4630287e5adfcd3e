pub mod models;
pub mod utils;
pub mod parser;
pub mod writer;
pub mod progress;
pub mod error;
pub mod api;

pub use models::{
    Conf,
    Element,
    ElementCollection,
    ElementKind,
    OrderKey,
    SourceMetadata,
    TitlePageEntry
};

pub use parser::{
    FountainParser,
    FdxParser,
    assign_chapter_order
};

pub use writer::{
    FountainWriter,
    FdxWriter
};

pub use progress::{
    CancellationToken,
    ParseControl,
    ProgressSink,
    ProgressUpdate
};

pub use error::{ParseError, ParseResult};

pub use api::{
    SourceFormat,
    parse_plain_text,
    parse_plain_text_with_conf,
    parse_interchange_xml,
    parse_interchange_xml_with_conf,
    write_plain_text,
    write_interchange_xml,
    detect_format,
    parse_any,
    collection_to_json,
    parse_plain_text_async,
    parse_interchange_xml_async
};

/// 解析Fountain格式文本
///
/// # Arguments
///
/// * `script` - Fountain格式的剧本文本
/// * `config` - 配置对象
///
/// # Returns
///
/// 解析结果；不带进度回调时只有取消会出错，这里不会发生
pub fn parse(script: &str, config: &Conf) -> ParseResult<ElementCollection> {
    FountainParser::with_conf(config.clone()).parse(script, ParseControl::default())
}

use thiserror::Error;

/// 解析错误
///
/// 无法识别的行/段落不是错误，会降级为动作元素。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// XML 格式不正确（或不是 UTF-8），不返回部分结果
    #[error("无法导入，文件可能已损坏: {0}")]
    MalformedInput(String),

    /// 调用方主动取消，已丢弃全部中间状态
    #[error("解析已取消")]
    Cancelled,
}

impl ParseError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ParseError::Cancelled)
    }
}

/// 解析结果
pub type ParseResult<T> = Result<T, ParseError>;

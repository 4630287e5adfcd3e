//! 进度汇报与取消
//!
//! 解析器在批次边界（默认每 100 行/段落）先检查取消标记，再按速率限制
//! 回调进度。回调拿到的是一份独立的快照，不会引用解析器内部状态。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ParseError, ParseResult};
use crate::models::Conf;

/// 进度快照
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub completed_units: i64,
    /// `None` 表示总量未知
    pub total_units: Option<i64>,
    /// 总量未知时同样为 `None`
    pub fraction_completed: Option<f64>,
    pub description: String,
}

impl ProgressUpdate {
    pub fn new(completed_units: i64, total_units: Option<i64>, description: impl Into<String>) -> Self {
        let fraction_completed = total_units.map(|total| {
            if total <= 0 {
                1.0
            } else {
                (completed_units as f64 / total as f64).clamp(0.0, 1.0)
            }
        });
        ProgressUpdate {
            completed_units,
            total_units,
            fraction_completed,
            description: description.into(),
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        self.total_units.is_none()
    }
}

/// 进度回调
///
/// 可能在调用方以外的线程上被调用；回调慢只会拖慢解析，不会影响结果。
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// 取消标记，可以跨线程克隆共享
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// 单次解析调用的可选进度回调和取消标记
#[derive(Clone, Copy, Default)]
pub struct ParseControl<'a> {
    pub progress: Option<&'a dyn ProgressSink>,
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> ParseControl<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl std::fmt::Debug for ParseControl<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseControl")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// 解析器内部使用的进度计数器
pub(crate) struct ProgressReporter<'a> {
    control: ParseControl<'a>,
    description: &'static str,
    total: Option<i64>,
    completed: i64,
    batch_size: i64,
    since_batch: i64,
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(control: ParseControl<'a>, conf: &Conf, description: &'static str) -> Self {
        ProgressReporter {
            control,
            description,
            total: None,
            completed: 0,
            batch_size: conf.progress_batch_size.max(1) as i64,
            since_batch: 0,
            min_interval: Duration::from_millis(conf.progress_min_interval_ms),
            last_emit: None,
        }
    }

    pub(crate) fn set_total(&mut self, total: Option<i64>) {
        self.total = total;
    }

    pub(crate) fn set_completed(&mut self, completed: i64) {
        self.completed = completed;
    }

    pub(crate) fn set_description(&mut self, description: &'static str) {
        self.description = description;
    }

    pub(crate) fn check_cancelled(&self) -> ParseResult<()> {
        match self.control.cancel {
            Some(token) if token.is_cancelled() => {
                log::info!("{}: cancelled after {} units", self.description, self.completed);
                Err(ParseError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    /// 前进若干单位；跨过批次边界时检查取消并尝试汇报
    pub(crate) fn advance(&mut self, units: i64) -> ParseResult<()> {
        self.completed += units;
        self.since_batch += units;
        if self.since_batch >= self.batch_size {
            self.since_batch = 0;
            self.check_cancelled()?;
            self.emit(false);
        }
        Ok(())
    }

    /// 汇报当前进度；`force` 时忽略速率限制
    pub(crate) fn emit(&mut self, force: bool) {
        let Some(sink) = self.control.progress else {
            return;
        };
        let now = Instant::now();
        if !force {
            if let Some(last) = self.last_emit {
                if now.duration_since(last) < self.min_interval {
                    return;
                }
            }
        }
        self.last_emit = Some(now);
        sink.report(ProgressUpdate::new(self.completed, self.total, self.description));
    }

    /// 成功结束，补发一次 100% 的进度
    pub(crate) fn finish(&mut self) {
        if let Some(total) = self.total {
            self.completed = total;
        }
        self.emit(true);
    }
}

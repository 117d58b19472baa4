//! 离屏预览流程的阶段状态机。
//!
//! 阶段只能逐级前进；每次前进都会检查取消信号，失败消息带上已到达的阶段。

use std::fmt;

use super::worker::CancelToken;
use crate::error::PreviewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreviewStage {
    Uninitialized,
    ApartmentResolved,
    HandlerCreated,
    WindowHosted,
    FileInitialized,
    Rendering,
    Captured,
}

impl PreviewStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::ApartmentResolved => "apartment_resolved",
            Self::HandlerCreated => "handler_created",
            Self::WindowHosted => "window_hosted",
            Self::FileInitialized => "file_initialized",
            Self::Rendering => "rendering",
            Self::Captured => "captured",
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Uninitialized => Some(Self::ApartmentResolved),
            Self::ApartmentResolved => Some(Self::HandlerCreated),
            Self::HandlerCreated => Some(Self::WindowHosted),
            Self::WindowHosted => Some(Self::FileInitialized),
            Self::FileInitialized => Some(Self::Rendering),
            Self::Rendering => Some(Self::Captured),
            Self::Captured => None,
        }
    }
}

impl fmt::Display for PreviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 跟踪当前阶段并响应取消。
#[derive(Debug)]
pub struct StageTracker {
    current: PreviewStage,
    cancel: CancelToken,
}

impl StageTracker {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            current: PreviewStage::Uninitialized,
            cancel,
        }
    }

    pub fn current(&self) -> PreviewStage {
        self.current
    }

    /// 已取消时返回 `Timeout`。
    pub fn check_cancelled(&self) -> Result<(), PreviewError> {
        if self.cancel.is_cancelled() {
            return Err(PreviewError::Timeout(format!(
                "预览已取消: stage={}",
                self.current
            )));
        }
        Ok(())
    }

    /// 前进到 `next`，只允许相邻阶段。
    pub fn advance(&mut self, next: PreviewStage) -> Result<(), PreviewError> {
        self.check_cancelled()?;
        if self.current.next() != Some(next) {
            return Err(PreviewError::Unspecified(format!(
                "非法阶段跳转: {} -> {}",
                self.current, next
            )));
        }
        log::debug!("预览阶段: {} -> {}", self.current, next);
        self.current = next;
        Ok(())
    }

    /// 给失败附上当前阶段，保留原有种类。
    pub fn annotate(&self, err: PreviewError) -> PreviewError {
        PreviewError::with_kind(err.kind(), format!("stage={} {}", self.current, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn walks_every_stage_in_order() {
        let mut tracker = StageTracker::new(CancelToken::new());
        let mut stage = PreviewStage::Uninitialized;
        while let Some(next) = stage.next() {
            tracker.advance(next).unwrap();
            stage = next;
        }
        assert_eq!(tracker.current(), PreviewStage::Captured);
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut tracker = StageTracker::new(CancelToken::new());
        let err = tracker.advance(PreviewStage::HandlerCreated).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unspecified);
        assert_eq!(tracker.current(), PreviewStage::Uninitialized);
    }

    #[test]
    fn cancellation_stops_progress_with_timeout() {
        let token = CancelToken::new();
        let mut tracker = StageTracker::new(token.clone());
        tracker.advance(PreviewStage::ApartmentResolved).unwrap();

        token.cancel();
        let err = tracker.advance(PreviewStage::HandlerCreated).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("apartment_resolved"));
    }

    #[test]
    fn annotate_keeps_kind_and_names_stage() {
        let mut tracker = StageTracker::new(CancelToken::new());
        tracker.advance(PreviewStage::ApartmentResolved).unwrap();
        let err = tracker.annotate(PreviewError::ClassNotRegistered(".xyz".to_string()));
        assert_eq!(err.kind(), ErrorKind::ClassNotRegistered);
        assert!(err.to_string().contains("stage=apartment_resolved"));
    }
}

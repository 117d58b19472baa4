//! `IPreviewHandler` 内容预览策略。
//!
//! 当前线程能进入 STA 时就地渲染；已固定为 MTA 时交给专用线程，
//! 在 `preview_timeout_ms` 内等待结果。

use std::time::{Duration, Instant};

use super::preview_host::render_preview;
use super::stage::{PreviewStage, StageTracker};
use super::worker::{run_with_deadline, CancelToken};
use super::{ComApartment, ExtractRequest, Extractor, StrategyKind, StrategyResult};
use crate::bitmap::ImageHandle;
use crate::config::PreviewConfig;
use crate::error::PreviewError;

const WORKER_THREAD_NAME: &str = "shell-preview-sta";

pub struct ContentPreviewExtractor {
    config: PreviewConfig,
}

impl ContentPreviewExtractor {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }
}

/// 进入 STA 后执行完整流程，失败消息附带到达的阶段。
fn run_in_apartment(
    apartment: &ComApartment,
    request: &ExtractRequest,
    config: &PreviewConfig,
    cancel: CancelToken,
) -> Result<ImageHandle, PreviewError> {
    let mut tracker = StageTracker::new(cancel);
    if !apartment.is_sta() {
        return Err(PreviewError::NotInitialized(
            "预览线程无法进入 STA".to_string(),
        ));
    }
    tracker.advance(PreviewStage::ApartmentResolved)?;
    render_preview(request, config, &mut tracker).map_err(|e| tracker.annotate(e))
}

impl Extractor<ImageHandle> for ContentPreviewExtractor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ContentPreview
    }

    fn produce(&self, request: &ExtractRequest) -> Result<StrategyResult<ImageHandle>, PreviewError> {
        request.validate()?;
        let started = Instant::now();

        let apartment = ComApartment::enter()?;
        let handle = if apartment.is_sta() {
            run_in_apartment(&apartment, request, &self.config, CancelToken::new())?
        } else {
            drop(apartment);
            log::debug!("调用线程为 MTA，改用专用 STA 线程渲染预览");

            let request = request.clone();
            let config = self.config.clone();
            run_with_deadline(
                WORKER_THREAD_NAME,
                Duration::from_millis(self.config.preview_timeout_ms),
                move |cancel| {
                    let apartment = ComApartment::enter()?;
                    run_in_apartment(&apartment, &request, &config, cancel)
                },
            )?
        };

        log::debug!(
            "内容预览完成: {}x{} elapsed={}ms",
            handle.width(),
            handle.height(),
            started.elapsed().as_millis()
        );
        Ok(StrategyResult::new(self.kind(), handle))
    }
}

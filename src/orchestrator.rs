//! # 回退编排（orchestrator）
//!
//! ## 设计思路
//!
//! 每种操作（缩略图 / 预览 / 图标）对应一张固定的策略顺序表，编排器按表逐个尝试，
//! 第一个成功即返回；全部失败时返回**最后一个**失败。顺序是数据而不是分支代码，
//! 因而可以脱离 Shell 单独测试。
//!
//! 缩略图拿到位图后，再按源媒体真实宽高比做左上角裁剪。裁剪失败一律放行原图：
//! 宽高比略有偏差好过没有图。
//!
//! ## 实现思路
//!
//! - `Orchestrator<I>` 对图像类型泛型，测试中用假策略替代真实 Shell 调用。
//! - `compute_aspect_crop` 为纯几何计算；`apply_aspect_crop` 接收裁剪闭包。

use crate::error::PreviewError;
use crate::metadata::MediaDimensions;
use crate::strategy::{ExtractRequest, Extractor, StrategyKind, StrategyResult};

/// 调用方请求的操作种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Thumbnail,
    Preview,
    Icon,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Preview => "preview",
            Self::Icon => "icon",
        }
    }
}

const THUMBNAIL_CHAIN: &[StrategyKind] = &[
    StrategyKind::ContentPreview,
    StrategyKind::ImageFactory,
    StrategyKind::ThumbnailCache,
    StrategyKind::ThumbnailProvider,
    StrategyKind::ExtractImage,
];

// 旧式提取优先，其余同缩略图链；不重复尝试 ExtractImage
const PREVIEW_CHAIN: &[StrategyKind] = &[
    StrategyKind::ExtractImage,
    StrategyKind::ContentPreview,
    StrategyKind::ImageFactory,
    StrategyKind::ThumbnailCache,
    StrategyKind::ThumbnailProvider,
];

const ICON_CHAIN: &[StrategyKind] = &[StrategyKind::ImageFactory];

/// 每种操作的策略尝试顺序。
pub fn chain_for(operation: OperationKind) -> &'static [StrategyKind] {
    match operation {
        OperationKind::Thumbnail => THUMBNAIL_CHAIN,
        OperationKind::Preview => PREVIEW_CHAIN,
        OperationKind::Icon => ICON_CHAIN,
    }
}

/// 持有已注册策略并按顺序表执行。
pub struct Orchestrator<I> {
    extractors: Vec<Box<dyn Extractor<I>>>,
}

impl<I> Default for Orchestrator<I> {
    fn default() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }
}

impl<I> Orchestrator<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册策略；同种类的旧策略被替换。
    pub fn register(&mut self, extractor: Box<dyn Extractor<I>>) -> &mut Self {
        let kind = extractor.kind();
        self.extractors.retain(|existing| existing.kind() != kind);
        self.extractors.push(extractor);
        self
    }

    pub fn with(mut self, extractor: Box<dyn Extractor<I>>) -> Self {
        self.register(extractor);
        self
    }

    fn find(&self, kind: StrategyKind) -> Option<&dyn Extractor<I>> {
        self.extractors
            .iter()
            .find(|extractor| extractor.kind() == kind)
            .map(|extractor| extractor.as_ref())
    }

    /// 按 `operation` 的顺序表尝试，返回第一个成功或最后一个失败。
    pub fn run_chain(
        &self,
        operation: OperationKind,
        request: &ExtractRequest,
    ) -> Result<StrategyResult<I>, PreviewError> {
        let mut last_error: Option<PreviewError> = None;

        for &kind in chain_for(operation) {
            let Some(extractor) = self.find(kind) else {
                continue;
            };

            match extractor.produce(request) {
                Ok(result) => {
                    log::debug!(
                        "{} 成功: strategy={} path={}",
                        operation.as_str(),
                        kind,
                        request.path.display()
                    );
                    return Ok(result);
                }
                Err(e) => {
                    log::debug!(
                        "{} 策略失败，尝试下一个: strategy={} kind={:?} err={}",
                        operation.as_str(),
                        kind,
                        e.kind(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            PreviewError::UnsupportedOperation(format!(
                "{} 没有可用的提取策略",
                operation.as_str()
            ))
        }))
    }
}

/// 在边长 `requested` 的正方形内保持源宽高比的裁剪尺寸；正方形源返回 `None`。
pub fn compute_aspect_crop(requested: u32, media: MediaDimensions) -> Option<(u32, u32)> {
    let s = requested as u64;
    let (w, h) = (media.width as u64, media.height as u64);

    if w > h {
        let height = (s * h / w).max(1) as u32;
        Some((requested, height))
    } else if h > w {
        let width = (s * w / h).max(1) as u32;
        Some((width, requested))
    } else {
        None
    }
}

/// 按源媒体宽高比裁剪；任何失败都记录后返回原图。
pub fn apply_aspect_crop<I, F>(
    image: I,
    requested: u32,
    media: Option<MediaDimensions>,
    crop: F,
) -> I
where
    F: FnOnce(&I, u32, u32) -> Result<I, PreviewError>,
{
    let Some(media) = media else {
        log::debug!("源媒体尺寸不可用，保留原图");
        return image;
    };
    let Some((width, height)) = compute_aspect_crop(requested, media) else {
        return image;
    };

    log::debug!(
        "宽高比裁剪: media={}x{} crop={}x{}",
        media.width,
        media.height,
        width,
        height
    );
    match crop(&image, width, height) {
        Ok(cropped) => cropped,
        Err(e) => {
            log::warn!("宽高比裁剪失败，保留原图: {}", e);
            image
        }
    }
}

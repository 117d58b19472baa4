//! `ShellPreview` 门面：缩略图 / 预览 / 图标 / 保存 / 释放。
//!
//! 构造时获取运行时守卫并注册五种策略；之后每次调用都是同步的，
//! 单次请求内策略严格串行执行。

use std::path::Path;
use std::time::Instant;

use crate::bitmap::{self, gdi, ImageHandle};
use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::metadata;
use crate::orchestrator::{apply_aspect_crop, OperationKind, Orchestrator};
use crate::runtime::{self, RuntimeGuard};
use crate::strategy::{
    ContentPreviewExtractor, ExtractImageExtractor, ExtractRequest, ImageFactoryExtractor,
    ThumbnailCacheExtractor, ThumbnailProviderExtractor,
};

pub struct ShellPreview {
    config: PreviewConfig,
    orchestrator: Orchestrator<ImageHandle>,
    _runtime: RuntimeGuard,
}

impl ShellPreview {
    /// 校验配置并启动图形子系统；失败在这里暴露，而不是在首次提取时。
    pub fn new(config: PreviewConfig) -> Result<Self, PreviewError> {
        config.validate()?;
        let runtime = runtime::acquire()?;

        let orchestrator = Orchestrator::new()
            .with(Box::new(ThumbnailProviderExtractor::new(config.clone())))
            .with(Box::new(ExtractImageExtractor::new(config.clone())))
            .with(Box::new(ThumbnailCacheExtractor::new(config.clone())))
            .with(Box::new(ImageFactoryExtractor::new(config.clone())))
            .with(Box::new(ContentPreviewExtractor::new(config.clone())));

        Ok(Self {
            config,
            orchestrator,
            _runtime: runtime,
        })
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    fn ensure_ready(&self) -> Result<(), PreviewError> {
        if !runtime::is_initialized() {
            return Err(PreviewError::NotInitialized("图形子系统未启动".to_string()));
        }
        Ok(())
    }

    fn run(
        &self,
        operation: OperationKind,
        request: &ExtractRequest,
    ) -> Result<ImageHandle, PreviewError> {
        self.ensure_ready()?;
        request.validate()?;

        let started = Instant::now();
        let result = self.orchestrator.run_chain(operation, request)?;
        log::info!(
            "{} 提取成功: strategy={} size={}x{} alpha={} elapsed={}ms",
            operation.as_str(),
            result.strategy,
            result.image.width(),
            result.image.height(),
            result.image.alpha_mode().as_str(),
            started.elapsed().as_millis()
        );
        Ok(result.image)
    }

    /// 缩略图链，成功后按源媒体宽高比裁剪。
    pub fn get_thumbnail(&self, path: impl AsRef<Path>, size: u32) -> Result<ImageHandle, PreviewError> {
        let request = ExtractRequest::square(path.as_ref(), size);
        let image = self.run(OperationKind::Thumbnail, &request)?;

        if !self.config.aspect_crop {
            return Ok(image);
        }

        let media = metadata::probe(&request.path);
        let image = apply_aspect_crop(image, size, media, |raw, width, height| {
            gdi::crop_top_left(raw, width, height)
        });
        log::debug!("缩略图最终尺寸: {}x{}", image.width(), image.height());
        Ok(image)
    }

    /// 预览链，不裁剪。
    pub fn get_preview(
        &self,
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
    ) -> Result<ImageHandle, PreviewError> {
        let request = ExtractRequest::sized(path.as_ref(), width, height);
        self.run(OperationKind::Preview, &request)
    }

    /// 只用 image-factory：先缩略图，失败后允许类型图标。
    pub fn get_icon(&self, path: impl AsRef<Path>, size: u32) -> Result<ImageHandle, PreviewError> {
        let request = ExtractRequest::square(path.as_ref(), size);
        self.run(OperationKind::Icon, &request)
    }

    pub fn save_to_file(&self, handle: &ImageHandle, output: impl AsRef<Path>) -> Result<(), PreviewError> {
        self.ensure_ready()?;
        bitmap::save_to_file(handle, output.as_ref())
    }

    /// 释放句柄。句柄被消费，重复释放无法通过编译。
    pub fn release(&self, handle: ImageHandle) {
        handle.release();
    }
}

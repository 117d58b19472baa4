//! # 提取策略模块（strategy）
//!
//! ## 设计思路
//!
//! 五种 Shell 提取机制各自包装一个系统接口，请求形态与失败方式各不相同，
//! 但对编排层只暴露同一个能力：[`Extractor::produce`]。编排层按表格顺序尝试，
//! 不关心某个策略内部用的是哪套 COM 接口。
//!
//! - `thumbnail_provider`：`IThumbnailProvider`
//! - `extract_image`：`IExtractImage`（旧式 Shell 扩展）
//! - `thumbnail_cache`：`IThumbnailCache`，返回共享位图，需先复制
//! - `image_factory`：`IShellItemImageFactory`，先只要缩略图，失败再允许图标
//! - `content_preview`：`IPreviewHandler` + 离屏窗口截图（`preview_host`）
//!
//! ## 实现思路
//!
//! - `Extractor<I>` 以图像类型为参数，编排策略可用假实现在任意平台测试。
//! - 每个策略在调用 Shell 之前先做路径校验（空路径 → `InvalidArgument`，不存在 → `NotFound`）。
//! - `worker` / `stage` 为纯逻辑，负责专用线程超时与预览阶段跟踪。

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PreviewError;

pub mod stage;
pub mod worker;

#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
mod content_preview;
#[cfg(target_os = "windows")]
mod extract_image;
#[cfg(target_os = "windows")]
mod image_factory;
#[cfg(target_os = "windows")]
mod preview_host;
#[cfg(target_os = "windows")]
mod thumbnail_cache;
#[cfg(target_os = "windows")]
mod thumbnail_provider;

#[cfg(target_os = "windows")]
pub(crate) use com::{create_shell_item, ComApartment};
#[cfg(target_os = "windows")]
pub use content_preview::ContentPreviewExtractor;
#[cfg(target_os = "windows")]
pub use extract_image::ExtractImageExtractor;
#[cfg(target_os = "windows")]
pub use image_factory::ImageFactoryExtractor;
#[cfg(target_os = "windows")]
pub use thumbnail_cache::ThumbnailCacheExtractor;
#[cfg(target_os = "windows")]
pub use thumbnail_provider::ThumbnailProviderExtractor;

/// 提取机制种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    ThumbnailProvider,
    ExtractImage,
    ThumbnailCache,
    ImageFactory,
    ContentPreview,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        Self::ThumbnailProvider,
        Self::ExtractImage,
        Self::ThumbnailCache,
        Self::ImageFactory,
        Self::ContentPreview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThumbnailProvider => "thumbnail_provider",
            Self::ExtractImage => "extract_image",
            Self::ThumbnailCache => "thumbnail_cache",
            Self::ImageFactory => "image_factory",
            Self::ContentPreview => "content_preview",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次提取请求，整个请求期间不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl ExtractRequest {
    /// 正方形请求（缩略图 / 图标）。
    pub fn square(path: impl Into<PathBuf>, size: u32) -> Self {
        Self {
            path: path.into(),
            width: size,
            height: size,
        }
    }

    /// 指定宽高的请求（预览）。
    pub fn sized(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }

    /// 只接受单边尺寸的接口使用的边长。
    pub fn edge(&self) -> u32 {
        self.width.min(self.height)
    }

    /// 调用 Shell 之前的参数与文件存在性检查。
    pub fn validate(&self) -> Result<(), PreviewError> {
        validate_path(&self.path)?;
        if self.width == 0 || self.height == 0 {
            return Err(PreviewError::InvalidArgument(format!(
                "请求尺寸无效: {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_path(path: &Path) -> Result<(), PreviewError> {
    if path.as_os_str().is_empty() {
        return Err(PreviewError::InvalidArgument("文件路径为空".to_string()));
    }
    if !path.exists() {
        return Err(PreviewError::NotFound(path.display().to_string()));
    }
    Ok(())
}

/// 策略成功时的产出，附带是哪种机制产出的。
#[derive(Debug)]
pub struct StrategyResult<I> {
    pub strategy: StrategyKind,
    pub image: I,
}

impl<I> StrategyResult<I> {
    pub fn new(strategy: StrategyKind, image: I) -> Self {
        Self { strategy, image }
    }
}

/// 提取能力：给定请求，产出一张图或一个失败。
pub trait Extractor<I> {
    fn kind(&self) -> StrategyKind;

    fn produce(&self, request: &ExtractRequest) -> Result<StrategyResult<I>, PreviewError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn edge_is_shorter_side() {
        assert_eq!(ExtractRequest::sized("a", 300, 200).edge(), 200);
        assert_eq!(ExtractRequest::square("a", 128).edge(), 128);
    }

    #[test]
    fn empty_path_is_invalid_argument() {
        let err = ExtractRequest::square("", 64).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExtractRequest::square(dir.path().join("nope.txt"), 64)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn zero_size_is_invalid_argument() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = ExtractRequest::sized(file.path(), 0, 10).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(ExtractRequest::square(file.path(), 10).validate().is_ok());
    }

    #[test]
    fn strategy_names_are_unique() {
        let names: std::collections::HashSet<_> =
            StrategyKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), StrategyKind::ALL.len());
    }
}

//! `IThumbnailCache`：系统缩略图缓存。
//!
//! 返回的是缓存持有的共享位图，必须在 `ISharedBitmap` 释放前复制成独占位图。

use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER};
use windows::Win32::UI::Shell::{
    ISharedBitmap, IThumbnailCache, LocalThumbnailCache, WTS_EXTRACT,
};

use super::{create_shell_item, ComApartment, ExtractRequest, Extractor, StrategyKind, StrategyResult};
use crate::bitmap::{AlphaMode, ImageHandle, RawBitmap, SharedBitmap};
use crate::config::PreviewConfig;
use crate::error::PreviewError;

pub struct ThumbnailCacheExtractor {
    config: PreviewConfig,
}

impl ThumbnailCacheExtractor {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }
}

impl Extractor<ImageHandle> for ThumbnailCacheExtractor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ThumbnailCache
    }

    fn produce(&self, request: &ExtractRequest) -> Result<StrategyResult<ImageHandle>, PreviewError> {
        request.validate()?;
        let _apartment = ComApartment::enter()?;

        let cache: IThumbnailCache =
            unsafe { CoCreateInstance(&LocalThumbnailCache, None, CLSCTX_INPROC_SERVER) }
                .map_err(|e| PreviewError::win32("CoCreateInstance(LocalThumbnailCache)", &e))?;
        let item = create_shell_item(&request.path)?;

        let mut shared: Option<ISharedBitmap> = None;
        unsafe {
            cache.GetThumbnail(&item, request.edge(), WTS_EXTRACT, Some(&mut shared as *mut _), None, None)
        }
        .map_err(|e| PreviewError::win32("IThumbnailCache::GetThumbnail", &e))?;

        let shared = shared.ok_or_else(|| {
            PreviewError::UnsupportedOperation("IThumbnailCache 未返回共享位图".to_string())
        })?;

        let bitmap = unsafe { shared.GetSharedBitmap() }
            .map_err(|e| PreviewError::win32("ISharedBitmap::GetSharedBitmap", &e))?;
        let reported_size = unsafe { shared.GetSize() }
            .ok()
            .filter(|size| size.cx > 0 && size.cy > 0)
            .map(|size| (size.cx as u32, size.cy as u32));
        let alpha = unsafe { shared.GetFormat() }
            .map(|format| AlphaMode::from_wts(format.0))
            .unwrap_or(AlphaMode::Unknown);

        log::debug!(
            "IThumbnailCache 返回共享位图: size={:?} alpha={}",
            reported_size,
            alpha.as_str()
        );

        let borrowed = unsafe { SharedBitmap::new(&shared, bitmap, reported_size, alpha) };
        let handle = RawBitmap::Borrowed(borrowed).into_owned(&self.config)?;
        Ok(StrategyResult::new(self.kind(), handle))
    }
}

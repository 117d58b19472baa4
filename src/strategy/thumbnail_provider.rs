//! `IThumbnailProvider`：直接向该类型注册的缩略图处理器要位图。

use windows::Win32::Graphics::Gdi::HBITMAP;
use windows::Win32::UI::Shell::{BHID_ThumbnailHandler, IThumbnailProvider, WTS_ALPHATYPE};

use super::{create_shell_item, ComApartment, ExtractRequest, Extractor, StrategyKind, StrategyResult};
use crate::bitmap::{AlphaMode, ImageHandle, RawBitmap};
use crate::config::PreviewConfig;
use crate::error::PreviewError;

pub struct ThumbnailProviderExtractor {
    config: PreviewConfig,
}

impl ThumbnailProviderExtractor {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }
}

impl Extractor<ImageHandle> for ThumbnailProviderExtractor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ThumbnailProvider
    }

    fn produce(&self, request: &ExtractRequest) -> Result<StrategyResult<ImageHandle>, PreviewError> {
        request.validate()?;
        let _apartment = ComApartment::enter()?;

        let item = create_shell_item(&request.path)?;
        let provider: IThumbnailProvider = unsafe { item.BindToHandler(None, &BHID_ThumbnailHandler) }
            .map_err(|e| PreviewError::win32("BindToHandler(ThumbnailHandler)", &e))?;

        let mut bitmap = HBITMAP::default();
        let mut alpha = WTS_ALPHATYPE::default();
        unsafe { provider.GetThumbnail(request.edge(), &mut bitmap, &mut alpha) }
            .map_err(|e| PreviewError::win32("IThumbnailProvider::GetThumbnail", &e))?;

        let alpha = AlphaMode::from_wts(alpha.0);
        log::debug!("IThumbnailProvider 返回位图: alpha={}", alpha.as_str());

        let handle = unsafe { ImageHandle::from_raw(bitmap, 0, 0, 0, alpha)? };
        let handle = RawBitmap::Owned(handle).into_owned(&self.config)?;
        Ok(StrategyResult::new(self.kind(), handle))
    }
}

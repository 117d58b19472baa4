//! `IExtractImage`：旧式 Shell 扩展的提取接口。

use windows::Win32::Foundation::{E_PENDING, SIZE};
use windows::Win32::UI::Shell::{BHID_SFUIObject, IExtractImage, IEIFLAG_OFFLINE, IEIFLAG_SCREEN};

use super::{create_shell_item, ComApartment, ExtractRequest, Extractor, StrategyKind, StrategyResult};
use crate::bitmap::{AlphaMode, ImageHandle, RawBitmap};
use crate::config::PreviewConfig;
use crate::error::PreviewError;

const MAX_PATH: usize = 260;
const COLOR_DEPTH: u32 = 32;

pub struct ExtractImageExtractor {
    config: PreviewConfig,
}

impl ExtractImageExtractor {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }
}

impl Extractor<ImageHandle> for ExtractImageExtractor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExtractImage
    }

    fn produce(&self, request: &ExtractRequest) -> Result<StrategyResult<ImageHandle>, PreviewError> {
        request.validate()?;
        let _apartment = ComApartment::enter()?;

        let item = create_shell_item(&request.path)?;
        let extractor: IExtractImage = unsafe { item.BindToHandler(None, &BHID_SFUIObject) }
            .map_err(|e| PreviewError::win32("BindToHandler(SFUIObject)", &e))?;

        let size = SIZE {
            cx: request.width as i32,
            cy: request.height as i32,
        };
        let mut location = [0u16; MAX_PATH];
        let mut priority = 0u32;
        let mut flags = IEIFLAG_SCREEN | IEIFLAG_OFFLINE;

        match unsafe {
            extractor.GetLocation(&mut location, Some(&mut priority as *mut u32), &size, COLOR_DEPTH, &mut flags)
        } {
            Ok(()) => {}
            // 异步提取：仍可直接调用 Extract
            Err(e) if e.code() == E_PENDING => log::debug!("IExtractImage::GetLocation 返回 E_PENDING"),
            Err(e) => return Err(PreviewError::win32("IExtractImage::GetLocation", &e)),
        }

        let bitmap = unsafe { extractor.Extract() }
            .map_err(|e| PreviewError::win32("IExtractImage::Extract", &e))?;

        let handle = unsafe { ImageHandle::from_raw(bitmap, 0, 0, 0, AlphaMode::Unknown)? };
        let handle = RawBitmap::Owned(handle).into_owned(&self.config)?;
        Ok(StrategyResult::new(self.kind(), handle))
    }
}

//! `IShellItemImageFactory`：先只要缩略图，失败后允许退化为类型图标。

use windows::Win32::Foundation::SIZE;
use windows::Win32::UI::Shell::{
    IShellItemImageFactory, SIIGBF, SIIGBF_BIGGERSIZEOK, SIIGBF_RESIZETOFIT, SIIGBF_THUMBNAILONLY,
};
use windows::core::Interface;

use super::{create_shell_item, ComApartment, ExtractRequest, Extractor, StrategyKind, StrategyResult};
use crate::bitmap::{AlphaMode, ImageHandle, RawBitmap};
use crate::config::PreviewConfig;
use crate::error::PreviewError;

pub struct ImageFactoryExtractor {
    config: PreviewConfig,
}

impl ImageFactoryExtractor {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }
}

fn get_image(
    factory: &IShellItemImageFactory,
    edge: u32,
    flags: SIIGBF,
) -> Result<ImageHandle, PreviewError> {
    let size = SIZE {
        cx: edge as i32,
        cy: edge as i32,
    };
    let bitmap = unsafe { factory.GetImage(size, flags) }
        .map_err(|e| PreviewError::win32("IShellItemImageFactory::GetImage", &e))?;
    unsafe { ImageHandle::from_raw(bitmap, 0, 0, 0, AlphaMode::Unknown) }
}

impl Extractor<ImageHandle> for ImageFactoryExtractor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImageFactory
    }

    fn produce(&self, request: &ExtractRequest) -> Result<StrategyResult<ImageHandle>, PreviewError> {
        request.validate()?;
        let _apartment = ComApartment::enter()?;

        let item = create_shell_item(&request.path)?;
        let factory: IShellItemImageFactory = item
            .cast()
            .map_err(|e| PreviewError::win32("QueryInterface(IShellItemImageFactory)", &e))?;

        let base = SIIGBF_RESIZETOFIT | SIIGBF_BIGGERSIZEOK;
        let handle = match get_image(&factory, request.edge(), base | SIIGBF_THUMBNAILONLY) {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("仅缩略图模式失败，允许图标重试: {}", e);
                get_image(&factory, request.edge(), base)?
            }
        };

        let handle = RawBitmap::Owned(handle).into_owned(&self.config)?;
        Ok(StrategyResult::new(self.kind(), handle))
    }
}

//! 位图所有权模型
//!
//! - [`ImageHandle`]：独占 `HBITMAP`，`release` 或 `Drop` 时删除，且只删除一次。
//! - [`SharedBitmap`]：借用缓存持有的 `HBITMAP`，生命周期绑定到来源 `ISharedBitmap`。
//! - [`RawBitmap`]：策略返回的原始位图；只有 `into_owned` 能把借用位图变为可跨组件传递的句柄。

use std::marker::PhantomData;

use windows::Win32::Graphics::Gdi::{DeleteObject, HBITMAP};
use windows::Win32::UI::Shell::ISharedBitmap;

use super::{gdi, AlphaMode};
use crate::config::PreviewConfig;
use crate::error::PreviewError;

/// 独占的 GDI 位图句柄及其几何信息。
#[derive(Debug)]
pub struct ImageHandle {
    bitmap: HBITMAP,
    width: u32,
    height: u32,
    bit_depth: u16,
    alpha: AlphaMode,
}

// GDI 位图句柄在进程内全局有效，可在线程间转移。
unsafe impl Send for ImageHandle {}

impl ImageHandle {
    /// 接管 `bitmap` 的所有权。空句柄返回 `InvalidArgument`。
    ///
    /// # Safety
    ///
    /// `bitmap` 必须是调用方独占、尚未删除的位图句柄。
    pub(crate) unsafe fn from_raw(
        bitmap: HBITMAP,
        width: u32,
        height: u32,
        bit_depth: u16,
        alpha: AlphaMode,
    ) -> Result<Self, PreviewError> {
        if bitmap.is_invalid() {
            return Err(PreviewError::InvalidArgument("位图句柄为空".to_string()));
        }
        Ok(Self {
            bitmap,
            width,
            height,
            bit_depth,
            alpha,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha
    }

    /// 底层句柄，仅在本对象存活期间有效。
    pub fn as_raw(&self) -> HBITMAP {
        self.bitmap
    }

    pub(crate) fn set_geometry(&mut self, width: u32, height: u32, bit_depth: u16) {
        self.width = width;
        self.height = height;
        self.bit_depth = bit_depth;
    }

    /// 显式释放。消费 `self`，因此同一句柄不可能被释放两次。
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        if !self.bitmap.is_invalid() {
            unsafe {
                let _ = DeleteObject(self.bitmap.into());
            }
        }
    }
}

/// 缓存持有的共享位图。不得删除，也不得在来源释放后使用。
#[derive(Debug)]
pub struct SharedBitmap<'a> {
    bitmap: HBITMAP,
    reported_size: Option<(u32, u32)>,
    alpha: AlphaMode,
    _owner: PhantomData<&'a ISharedBitmap>,
}

impl<'a> SharedBitmap<'a> {
    /// # Safety
    ///
    /// `bitmap` 必须来自 `owner.GetSharedBitmap()`。
    pub(crate) unsafe fn new(
        _owner: &'a ISharedBitmap,
        bitmap: HBITMAP,
        reported_size: Option<(u32, u32)>,
        alpha: AlphaMode,
    ) -> Self {
        Self {
            bitmap,
            reported_size,
            alpha,
            _owner: PhantomData,
        }
    }

    pub fn as_raw(&self) -> HBITMAP {
        self.bitmap
    }

    /// `ISharedBitmap::GetSize` 报告的尺寸（有效时）。
    pub fn reported_size(&self) -> Option<(u32, u32)> {
        self.reported_size.filter(|&(w, h)| w > 0 && h > 0)
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha
    }
}

/// 策略产出的原始位图。
#[derive(Debug)]
pub enum RawBitmap<'a> {
    Owned(ImageHandle),
    Borrowed(SharedBitmap<'a>),
}

impl RawBitmap<'_> {
    /// 归一化为独占、尺寸可信的句柄。
    pub fn into_owned(self, config: &PreviewConfig) -> Result<ImageHandle, PreviewError> {
        match self {
            Self::Owned(handle) => gdi::verify_dimensions(handle, config),
            Self::Borrowed(shared) => gdi::copy_shared(&shared, config),
        }
    }
}

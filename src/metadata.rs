//! 源媒体尺寸探测
//!
//! 读取 Shell 属性（图片宽高，退而取视频帧宽高），只用于计算保持宽高比的裁剪矩形。
//! 拿不到尺寸不算失败。

/// 源媒体（而非提取位图）的像素尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDimensions {
    pub width: u32,
    pub height: u32,
}

impl MediaDimensions {
    /// 宽或高为 0 时返回 `None`。
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

#[cfg(target_os = "windows")]
pub use win32::probe;

#[cfg(target_os = "windows")]
mod win32 {
    use std::path::Path;

    use windows::core::Interface;
    use windows::Win32::Storage::EnhancedStorage::{
        PKEY_Image_HorizontalSize, PKEY_Image_VerticalSize, PKEY_Video_FrameHeight,
        PKEY_Video_FrameWidth,
    };
    use windows::Win32::UI::Shell::IShellItem2;

    use super::MediaDimensions;
    use crate::strategy::{create_shell_item, ComApartment};

    /// 探测 `path` 的源媒体尺寸；任何失败都返回 `None`。
    pub fn probe(path: &Path) -> Option<MediaDimensions> {
        let _apartment = ComApartment::enter().ok()?;
        let item = create_shell_item(path).ok()?;
        let item: IShellItem2 = item.cast().ok()?;

        let read_pair = |width_key, height_key| {
            let width = unsafe { item.GetUInt32(width_key) }.ok()?;
            let height = unsafe { item.GetUInt32(height_key) }.ok()?;
            MediaDimensions::new(width, height)
        };

        let dims = read_pair(
            &PKEY_Image_HorizontalSize as *const _,
            &PKEY_Image_VerticalSize as *const _,
        )
        .or_else(|| {
            read_pair(
                &PKEY_Video_FrameWidth as *const _,
                &PKEY_Video_FrameHeight as *const _,
            )
        });

        match dims {
            Some(d) => log::debug!("源媒体尺寸: {}x{}", d.width, d.height),
            None => log::debug!("源媒体尺寸不可用: {}", path.display()),
        }
        dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_media_is_absent() {
        assert_eq!(MediaDimensions::new(0, 10), None);
        assert_eq!(MediaDimensions::new(10, 0), None);
        assert_eq!(
            MediaDimensions::new(1920, 1080),
            Some(MediaDimensions {
                width: 1920,
                height: 1080
            })
        );
    }
}

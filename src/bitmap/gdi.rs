//! GDI 辅助：DC 守卫、尺寸恢复、位图复制与裁剪、像素读取、窗口截图。
//!
//! 所有 DC 与选入对象都由 RAII 守卫持有，任何错误路径上都会按创建的逆序归还。

use std::ffi::c_void;

use windows::Win32::Foundation::{COLORREF, HWND, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleDC, CreateDIBSection, CreateSolidBrush, DeleteDC, DeleteObject,
    FillRect, GetCurrentObject, GetDC, GetDIBits, GetObjectW, ReleaseDC, SelectObject, BITMAP,
    BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ, OBJ_BITMAP,
    SRCCOPY,
};
use windows::Win32::Storage::Xps::{PrintWindow, PRINT_WINDOW_FLAGS};

use super::handle::{ImageHandle, SharedBitmap};
use super::{bmp, AlphaMode};
use crate::config::PreviewConfig;
use crate::error::PreviewError;

/// 捕获 DirectComposition 内容（windows-rs 未导出该常量）。
const PW_RENDERFULLCONTENT: PRINT_WINDOW_FLAGS = PRINT_WINDOW_FLAGS(2);

const WHITE: COLORREF = COLORREF(0x00FF_FFFF);

// ─── DC 守卫 ────────────────────────────────────────────────────────────────

pub(crate) struct ScreenDc(HDC);

impl ScreenDc {
    pub(crate) fn new() -> Result<Self, PreviewError> {
        let hdc = unsafe { GetDC(None) };
        if hdc.is_invalid() {
            return Err(PreviewError::Unspecified("GetDC 失败".to_string()));
        }
        Ok(Self(hdc))
    }

    pub(crate) fn hdc(&self) -> HDC {
        self.0
    }
}

impl Drop for ScreenDc {
    fn drop(&mut self) {
        unsafe {
            let _ = ReleaseDC(None, self.0);
        }
    }
}

pub(crate) struct MemoryDc(HDC);

impl MemoryDc {
    pub(crate) fn compatible_with(screen: &ScreenDc) -> Result<Self, PreviewError> {
        let hdc = unsafe { CreateCompatibleDC(Some(screen.hdc())) };
        if hdc.is_invalid() {
            return Err(PreviewError::Unspecified("CreateCompatibleDC 失败".to_string()));
        }
        Ok(Self(hdc))
    }

    pub(crate) fn hdc(&self) -> HDC {
        self.0
    }
}

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

/// 选入期间保持对象，析构时恢复原对象。
struct Selection<'a> {
    dc: &'a MemoryDc,
    previous: HGDIOBJ,
}

impl<'a> Selection<'a> {
    fn new(dc: &'a MemoryDc, object: HGDIOBJ) -> Result<Self, PreviewError> {
        let previous = unsafe { SelectObject(dc.hdc(), object) };
        if previous.is_invalid() {
            return Err(PreviewError::Unspecified("SelectObject 失败".to_string()));
        }
        Ok(Self { dc, previous })
    }
}

impl Drop for Selection<'_> {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.dc.hdc(), self.previous);
        }
    }
}

// ─── 尺寸 ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u16,
}

fn geometry_of(object: HGDIOBJ) -> Option<Geometry> {
    if object.is_invalid() {
        return None;
    }
    let mut info = BITMAP::default();
    let written = unsafe {
        GetObjectW(
            object,
            std::mem::size_of::<BITMAP>() as i32,
            Some(&mut info as *mut BITMAP as *mut c_void),
        )
    };
    if written == 0 || info.bmWidth <= 0 || info.bmHeight == 0 {
        return None;
    }
    Some(Geometry {
        width: info.bmWidth as u32,
        height: info.bmHeight.unsigned_abs(),
        bit_depth: info.bmBitsPixel,
    })
}

/// 直接 `GetObject` 查询。
pub(crate) fn query_geometry(bitmap: HBITMAP) -> Option<Geometry> {
    geometry_of(bitmap.into())
}

/// 选入内存 DC 后经由 `GetCurrentObject` 再查询一次。
fn query_geometry_through_dc(bitmap: HBITMAP) -> Option<Geometry> {
    let screen = ScreenDc::new().ok()?;
    let memory = MemoryDc::compatible_with(&screen).ok()?;
    let _selection = Selection::new(&memory, bitmap.into()).ok()?;
    let current = unsafe { GetCurrentObject(memory.hdc(), OBJ_BITMAP) };
    geometry_of(current)
}

/// 依次尝试 `GetObject`、DC 查询；都失败时按配置决定兜底或报错。
fn recover_geometry(
    bitmap: HBITMAP,
    config: &PreviewConfig,
) -> Result<(Geometry, bool), PreviewError> {
    if let Some(geometry) = query_geometry_through_dc(bitmap) {
        log::debug!(
            "通过 DC 恢复位图尺寸: {}x{}",
            geometry.width,
            geometry.height
        );
        return Ok((geometry, false));
    }

    if config.strict_dimensions {
        return Err(PreviewError::Unspecified(
            "无法确定位图尺寸（strict_dimensions 已开启）".to_string(),
        ));
    }

    log::warn!(
        "无法确定位图尺寸，使用 {}x{} 白底替代",
        config.fallback_size,
        config.fallback_size
    );
    Ok((
        Geometry {
            width: config.fallback_size,
            height: config.fallback_size,
            bit_depth: 24,
        },
        true,
    ))
}

// ─── 位图创建与复制 ─────────────────────────────────────────────────────────

fn dib32_info(width: u32, height: u32) -> BITMAPINFO {
    BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width as i32,
            biHeight: -(height as i32),
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// 创建自顶向下的 32 位 DIB section。
fn create_dib32(screen: &ScreenDc, width: u32, height: u32) -> Result<HBITMAP, PreviewError> {
    let info = dib32_info(width, height);
    let mut bits: *mut c_void = std::ptr::null_mut();
    let bitmap = unsafe {
        CreateDIBSection(Some(screen.hdc()), &info, DIB_RGB_COLORS, &mut bits, None, 0)
    }
    .map_err(|e| PreviewError::win32("CreateDIBSection", &e))?;

    if bits.is_null() {
        unsafe {
            let _ = DeleteObject(bitmap.into());
        }
        return Err(PreviewError::Unspecified("CreateDIBSection 未返回像素缓冲".to_string()));
    }
    Ok(bitmap)
}

/// 目标位图的背景处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backdrop {
    /// 不填充，完全由来源覆盖。
    None,
    /// 先填白底，来源小于目标时露出白色。
    White,
    /// 尺寸已替代：白底，来源不可读时直接返回白底位图。
    Substitute,
}

/// 把 `source` 左上角 `width`×`height` 复制进 `target_dc` 当前选入的位图。
fn copy_from(
    screen: &ScreenDc,
    target_dc: &MemoryDc,
    source: HBITMAP,
    width: u32,
    height: u32,
) -> Result<(), PreviewError> {
    let source_dc = MemoryDc::compatible_with(screen)?;
    let _source_sel = Selection::new(&source_dc, source.into())?;
    unsafe {
        BitBlt(
            target_dc.hdc(),
            0,
            0,
            width as i32,
            height as i32,
            Some(source_dc.hdc()),
            0,
            0,
            SRCCOPY,
        )
    }
    .map_err(|e| PreviewError::win32("BitBlt", &e))
}

/// 把 `source` 左上角 `width`×`height` 复制进新的独占位图。
fn blit_into_new(
    source: HBITMAP,
    width: u32,
    height: u32,
    backdrop: Backdrop,
    alpha: AlphaMode,
) -> Result<ImageHandle, PreviewError> {
    // 白底由 FillRect 写出，alpha 平面为 0，只能按 Unknown 解释
    let alpha = match backdrop {
        Backdrop::Substitute => AlphaMode::Unknown,
        _ => alpha,
    };

    let screen = ScreenDc::new()?;
    let target = create_dib32(&screen, width, height)?;
    // 先交给 ImageHandle，后续任何失败都会删除它
    let handle = unsafe { ImageHandle::from_raw(target, width, height, 32, alpha)? };

    let target_dc = MemoryDc::compatible_with(&screen)?;
    let _target_sel = Selection::new(&target_dc, target.into())?;

    if backdrop != Backdrop::None {
        let rect = RECT {
            left: 0,
            top: 0,
            right: width as i32,
            bottom: height as i32,
        };
        unsafe {
            let brush = CreateSolidBrush(WHITE);
            FillRect(target_dc.hdc(), &rect, brush);
            let _ = DeleteObject(brush.into());
        }
    }

    match copy_from(&screen, &target_dc, source, width, height) {
        Ok(()) => {}
        Err(e) if backdrop == Backdrop::Substitute => {
            log::warn!("来源位图不可读，返回 {}x{} 白底位图: {}", width, height, e);
        }
        Err(e) => return Err(e),
    }

    Ok(handle)
}

/// 校验独占位图的尺寸；无效时按恢复流程重建。
pub(crate) fn verify_dimensions(
    mut handle: ImageHandle,
    config: &PreviewConfig,
) -> Result<ImageHandle, PreviewError> {
    if let Some(geometry) = query_geometry(handle.as_raw()) {
        handle.set_geometry(geometry.width, geometry.height, geometry.bit_depth);
        return Ok(handle);
    }

    log::debug!("GetObject 未返回有效尺寸，尝试恢复");
    let (geometry, substituted) = recover_geometry(handle.as_raw(), config)?;
    let backdrop = if substituted {
        Backdrop::Substitute
    } else {
        Backdrop::None
    };
    blit_into_new(
        handle.as_raw(),
        geometry.width,
        geometry.height,
        backdrop,
        handle.alpha_mode(),
    )
}

/// 在来源 `ISharedBitmap` 仍存活时复制为独占位图。
pub(crate) fn copy_shared(
    shared: &SharedBitmap<'_>,
    config: &PreviewConfig,
) -> Result<ImageHandle, PreviewError> {
    let (width, height, backdrop) = if let Some((width, height)) = shared.reported_size() {
        (width, height, Backdrop::White)
    } else if let Some(geometry) = query_geometry(shared.as_raw()) {
        (geometry.width, geometry.height, Backdrop::White)
    } else {
        let (geometry, substituted) = recover_geometry(shared.as_raw(), config)?;
        let backdrop = if substituted {
            Backdrop::Substitute
        } else {
            Backdrop::White
        };
        (geometry.width, geometry.height, backdrop)
    };

    log::debug!(
        "复制共享位图: {}x{} alpha={}",
        width,
        height,
        shared.alpha_mode().as_str()
    );
    // 共享位图小于目标时露出的部分保持白色
    blit_into_new(shared.as_raw(), width, height, backdrop, shared.alpha_mode())
}

/// 裁剪左上角矩形，目标尺寸超出来源时按来源截断。
pub(crate) fn crop_top_left(
    handle: &ImageHandle,
    width: u32,
    height: u32,
) -> Result<ImageHandle, PreviewError> {
    if width == 0 || height == 0 {
        return Err(PreviewError::InvalidArgument(format!(
            "裁剪尺寸无效: {}x{}",
            width, height
        )));
    }
    let width = width.min(handle.width());
    let height = height.min(handle.height());
    blit_into_new(handle.as_raw(), width, height, Backdrop::None, handle.alpha_mode())
}

// ─── 像素读取 ───────────────────────────────────────────────────────────────

/// 读取 32bpp 自顶向下 BGRA 像素。
pub(crate) fn read_bgra32(handle: &ImageHandle) -> Result<Vec<u8>, PreviewError> {
    let (width, height) = (handle.width(), handle.height());
    let mut info = dib32_info(width, height);
    let mut pixels = vec![0u8; width as usize * height as usize * 4];

    let screen = ScreenDc::new()?;
    let lines = unsafe {
        GetDIBits(
            screen.hdc(),
            handle.as_raw(),
            0,
            height,
            Some(pixels.as_mut_ptr() as *mut c_void),
            &mut info,
            DIB_RGB_COLORS,
        )
    };
    if lines == 0 {
        return Err(PreviewError::Encode("GetDIBits(32bpp) 失败".to_string()));
    }
    Ok(pixels)
}

/// 读取 24bpp 自底向上、行按 4 字节对齐的 BGR 像素。
pub(crate) fn read_bgr24_bottom_up(handle: &ImageHandle) -> Result<Vec<u8>, PreviewError> {
    let (width, height) = (handle.width(), handle.height());
    let data_len = bmp::image_size(width, height);
    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width as i32,
            biHeight: height as i32,
            biPlanes: 1,
            biBitCount: 24,
            biCompression: BI_RGB.0,
            biSizeImage: data_len as u32,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut pixels = vec![0u8; data_len];

    let screen = ScreenDc::new()?;
    let lines = unsafe {
        GetDIBits(
            screen.hdc(),
            handle.as_raw(),
            0,
            height,
            Some(pixels.as_mut_ptr() as *mut c_void),
            &mut info,
            DIB_RGB_COLORS,
        )
    };
    if lines == 0 {
        return Err(PreviewError::Encode("GetDIBits(24bpp) 失败".to_string()));
    }
    Ok(pixels)
}

// ─── 窗口截图 ───────────────────────────────────────────────────────────────

/// 以 `PrintWindow(PW_RENDERFULLCONTENT)` 截取窗口客户区内容。
pub(crate) fn capture_window(
    hwnd: HWND,
    width: u32,
    height: u32,
) -> Result<ImageHandle, PreviewError> {
    let screen = ScreenDc::new()?;
    let target = create_dib32(&screen, width, height)?;
    let handle = unsafe { ImageHandle::from_raw(target, width, height, 32, AlphaMode::Straight)? };

    let memory = MemoryDc::compatible_with(&screen)?;
    let _selection = Selection::new(&memory, target.into())?;

    let printed = unsafe { PrintWindow(hwnd, memory.hdc(), PW_RENDERFULLCONTENT) };
    if !printed.as_bool() {
        return Err(PreviewError::Unspecified("PrintWindow 失败".to_string()));
    }
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const RED: COLORREF = COLORREF(0x0000_00FF);
    const BLUE: COLORREF = COLORREF(0x00FF_0000);

    /// 创建 `width`×`height` 的 32 位位图，整体填红，左上角 1×1 填蓝。
    fn marked_bitmap(width: u32, height: u32) -> ImageHandle {
        let screen = ScreenDc::new().unwrap();
        let bitmap = create_dib32(&screen, width, height).unwrap();
        let handle =
            unsafe { ImageHandle::from_raw(bitmap, width, height, 32, AlphaMode::Straight) }.unwrap();

        let memory = MemoryDc::compatible_with(&screen).unwrap();
        let _selection = Selection::new(&memory, bitmap.into()).unwrap();
        fill(&memory, 0, 0, width as i32, height as i32, RED);
        fill(&memory, 0, 0, 1, 1, BLUE);
        handle
    }

    fn fill(dc: &MemoryDc, left: i32, top: i32, right: i32, bottom: i32, color: COLORREF) {
        let rect = RECT {
            left,
            top,
            right,
            bottom,
        };
        unsafe {
            let brush = CreateSolidBrush(color);
            FillRect(dc.hdc(), &rect, brush);
            let _ = DeleteObject(brush.into());
        }
    }

    /// 已删除的位图句柄：`GetObject` 与 `SelectObject` 都会失败。
    fn unreadable_handle(alpha: AlphaMode) -> ImageHandle {
        let screen = ScreenDc::new().unwrap();
        let bitmap = create_dib32(&screen, 4, 4).unwrap();
        unsafe {
            let _ = DeleteObject(bitmap.into());
            ImageHandle::from_raw(bitmap, 0, 0, 0, alpha).unwrap()
        }
    }

    fn bgr_at(bgra: &[u8], width: u32, x: u32, y: u32) -> [u8; 3] {
        let offset = ((y * width + x) * 4) as usize;
        [bgra[offset], bgra[offset + 1], bgra[offset + 2]]
    }

    #[test]
    fn verify_dimensions_keeps_valid_geometry() {
        let source = marked_bitmap(8, 6);
        let raw = source.as_raw();
        let unverified =
            unsafe { ImageHandle::from_raw(raw, 0, 0, 0, AlphaMode::Straight) }.unwrap();
        // 同一句柄只能由一个 ImageHandle 删除
        std::mem::forget(source);

        let verified = verify_dimensions(unverified, &PreviewConfig::default()).unwrap();
        assert_eq!(verified.as_raw(), raw);
        assert_eq!((verified.width(), verified.height()), (8, 6));
        assert_eq!(verified.bit_depth(), 32);
    }

    #[test]
    fn unreadable_bitmap_falls_back_to_white_square() {
        let handle = unreadable_handle(AlphaMode::Premultiplied);
        let config = PreviewConfig::default();

        let fallback = verify_dimensions(handle, &config).unwrap();
        assert_eq!((fallback.width(), fallback.height()), (256, 256));
        assert_eq!(fallback.alpha_mode(), AlphaMode::Unknown);

        let bgra = read_bgra32(&fallback).unwrap();
        assert!(bgra.chunks_exact(4).all(|px| px[..3] == [255, 255, 255]));

        let rgba = crate::bitmap::pixels::to_straight_rgba(&bgra, fallback.alpha_mode());
        assert!(rgba.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn unreadable_bitmap_fails_when_strict() {
        let handle = unreadable_handle(AlphaMode::Unknown);
        let config = PreviewConfig {
            strict_dimensions: true,
            ..PreviewConfig::default()
        };

        let err = verify_dimensions(handle, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unspecified);
    }

    #[test]
    fn crop_returns_requested_top_left_rectangle() {
        let source = marked_bitmap(8, 6);
        let cropped = crop_top_left(&source, 4, 2).unwrap();

        assert_eq!((cropped.width(), cropped.height()), (4, 2));
        assert_eq!(cropped.alpha_mode(), AlphaMode::Straight);
        let bgra = read_bgra32(&cropped).unwrap();
        assert_eq!(bgr_at(&bgra, 4, 0, 0), [255, 0, 0]);
        assert_eq!(bgr_at(&bgra, 4, 3, 1), [0, 0, 255]);
    }

    #[test]
    fn crop_larger_than_source_is_clamped() {
        let source = marked_bitmap(8, 6);
        let cropped = crop_top_left(&source, 20, 3).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (8, 3));

        let err = crop_top_left(&source, 0, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn bgra_readback_is_top_down() {
        let source = marked_bitmap(5, 3);
        let bgra = read_bgra32(&source).unwrap();

        assert_eq!(bgra.len(), 5 * 3 * 4);
        assert_eq!(bgr_at(&bgra, 5, 0, 0), [255, 0, 0]);
        assert_eq!(bgr_at(&bgra, 5, 1, 0), [0, 0, 255]);
        assert_eq!(bgr_at(&bgra, 5, 4, 2), [0, 0, 255]);
    }

    #[test]
    fn bgr24_readback_is_bottom_up_and_padded() {
        let source = marked_bitmap(5, 3);
        let bgr = read_bgr24_bottom_up(&source).unwrap();

        let stride = bmp::row_stride(5);
        assert_eq!(bgr.len(), stride * 3);
        // 图像第 0 行存放在最后一行
        let top = 2 * stride;
        assert_eq!(&bgr[top..top + 3], &[255, 0, 0]);
        assert_eq!(&bgr[top + 3..top + 6], &[0, 0, 255]);
        assert_eq!(&bgr[..3], &[0, 0, 255]);
    }
}

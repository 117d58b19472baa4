//! 像素转换与 PNG 编码
//!
//! GDI 读出的 32 位像素为 BGRA 顺序，且可能是预乘 alpha。PNG 要求直通 alpha，
//! 所以写 PNG 前必须先按 [`AlphaMode`] 反预乘，否则半透明像素颜色会偏暗。

use image::codecs::png::PngEncoder;
use image::ImageEncoder;

use super::AlphaMode;
use crate::error::PreviewError;

/// 反预乘单个颜色通道：`min(255, round(c * 255 / a))`。
#[inline]
fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        return 0;
    }
    let a = alpha as u32;
    ((channel as u32 * 255 + a / 2) / a).min(255) as u8
}

/// 将 BGRA 像素转换为直通 alpha 的 RGBA。
pub fn to_straight_rgba(bgra: &[u8], mode: AlphaMode) -> Vec<u8> {
    let opaque = match mode {
        AlphaMode::Straight => true,
        AlphaMode::Premultiplied => false,
        // 很多处理器返回的 32 位位图 alpha 平面全 0，实际是不透明图像
        AlphaMode::Unknown => bgra.chunks_exact(4).all(|px| px[3] == 0),
    };

    let mut rgba = Vec::with_capacity(bgra.len());
    for px in bgra.chunks_exact(4) {
        let (b, g, r, a) = (px[0], px[1], px[2], px[3]);
        if opaque {
            rgba.extend_from_slice(&[r, g, b, 255]);
        } else if a == 0 {
            rgba.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            rgba.extend_from_slice(&[
                unpremultiply(r, a),
                unpremultiply(g, a),
                unpremultiply(b, a),
                a,
            ]);
        }
    }
    rgba
}

/// 以 `image` 的 `PngEncoder` 编码 RGBA8 像素。
pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, PreviewError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(PreviewError::InvalidArgument(format!(
            "像素缓冲长度不匹配: expected={} actual={}",
            expected,
            rgba.len()
        )));
    }

    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(rgba, width, height, image::ColorType::Rgba8.into())
        .map_err(|e| PreviewError::Encode(format!("PNG 编码失败: {}", e)))?;
    Ok(buf)
}

/// BGRA → 直通 RGBA → PNG 字节。
pub fn bgra_to_png(
    width: u32,
    height: u32,
    bgra: &[u8],
    mode: AlphaMode,
) -> Result<Vec<u8>, PreviewError> {
    let rgba = to_straight_rgba(bgra, mode);
    encode_png(width, height, &rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn half_transparent_pixel_is_not_darkened_after_png_decode() {
        // 预乘前为 (R=128, G=64, B=32, A=128)
        let bgra = [16u8, 32, 64, 128];
        let png = bgra_to_png(1, 1, &bgra, AlphaMode::Premultiplied).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (1, 1));
        assert_eq!(decoded.get_pixel(0, 0).0, [128, 64, 32, 128]);
    }

    #[test]
    fn zero_alpha_plane_with_unknown_mode_is_opaque() {
        let bgra = [10u8, 20, 30, 0, 40, 50, 60, 0];
        let rgba = to_straight_rgba(&bgra, AlphaMode::Unknown);
        assert_eq!(rgba, vec![30, 20, 10, 255, 60, 50, 40, 255]);
    }

    #[test]
    fn unknown_mode_with_partial_alpha_is_unpremultiplied() {
        let bgra = [0u8, 0, 0, 0, 50, 50, 50, 100];
        let rgba = to_straight_rgba(&bgra, AlphaMode::Unknown);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 0]);
        assert_eq!(&rgba[4..8], &[128, 128, 128, 100]);
    }

    #[test]
    fn straight_mode_forces_opaque_alpha() {
        let bgra = [1u8, 2, 3, 77];
        assert_eq!(to_straight_rgba(&bgra, AlphaMode::Straight), vec![3, 2, 1, 255]);
    }

    #[test]
    fn encode_png_rejects_short_buffer() {
        let err = encode_png(2, 2, &[0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    proptest! {
        #[test]
        fn unpremultiplied_channels_never_exceed_255_and_keep_alpha(
            b in any::<u8>(), g in any::<u8>(), r in any::<u8>(), a in 1u8..=255
        ) {
            let rgba = to_straight_rgba(&[b, g, r, a], AlphaMode::Premultiplied);
            prop_assert_eq!(rgba[3], a);
            if a == 255 {
                prop_assert_eq!(&rgba[0..3], &[r, g, b]);
            }
        }

        #[test]
        fn premultiply_then_convert_recovers_color(
            c in any::<u8>(), a in 1u8..=255
        ) {
            let premultiplied = ((c as u32 * a as u32 + 127) / 255) as u8;
            let rgba = to_straight_rgba(&[premultiplied, premultiplied, premultiplied, a], AlphaMode::Premultiplied);
            // 量化误差上界约为 255 / a
            let tolerance = 255 / a as i32 + 1;
            prop_assert!((rgba[0] as i32 - c as i32).abs() <= tolerance);
        }
    }
}

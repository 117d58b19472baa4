//! 输出容器集成测试：BMP / PNG 字节写盘后由 `image` 解码回读。

use std::fs;

use shell_preview::bitmap::{bmp, pixels};
use shell_preview::AlphaMode;

/// 生成自底向上、行按 4 字节对齐的 BGR 像素：上半红，下半蓝。
fn red_over_blue(width: u32, height: u32) -> Vec<u8> {
    let stride = bmp::row_stride(width);
    let mut data = vec![0u8; bmp::image_size(width, height)];
    for stored_row in 0..height as usize {
        // 存储第 0 行是图像最底行
        let visual_row = height as usize - 1 - stored_row;
        let bgr = if visual_row < height as usize / 2 {
            [0, 0, 255]
        } else {
            [255, 0, 0]
        };
        for x in 0..width as usize {
            let offset = stored_row * stride + x * 3;
            data[offset..offset + 3].copy_from_slice(&bgr);
        }
    }
    data
}

#[test]
fn bmp_file_decodes_with_expected_orientation() {
    let (width, height) = (5, 4);
    let bytes = bmp::encode_bgr24(width, height, &red_over_blue(width, height)).unwrap();

    assert_eq!(&bytes[..2], b"BM");
    let declared = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) as usize;
    assert_eq!(declared, bytes.len());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.bmp");
    fs::write(&path, &bytes).unwrap();

    let decoded = image::open(&path).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (width, height));
    assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(decoded.get_pixel(width - 1, height - 1).0, [0, 0, 255]);
}

#[test]
fn bmp_rejects_unpadded_rows() {
    let err = bmp::encode_bgr24(5, 4, &vec![0u8; 5 * 4 * 3]).unwrap_err();
    assert_eq!(err.kind(), shell_preview::ErrorKind::InvalidArgument);
}

#[test]
fn png_keeps_straight_alpha() {
    // 2x1：左像素半透明预乘红，右像素不透明绿
    let bgra = [0, 0, 128, 128, 0, 255, 0, 255];
    let bytes = pixels::bgra_to_png(2, 1, &bgra, AlphaMode::Premultiplied).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    fs::write(&path, &bytes).unwrap();

    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (2, 1));
    assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 128]);
    assert_eq!(decoded.get_pixel(1, 0).0, [0, 255, 0, 255]);
}

//! 24 位 BMP 容器
//!
//! 像素由 `GetDIBits` 以 24bpp、自底向上的行序取出，这里只补上
//! 14 字节文件头与 40 字节信息头。

use crate::error::PreviewError;

pub const FILE_HEADER_LEN: usize = 14;
pub const INFO_HEADER_LEN: usize = 40;
pub const PIXEL_OFFSET: usize = FILE_HEADER_LEN + INFO_HEADER_LEN;

const SIGNATURE: u16 = 0x4D42;

/// 每行字节数，按 4 字节对齐。
pub fn row_stride(width: u32) -> usize {
    ((width as usize * 24 + 31) / 32) * 4
}

/// 像素区总字节数。
pub fn image_size(width: u32, height: u32) -> usize {
    row_stride(width) * height as usize
}

/// 写出完整 BMP 文件字节。`pixels` 为已填充对齐的自底向上 BGR 行。
pub fn encode_bgr24(width: u32, height: u32, pixels: &[u8]) -> Result<Vec<u8>, PreviewError> {
    if width == 0 || height == 0 {
        return Err(PreviewError::InvalidArgument(format!(
            "BMP 尺寸无效: {}x{}",
            width, height
        )));
    }

    let data_len = image_size(width, height);
    if pixels.len() != data_len {
        return Err(PreviewError::InvalidArgument(format!(
            "BMP 像素长度不匹配: expected={} actual={}",
            data_len,
            pixels.len()
        )));
    }

    let file_size = PIXEL_OFFSET + data_len;
    let file_size_u32 = u32::try_from(file_size)
        .map_err(|_| PreviewError::Encode(format!("BMP 文件过大: {} 字节", file_size)))?;

    let mut out = Vec::with_capacity(file_size);

    // BITMAPFILEHEADER
    out.extend_from_slice(&SIGNATURE.to_le_bytes());
    out.extend_from_slice(&file_size_u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(PIXEL_OFFSET as u32).to_le_bytes());

    // BITMAPINFOHEADER，正高度表示自底向上
    out.extend_from_slice(&(INFO_HEADER_LEN as u32).to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // BI_RGB
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    out.extend_from_slice(pixels);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_padded_to_four_bytes() {
        assert_eq!(row_stride(1), 4);
        assert_eq!(row_stride(3), 12);
        assert_eq!(row_stride(5), 16);
        assert_eq!(row_stride(256), 768);
    }

    #[test]
    fn headers_declare_signature_size_and_offset() {
        let pixels = vec![0u8; image_size(3, 2)];
        let bytes = encode_bgr24(3, 2, &pixels).unwrap();

        assert_eq!(&bytes[0..2], b"BM");
        let declared = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) as usize;
        assert_eq!(declared, 54 + 12 * 2);
        assert_eq!(declared, bytes.len());
        assert_eq!(u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]), 54);
        assert_eq!(u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]), 40);
        assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 24);
    }

    #[test]
    fn mismatched_pixel_length_is_rejected() {
        assert!(encode_bgr24(3, 2, &[0u8; 18]).is_err());
        assert!(encode_bgr24(0, 2, &[]).is_err());
    }
}

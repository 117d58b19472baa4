//! 按输出扩展名分派编码：`.png` 走 alpha 感知路径，其余一律写 24 位 BMP。

use std::path::Path;

/// 输出文件格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Bmp,
}

impl OutputFormat {
    /// 扩展名大小写不敏感；非 `.png` 一律视为 BMP。
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => Self::Png,
            _ => Self::Bmp,
        }
    }
}

#[cfg(target_os = "windows")]
pub use win32::save_to_file;

#[cfg(target_os = "windows")]
mod win32 {
    use std::fs;
    use std::path::Path;
    use std::time::Instant;

    use super::OutputFormat;
    use crate::bitmap::{bmp, gdi, pixels, ImageHandle};
    use crate::error::PreviewError;

    /// 将位图写入 `output`。提取成功而写盘失败时返回 `Encode`。
    pub fn save_to_file(handle: &ImageHandle, output: &Path) -> Result<(), PreviewError> {
        if output.as_os_str().is_empty() {
            return Err(PreviewError::InvalidArgument("输出路径为空".to_string()));
        }

        let started = Instant::now();
        let format = OutputFormat::from_path(output);
        let (width, height) = (handle.width(), handle.height());

        let bytes = match format {
            OutputFormat::Png => {
                let bgra = gdi::read_bgra32(handle)?;
                pixels::bgra_to_png(width, height, &bgra, handle.alpha_mode())?
            }
            OutputFormat::Bmp => {
                let bgr = gdi::read_bgr24_bottom_up(handle)?;
                bmp::encode_bgr24(width, height, &bgr)?
            }
        };

        fs::write(output, &bytes).map_err(|e| {
            PreviewError::Encode(format!("写入文件失败: path={} err={}", output.display(), e))
        })?;

        log::info!(
            "已保存: format={:?} size={}x{} alpha={} bytes={} elapsed={}ms",
            format,
            width,
            height,
            handle.alpha_mode().as_str(),
            bytes.len(),
            started.elapsed().as_millis()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_extension_is_case_insensitive() {
        assert_eq!(OutputFormat::from_path(Path::new("a.png")), OutputFormat::Png);
        assert_eq!(OutputFormat::from_path(Path::new("C:/x/A.PNG")), OutputFormat::Png);
    }

    #[test]
    fn other_extensions_fall_back_to_bmp() {
        assert_eq!(OutputFormat::from_path(Path::new("a.bmp")), OutputFormat::Bmp);
        assert_eq!(OutputFormat::from_path(Path::new("a.jpg")), OutputFormat::Bmp);
        assert_eq!(OutputFormat::from_path(Path::new("noext")), OutputFormat::Bmp);
        assert_eq!(OutputFormat::from_path(Path::new("png")), OutputFormat::Bmp);
    }
}

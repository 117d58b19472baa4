//! # 位图归一化模块（bitmap）
//!
//! ## 设计思路
//!
//! 各提取策略返回的位图形态不一：独占的 DIB、缓存持有的共享位图、窗口截图。
//! 本模块把它们统一成“本地独占、尺寸可信”的 [`ImageHandle`]，并负责裁剪与写盘。
//!
//! - `handle`：所有权模型（`ImageHandle` / `SharedBitmap` / `RawBitmap`）
//! - `gdi`：DC 守卫、尺寸恢复、共享位图复制、左上角裁剪、像素读取、窗口截图
//! - `pixels`：BGRA → 直通 RGBA 转换与 PNG 编码（纯逻辑）
//! - `bmp`：24 位 BMP 容器写出（纯逻辑）
//! - `encode`：按扩展名分派输出格式
//!
//! ## 实现思路
//!
//! 纯像素逻辑不依赖 Win32，在所有平台编译与测试；涉及 GDI 句柄的部分仅在 Windows 编译。

pub mod bmp;
pub mod encode;
pub mod pixels;

#[cfg(target_os = "windows")]
pub(crate) mod gdi;
#[cfg(target_os = "windows")]
mod handle;

pub use encode::OutputFormat;
#[cfg(target_os = "windows")]
pub use encode::save_to_file;
#[cfg(target_os = "windows")]
pub use handle::{ImageHandle, RawBitmap, SharedBitmap};

/// 位图像素的 alpha 语义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    /// 来源未声明；alpha 平面全 0 时按不透明处理。
    #[default]
    Unknown,
    /// 不透明（alpha 通道无意义）。
    Straight,
    /// 颜色通道已乘以 alpha。
    Premultiplied,
}

impl AlphaMode {
    /// 由 `WTS_ALPHATYPE` 数值映射（`WTSAT_RGB = 1`，`WTSAT_ARGB = 2`）。
    pub fn from_wts(value: i32) -> Self {
        match value {
            1 => Self::Straight,
            2 => Self::Premultiplied,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Straight => "straight",
            Self::Premultiplied => "premultiplied",
        }
    }
}

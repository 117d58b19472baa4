//! # Shell 预览提取 — 库入口
//!
//! 借助 Windows Shell 为任意文件提取缩略图、内容预览或类型图标，
//! 归一化为本地独占位图后保存为 PNG / BMP。渲染本身始终交给系统注册的处理器。
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  preview ── ShellPreview 门面（缩略图 / 预览 / 图标 / 保存） │
//! │       │                                                  │
//! │       ↓                                                  │
//! │  orchestrator ── 每种操作的策略顺序表 + 宽高比裁剪          │
//! │       │                     ↑                            │
//! │       ↓                     └── metadata（源媒体尺寸）     │
//! │  strategy ── 五种 Shell 提取机制                           │
//! │   ├─ thumbnail_provider / extract_image / thumbnail_cache │
//! │   ├─ image_factory                                       │
//! │   └─ content_preview ── preview_host（离屏窗口 + 截图）    │
//! │       │                   └─ worker（专用 STA 线程 + 超时）│
//! │       ↓                                                  │
//! │  bitmap ── 所有权模型 · 尺寸恢复 · 裁剪 · PNG/BMP 编码      │
//! │                                                          │
//! │  error · config · runtime（GDI+ 引用计数）                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `PreviewError`，HRESULT 归类 |
//! | [`config`] | `PreviewConfig` 时序与兜底参数，JSON 配置加载 |
//! | [`runtime`] | 进程级图形子系统引用计数守卫 |
//! | [`bitmap`] | `ImageHandle` 所有权、共享位图复制、裁剪、alpha 转换、写盘 |
//! | [`strategy`] | `Extractor` 能力与五种提取策略、离屏预览宿主 |
//! | [`metadata`] | 源媒体宽高探测 |
//! | [`orchestrator`] | 策略回退链与宽高比裁剪 |
//!
//! Shell 相关实现只在 Windows 上编译；错误归类、配置、回退策略、裁剪几何、
//! 像素转换与 BMP 容器等纯逻辑在所有平台编译与测试。

pub mod bitmap;
pub mod config;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod runtime;
pub mod strategy;

#[cfg(target_os = "windows")]
mod preview;

pub use bitmap::{AlphaMode, OutputFormat};
pub use config::PreviewConfig;
pub use error::{ErrorKind, PreviewError};
pub use orchestrator::OperationKind;

#[cfg(target_os = "windows")]
pub use bitmap::ImageHandle;
#[cfg(target_os = "windows")]
pub use preview::ShellPreview;

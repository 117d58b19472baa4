//! # 配置模块
//!
//! ## 设计思路
//!
//! 将预览宿主的时序参数、离屏位置与尺寸兜底策略集中到 `PreviewConfig`，
//! 保证这些“可调策略”在日志中可观测、在测试中可注入。
//!
//! ## 实现思路
//!
//! - `Default` 提供与系统资源管理器行为接近的默认值。
//! - `#[serde(default)]` 允许配置文件只写需要覆盖的字段。
//! - `validate` 在构造门面对象前拒绝越界取值。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PreviewError;

/// 单边尺寸允许的范围（像素）。
pub const SIZE_RANGE: std::ops::RangeInclusive<u32> = 1..=4096;
const SETTLE_RANGE_MS: std::ops::RangeInclusive<u64> = 0..=10_000;
const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 1_000..=120_000;

/// 预览提取配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// 命令行未给出尺寸时使用的边长。
    pub default_size: u32,
    /// `DoPreview` 之后、截图之前的等待时间（毫秒）。
    pub preview_settle_ms: u64,
    /// 专用预览线程的总超时（毫秒）。
    pub preview_timeout_ms: u64,
    /// 离屏宿主窗口左上角 X。
    pub offscreen_x: i32,
    /// 离屏宿主窗口左上角 Y。
    pub offscreen_y: i32,
    /// 无法取回位图尺寸时的替代边长。
    pub fallback_size: u32,
    /// 为 true 时尺寸无法恢复直接失败，不再使用白底替代位图。
    pub strict_dimensions: bool,
    /// 缩略图是否按源媒体宽高比裁剪。
    pub aspect_crop: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            default_size: 256,
            preview_settle_ms: 1_000,
            preview_timeout_ms: 30_000,
            offscreen_x: -32_000,
            offscreen_y: -32_000,
            fallback_size: 256,
            strict_dimensions: false,
            aspect_crop: true,
        }
    }
}

impl PreviewConfig {
    /// 从 JSON 文件读取配置并校验。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreviewError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PreviewError::Config(format!("读取配置文件失败: path={} err={}", path.display(), e))
        })?;

        let config = serde_json::from_str::<Self>(&content)
            .map_err(|e| PreviewError::Config(format!("解析配置文件失败: {}", e)))?;

        config.validate()?;
        log::debug!("已加载配置: path={} config={:?}", path.display(), config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PreviewError> {
        if !SIZE_RANGE.contains(&self.default_size) {
            return Err(PreviewError::Config(format!(
                "default_size 超出范围: {}",
                self.default_size
            )));
        }
        if !SIZE_RANGE.contains(&self.fallback_size) {
            return Err(PreviewError::Config(format!(
                "fallback_size 超出范围: {}",
                self.fallback_size
            )));
        }
        if !SETTLE_RANGE_MS.contains(&self.preview_settle_ms) {
            return Err(PreviewError::Config(format!(
                "preview_settle_ms 超出范围: {}",
                self.preview_settle_ms
            )));
        }
        if !TIMEOUT_RANGE_MS.contains(&self.preview_timeout_ms) {
            return Err(PreviewError::Config(format!(
                "preview_timeout_ms 超出范围: {}",
                self.preview_timeout_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = PreviewConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_size, 256);
        assert_eq!(config.offscreen_x, -32_000);
        assert!(!config.strict_dimensions);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "preview_settle_ms": 250, "strict_dimensions": true }}"#).unwrap();

        let config = PreviewConfig::load(file.path()).unwrap();
        assert_eq!(config.preview_settle_ms, 250);
        assert!(config.strict_dimensions);
        assert_eq!(config.preview_timeout_ms, 30_000);
        assert!(config.aspect_crop);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let config = PreviewConfig {
            preview_timeout_ms: 10,
            ..PreviewConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);

        let config = PreviewConfig {
            fallback_size: 0,
            ..PreviewConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn malformed_or_missing_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert_eq!(
            PreviewConfig::load(file.path()).unwrap_err().kind(),
            ErrorKind::Config
        );

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(
            PreviewConfig::load(missing).unwrap_err().kind(),
            ErrorKind::Config
        );
    }
}

//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 所有提取策略、位图归一化与保存流程统一返回 `Result<T, PreviewError>`。
//! 错误按“种类”而不是按 HRESULT 数值暴露给调用方：调用方只需匹配
//! [`ErrorKind`] 即可区分“文件不存在”“没有注册处理器”“超时”等情况。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 所有 Win32 / COM 失败都经过 [`classify_hresult`] 归类，消息统一采用
//!   `hr=0x........ code=... detail=...` 可检索字段格式，便于日志聚合。
//! - 保存失败（`Encode`）与提取失败分属不同变体：提取成功但写盘失败时，
//!   调用方可以明确区分两者。

/// 错误种类（稳定、可匹配）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AccessDenied,
    UnsupportedOperation,
    ClassNotRegistered,
    NotInitialized,
    Timeout,
    Unspecified,
    Encode,
    Config,
}

impl ErrorKind {
    /// 面向用户的诊断提示。
    pub fn hint(self) -> &'static str {
        match self {
            Self::InvalidArgument => "参数无效（路径或句柄为空）",
            Self::NotFound => "文件不存在",
            Self::AccessDenied => "没有访问该文件的权限",
            Self::UnsupportedOperation => "处理器存在，但不支持此类提取",
            Self::ClassNotRegistered => "该文件类型没有注册任何 Shell 处理器",
            Self::NotInitialized => "COM 或图形子系统尚未初始化",
            Self::Timeout => "预览渲染超时",
            Self::Unspecified => "底层子系统返回未分类错误",
            Self::Encode => "图片已提取，但写入输出文件失败",
            Self::Config => "配置文件无效",
        }
    }
}

/// 预览提取统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// 路径、尺寸或句柄为空或无效
    #[error("参数错误：{0}")]
    InvalidArgument(String),

    /// 输入文件不存在
    #[error("文件不存在：{0}")]
    NotFound(String),

    /// 没有访问文件或对象的权限
    #[error("访问被拒绝：{0}")]
    AccessDenied(String),

    /// 处理器存在，但拒绝这种提取
    #[error("不支持的提取：{0}")]
    UnsupportedOperation(String),

    /// 文件类型没有注册对应的 Shell 处理器
    #[error("未注册处理器：{0}")]
    ClassNotRegistered(String),

    /// COM 或图形子系统的前置条件未满足
    #[error("未初始化：{0}")]
    NotInitialized(String),

    /// 预览渲染超过时限
    #[error("超时错误：{0}")]
    Timeout(String),

    /// 底层子系统返回的未分类失败
    #[error("未知错误：{0}")]
    Unspecified(String),

    /// 位图已取得，但编码或写盘失败
    #[error("保存失败：{0}")]
    Encode(String),

    /// 配置文件读取、解析或校验失败
    #[error("配置错误：{0}")]
    Config(String),
}

impl PreviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Self::ClassNotRegistered(_) => ErrorKind::ClassNotRegistered,
            Self::NotInitialized(_) => ErrorKind::NotInitialized,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Unspecified(_) => ErrorKind::Unspecified,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// 按种类构造错误。
    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::InvalidArgument => Self::InvalidArgument(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::AccessDenied => Self::AccessDenied(message),
            ErrorKind::UnsupportedOperation => Self::UnsupportedOperation(message),
            ErrorKind::ClassNotRegistered => Self::ClassNotRegistered(message),
            ErrorKind::NotInitialized => Self::NotInitialized(message),
            ErrorKind::Timeout => Self::Timeout(message),
            ErrorKind::Unspecified => Self::Unspecified(message),
            ErrorKind::Encode => Self::Encode(message),
            ErrorKind::Config => Self::Config(message),
        }
    }

    /// 由 HRESULT 构造错误，消息中保留原始 hr 与 Win32 错误码。
    pub fn from_hresult(operation: &str, hr: i32, detail: &str) -> Self {
        Self::with_kind(
            classify_hresult(hr),
            format_hresult_message(operation, hr, detail),
        )
    }
}

#[cfg(target_os = "windows")]
impl PreviewError {
    /// 将 windows-rs 错误归类，`operation` 用于标识失败的调用。
    pub(crate) fn win32(operation: &str, err: &windows::core::Error) -> Self {
        Self::from_hresult(operation, err.code().0, &err.message().to_string())
    }
}

const E_NOTIMPL: u32 = 0x8000_4001;
const E_NOINTERFACE: u32 = 0x8000_4002;
const REGDB_E_CLASSNOTREG: u32 = 0x8004_0154;
const CO_E_NOTINITIALIZED: u32 = 0x8004_01F0;
const WTS_E_FAILEDEXTRACTION: u32 = 0x8004_B200;
const WTS_E_EXTRACTIONTIMEDOUT: u32 = 0x8004_B201;
const WTS_E_NOSTORAGEPROVIDERTHUMBNAILHANDLER: u32 = 0x8004_B207;

const ERROR_FILE_NOT_FOUND: u32 = 2;
const ERROR_PATH_NOT_FOUND: u32 = 3;
const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_INVALID_PARAMETER: u32 = 87;
const ERROR_NO_ASSOCIATION: u32 = 1155;
const ERROR_TIMEOUT: u32 = 1460;

/// 从 `HRESULT_FROM_WIN32` 形式的 HRESULT 中取出 Win32 错误码。
pub(crate) fn hresult_to_win32_code(hr: i32) -> Option<u32> {
    let value = hr as u32;
    if (value & 0xFFFF_0000) == 0x8007_0000 {
        Some(value & 0xFFFF)
    } else {
        None
    }
}

/// 将 HRESULT 归类为 [`ErrorKind`]。
///
/// `E_INVALIDARG` / `E_ACCESSDENIED` 属于 FACILITY_WIN32，走 Win32 错误码分支。
pub fn classify_hresult(hr: i32) -> ErrorKind {
    let value = hr as u32;

    if let Some(code) = hresult_to_win32_code(hr) {
        return match code {
            ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => ErrorKind::NotFound,
            ERROR_ACCESS_DENIED => ErrorKind::AccessDenied,
            ERROR_INVALID_PARAMETER => ErrorKind::InvalidArgument,
            ERROR_NO_ASSOCIATION => ErrorKind::ClassNotRegistered,
            ERROR_TIMEOUT => ErrorKind::Timeout,
            _ => ErrorKind::Unspecified,
        };
    }

    match value {
        E_NOTIMPL | E_NOINTERFACE => ErrorKind::UnsupportedOperation,
        REGDB_E_CLASSNOTREG => ErrorKind::ClassNotRegistered,
        CO_E_NOTINITIALIZED => ErrorKind::NotInitialized,
        WTS_E_EXTRACTIONTIMEDOUT => ErrorKind::Timeout,
        WTS_E_FAILEDEXTRACTION..=WTS_E_NOSTORAGEPROVIDERTHUMBNAILHANDLER => {
            ErrorKind::UnsupportedOperation
        }
        _ => ErrorKind::Unspecified,
    }
}

pub(crate) fn format_hresult_message(operation: &str, hr: i32, detail: &str) -> String {
    let code = hresult_to_win32_code(hr)
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "{}失败: hr=0x{:08X} code={} detail={}",
        operation, hr as u32, code, detail
    )
}

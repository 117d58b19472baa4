//! COM 套间守卫与 Shell 公共辅助。

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use windows::core::PCWSTR;
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{
    CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED, COINIT_DISABLE_OLE1DDE,
};
use windows::Win32::UI::Shell::{IShellItem, SHCreateItemFromParsingName};

use crate::error::PreviewError;

pub(crate) fn to_wide(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(std::iter::once(0)).collect()
}

/// 当前线程的 COM 初始化状态。成功初始化的守卫在析构时 `CoUninitialize`。
#[derive(Debug)]
pub(crate) struct ComApartment {
    owns_init: bool,
    single_threaded: bool,
}

impl ComApartment {
    /// 尝试以 STA 初始化。线程已固定为 MTA 时仍返回守卫，但 `is_sta()` 为 false。
    pub(crate) fn enter() -> Result<Self, PreviewError> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED | COINIT_DISABLE_OLE1DDE) };
        if hr.is_ok() {
            return Ok(Self {
                owns_init: true,
                single_threaded: true,
            });
        }
        if hr == RPC_E_CHANGED_MODE {
            log::debug!("当前线程已处于 MTA，无法切换为 STA");
            return Ok(Self {
                owns_init: false,
                single_threaded: false,
            });
        }
        Err(PreviewError::from_hresult("CoInitializeEx", hr.0, "STA"))
    }

    /// 该线程是否可直接承载需要 STA 的接口。
    pub(crate) fn is_sta(&self) -> bool {
        self.single_threaded
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.owns_init {
            unsafe { CoUninitialize() };
        }
    }
}

/// 由文件系统路径创建 `IShellItem`。
pub(crate) fn create_shell_item(path: &Path) -> Result<IShellItem, PreviewError> {
    let wide = to_wide(path.as_os_str());
    unsafe { SHCreateItemFromParsingName(PCWSTR(wide.as_ptr()), None) }
        .map_err(|e| PreviewError::win32("SHCreateItemFromParsingName", &e))
}

//! 进程级图形子系统生命周期
//!
//! # 设计思路
//!
//! GDI+ 在进程内只需启动一次，但库可能同时存在多个 `ShellPreview` 实例。
//! 这里用引用计数守卫管理：第一个守卫启动子系统，最后一个守卫释放时关闭。
//!
//! # 实现思路
//!
//! - `RuntimeRegistry` 只负责计数与令牌记账，启动/关闭动作以闭包注入，可在任意平台测试。
//! - 全局注册表放在 `Lazy<Mutex<_>>` 中；非 Windows 平台的启动/关闭为空操作。
//! - 本 crate 自身不调用任何 GDI+ API：PNG 编码走 `image`，其余都是 GDI / Shell 调用。
//!   守卫只负责进程级的启动/关闭生命周期，提取期间子系统对进程内加载的 Shell 处理器保持可用。

use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::PreviewError;

/// 引用计数记账。
#[derive(Debug, Default)]
pub struct RuntimeRegistry {
    count: usize,
    token: Option<usize>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_running(&self) -> bool {
        self.count > 0
    }

    /// 计数从 0 变 1 时调用 `start`；启动失败则计数保持不变。
    pub fn acquire_with<F>(&mut self, start: F) -> Result<(), PreviewError>
    where
        F: FnOnce() -> Result<usize, PreviewError>,
    {
        if self.count == 0 {
            let token = start()?;
            self.token = Some(token);
        }
        self.count += 1;
        Ok(())
    }

    /// 计数归零时以启动令牌调用 `stop`。多余的释放被忽略。
    pub fn release_with<F>(&mut self, stop: F)
    where
        F: FnOnce(usize),
    {
        match self.count {
            0 => {}
            1 => {
                self.count = 0;
                if let Some(token) = self.token.take() {
                    stop(token);
                }
            }
            _ => self.count -= 1,
        }
    }
}

static RUNTIME: Lazy<Mutex<RuntimeRegistry>> = Lazy::new(|| Mutex::new(RuntimeRegistry::new()));

/// 持有期间图形子系统保持可用。
#[derive(Debug)]
pub struct RuntimeGuard {
    _private: (),
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        match RUNTIME.lock() {
            Ok(mut registry) => registry.release_with(platform::shutdown),
            Err(poisoned) => poisoned.into_inner().release_with(platform::shutdown),
        }
    }
}

/// 获取一个运行时守卫，必要时启动图形子系统。
pub fn acquire() -> Result<RuntimeGuard, PreviewError> {
    let mut registry = RUNTIME
        .lock()
        .map_err(|_| PreviewError::NotInitialized("运行时注册表锁已中毒".to_string()))?;
    registry.acquire_with(platform::startup)?;
    log::debug!("运行时守卫已获取: count={}", registry.count());
    Ok(RuntimeGuard { _private: () })
}

pub fn is_initialized() -> bool {
    RUNTIME
        .lock()
        .map(|registry| registry.is_running())
        .unwrap_or(false)
}

#[cfg(target_os = "windows")]
mod platform {
    use windows::Win32::Graphics::GdiPlus::{GdiplusShutdown, GdiplusStartup, GdiplusStartupInput};

    use crate::error::PreviewError;

    pub(super) fn startup() -> Result<usize, PreviewError> {
        let input = GdiplusStartupInput {
            GdiplusVersion: 1,
            ..Default::default()
        };
        let mut token: usize = 0;

        let status = unsafe { GdiplusStartup(&mut token, &input, std::ptr::null_mut()) };
        if status.0 != 0 {
            return Err(PreviewError::NotInitialized(format!(
                "GdiplusStartup 失败: status={}",
                status.0
            )));
        }

        log::info!("GDI+ 已启动");
        Ok(token)
    }

    pub(super) fn shutdown(token: usize) {
        unsafe { GdiplusShutdown(token) };
        log::info!("GDI+ 已关闭");
    }
}

#[cfg(not(target_os = "windows"))]
mod platform {
    use crate::error::PreviewError;

    pub(super) fn startup() -> Result<usize, PreviewError> {
        Ok(0)
    }

    pub(super) fn shutdown(_token: usize) {}
}

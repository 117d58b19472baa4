//! # 离屏预览宿主
//!
//! ## 设计思路
//!
//! 很多预览处理器只在“可见”窗口里渲染，所以宿主窗口放在远离桌面的坐标上，
//! 以不激活的方式显示。渲染完成后用 `PrintWindow` 把窗口内容截成位图。
//!
//! ## 实现思路
//!
//! - 处理器由扩展名经关联注册表解析出 CLSID 再实例化。
//! - `PreviewSession` 字段按声明顺序析构：先 `Unload` 处理器，再销毁窗口，
//!   任何失败路径都会走到这里。
//! - 等待渲染期间按小片段泵消息，并在每个片段检查取消信号。

use std::ffi::OsStr;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use windows::core::{w, Interface, GUID, PCWSTR, PWSTR};
use windows::Win32::Foundation::{GetLastError, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::System::Com::{
    CLSIDFromString, CoCreateInstance, CLSCTX_INPROC_SERVER, CLSCTX_LOCAL_SERVER,
    STGM_READ, STGM_SHARE_DENY_NONE,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Shell::PropertiesSystem::IInitializeWithFile;
use windows::Win32::UI::Shell::{
    AssocQueryStringW, IInitializeWithItem, IPreviewHandler, ASSOCF_INIT_DEFAULTTOSTAR,
    ASSOCSTR_SHELLEXTENSION,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, PeekMessageW,
    RegisterClassW, ShowWindow, TranslateMessage, MSG, PM_REMOVE, SW_SHOWNOACTIVATE,
    WNDCLASSW, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_POPUP,
};

use super::com::to_wide;
use super::stage::{PreviewStage, StageTracker};
use super::{create_shell_item, ExtractRequest};
use crate::bitmap::{gdi, ImageHandle};
use crate::config::PreviewConfig;
use crate::error::PreviewError;

/// `IPreviewHandler` 的接口 ID，作为关联查询的 Shell 扩展键。
const PREVIEW_HANDLER_KEY: PCWSTR = w!("{8895b1c6-b41f-4c1c-a562-0d564250836f}");
const HOST_CLASS_NAME: PCWSTR = w!("ShellPreviewHostWindow");
const PUMP_SLICE: Duration = Duration::from_millis(20);

static HOST_CLASS: OnceCell<u16> = OnceCell::new();

unsafe extern "system" fn host_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

fn register_host_class() -> Result<(), PreviewError> {
    HOST_CLASS.get_or_try_init(|| {
        let module = unsafe { GetModuleHandleW(None) }
            .map_err(|e| PreviewError::win32("GetModuleHandleW", &e))?;
        let class = WNDCLASSW {
            lpfnWndProc: Some(host_wndproc),
            hInstance: module.into(),
            lpszClassName: HOST_CLASS_NAME,
            ..Default::default()
        };
        let atom = unsafe { RegisterClassW(&class) };
        if atom == 0 {
            let code = unsafe { GetLastError() };
            return Err(PreviewError::from_hresult(
                "RegisterClassW",
                code.to_hresult().0,
                "ShellPreviewHostWindow",
            ));
        }
        log::debug!("已注册离屏宿主窗口类: atom={}", atom);
        Ok(atom)
    })?;
    Ok(())
}

/// 离屏但可见的宿主窗口，析构时销毁。
struct HostWindow(HWND);

impl HostWindow {
    fn create(config: &PreviewConfig, width: u32, height: u32) -> Result<Self, PreviewError> {
        register_host_class()?;
        let module = unsafe { GetModuleHandleW(None) }
            .map_err(|e| PreviewError::win32("GetModuleHandleW", &e))?;

        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
                HOST_CLASS_NAME,
                w!(""),
                WS_POPUP,
                config.offscreen_x,
                config.offscreen_y,
                width as i32,
                height as i32,
                None,
                None,
                Some(module.into()),
                None,
            )
        }
        .map_err(|e| PreviewError::win32("CreateWindowExW", &e))?;

        unsafe {
            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
        }
        Ok(Self(hwnd))
    }
}

impl Drop for HostWindow {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyWindow(self.0);
        }
    }
}

/// 已加载的预览处理器，析构时 `Unload`。
struct LoadedHandler(IPreviewHandler);

impl Drop for LoadedHandler {
    fn drop(&mut self) {
        unsafe {
            let _ = self.0.Unload();
        }
    }
}

/// 字段顺序即清理顺序。
#[derive(Default)]
struct PreviewSession {
    handler: Option<LoadedHandler>,
    window: Option<HostWindow>,
}

fn extension_of(path: &Path) -> Result<String, PreviewError> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .ok_or_else(|| {
            PreviewError::ClassNotRegistered(format!("文件没有扩展名: {}", path.display()))
        })
}

/// 由扩展名查出已注册预览处理器的 CLSID。
fn resolve_handler_clsid(extension: &str) -> Result<GUID, PreviewError> {
    let ext_wide = to_wide(OsStr::new(extension));
    let mut buffer = [0u16; 64];
    let mut len = buffer.len() as u32;

    let hr = unsafe {
        AssocQueryStringW(
            ASSOCF_INIT_DEFAULTTOSTAR,
            ASSOCSTR_SHELLEXTENSION,
            PCWSTR(ext_wide.as_ptr()),
            PREVIEW_HANDLER_KEY,
            Some(PWSTR(buffer.as_mut_ptr())),
            &mut len,
        )
    };
    if hr.is_err() {
        return Err(PreviewError::ClassNotRegistered(format!(
            "{} 没有注册预览处理器: hr=0x{:08X}",
            extension, hr.0 as u32
        )));
    }

    let clsid = unsafe { CLSIDFromString(PCWSTR(buffer.as_ptr())) }
        .map_err(|e| PreviewError::win32("CLSIDFromString", &e))?;
    log::debug!("预览处理器: ext={} clsid={:?}", extension, clsid);
    Ok(clsid)
}

fn create_handler(extension: &str) -> Result<IPreviewHandler, PreviewError> {
    let clsid = resolve_handler_clsid(extension)?;
    unsafe { CoCreateInstance(&clsid, None, CLSCTX_INPROC_SERVER | CLSCTX_LOCAL_SERVER) }
        .map_err(|e| PreviewError::win32("CoCreateInstance(IPreviewHandler)", &e))
}

/// 优先 `IInitializeWithFile`，不支持时退回 `IInitializeWithItem`。
fn initialize_with_path(handler: &IPreviewHandler, path: &Path) -> Result<(), PreviewError> {
    let mode = (STGM_READ | STGM_SHARE_DENY_NONE).0;

    if let Ok(init) = handler.cast::<IInitializeWithFile>() {
        let wide = to_wide(path.as_os_str());
        return unsafe { init.Initialize(PCWSTR(wide.as_ptr()), mode) }
            .map_err(|e| PreviewError::win32("IInitializeWithFile::Initialize", &e));
    }

    let init = handler.cast::<IInitializeWithItem>().map_err(|e| {
        PreviewError::UnsupportedOperation(format!(
            "处理器不支持按文件或 Shell 项初始化: {}",
            e.message()
        ))
    })?;
    let item = create_shell_item(path)?;
    unsafe { init.Initialize(&item, mode) }
        .map_err(|e| PreviewError::win32("IInitializeWithItem::Initialize", &e))
}

/// 等待渲染，期间泵消息并响应取消。
fn settle(tracker: &StageTracker, duration: Duration) -> Result<(), PreviewError> {
    let deadline = Instant::now() + duration;
    loop {
        tracker.check_cancelled()?;
        pump_messages();
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        thread::sleep(PUMP_SLICE.min(deadline - now));
    }
}

fn pump_messages() {
    let mut msg = MSG::default();
    unsafe {
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// 在已是 STA 的当前线程上完成整条预览流程。
pub(crate) fn render_preview(
    request: &ExtractRequest,
    config: &PreviewConfig,
    tracker: &mut StageTracker,
) -> Result<ImageHandle, PreviewError> {
    let mut session = PreviewSession::default();

    let extension = extension_of(&request.path)?;
    let handler = create_handler(&extension)?;
    let handler = &session.handler.insert(LoadedHandler(handler)).0;
    tracker.advance(PreviewStage::HandlerCreated)?;

    let window = session
        .window
        .insert(HostWindow::create(config, request.width, request.height)?)
        .0;
    tracker.advance(PreviewStage::WindowHosted)?;

    initialize_with_path(handler, &request.path)?;
    tracker.advance(PreviewStage::FileInitialized)?;

    let rect = RECT {
        left: 0,
        top: 0,
        right: request.width as i32,
        bottom: request.height as i32,
    };
    unsafe {
        handler
            .SetWindow(window, &rect)
            .map_err(|e| PreviewError::win32("IPreviewHandler::SetWindow", &e))?;
        handler
            .SetRect(&rect)
            .map_err(|e| PreviewError::win32("IPreviewHandler::SetRect", &e))?;
        handler
            .DoPreview()
            .map_err(|e| PreviewError::win32("IPreviewHandler::DoPreview", &e))?;
    }
    tracker.advance(PreviewStage::Rendering)?;

    settle(tracker, Duration::from_millis(config.preview_settle_ms))?;

    let captured = gdi::capture_window(window, request.width, request.height)?;
    tracker.advance(PreviewStage::Captured)?;
    Ok(captured)
}

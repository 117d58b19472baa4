//! 专用线程 + 硬超时
//!
//! # 设计思路
//!
//! 预览处理器要求 STA，而调用线程可能已进入 MTA。此时整条预览流程交给新线程执行，
//! 调用方以固定上限等待结果。
//!
//! # 实现思路
//!
//! - 结果经 `mpsc` 通道回传，调用方 `recv_timeout` 等待。
//! - 超时后置位 [`CancelToken`]，工作线程在每个阶段切换与等待间隙检查它并尽快退出。
//! - 不强制终止线程：卡死在 Shell 调用里的处理器会泄漏该线程。
//! - 超时后工作线程若仍送回结果，`send` 失败，结果（含位图）随之 drop 释放。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::PreviewError;

/// 协作式取消信号。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// 在名为 `name` 的新线程上运行 `task`，最多等待 `timeout`。
pub fn run_with_deadline<T, F>(name: &str, timeout: Duration, task: F) -> Result<T, PreviewError>
where
    T: Send + 'static,
    F: FnOnce(CancelToken) -> Result<T, PreviewError> + Send + 'static,
{
    let token = CancelToken::new();
    let worker_token = token.clone();
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
        let result = task(worker_token);
        if tx.send(result).is_err() {
            log::warn!("工作线程结果送达时调用方已超时离开，结果已丢弃");
        }
    });
    if let Err(e) = spawned {
        return Err(PreviewError::Unspecified(format!("创建工作线程失败: {}", e)));
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            token.cancel();
            log::warn!(
                "工作线程超时: name={} timeout={}ms，已发出取消信号",
                name,
                timeout.as_millis()
            );
            Err(PreviewError::Timeout(format!(
                "工作线程 {} 在 {}ms 内未完成",
                name,
                timeout.as_millis()
            )))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(PreviewError::Unspecified(format!(
            "工作线程 {} 异常退出",
            name
        ))),
    }
}

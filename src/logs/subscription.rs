//! 推模式日志订阅：后台线程读流，经有界通道交给消费者
//!
//! 通道满时生产者等待（背压），不会无限占用内存。
//! 取消或丢弃订阅后，生产者在下一次投递或下一个读取窗口到期时退出，
//! 随之丢弃数据源并释放底层连接。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};
use crate::utils::{LogLine, Result};

pub const DEFAULT_CAPACITY: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct LogSubscription {
    rx: Receiver<Result<LogLine>>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl LogSubscription {
    /// 在后台线程上驱动 `source`
    pub fn spawn<I>(source: I, capacity: usize) -> Result<Self>
    where
        I: Iterator<Item = Result<LogLine>> + Send + 'static,
    {
        Self::spawn_with_token(source, capacity, CancelToken::new())
    }

    /// 同 `spawn`，取消标志由调用方提供（数据源自己也可能观察它）
    pub fn spawn_with_token<I>(source: I, capacity: usize, cancel: CancelToken) -> Result<Self>
    where
        I: Iterator<Item = Result<LogLine>> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let token = cancel.clone();

        let worker = thread::Builder::new()
            .name("dockwatch-logs".to_string())
            .spawn(move || pump(source, tx, token))?;

        Ok(LogSubscription { rx, cancel, worker: Some(worker) })
    }

    /// 可交给其他线程（如 Ctrl+C 处理器）的取消句柄
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 等待下一行，超时返回 `None`（订阅仍然有效）
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Result<LogLine>> {
        if self.is_cancelled() {
            return None;
        }
        self.rx.recv_timeout(timeout).ok()
    }

    /// 取消并等待生产者线程退出
    ///
    /// 阻塞在投递上的生产者随接收端丢弃立刻返回；阻塞在读取上的，
    /// 数据源须在取消后的一个读取窗口内返回（`LogStream` 如此）。
    pub fn close(mut self) {
        self.cancel();
        let LogSubscription { rx, worker, .. } = &mut self;
        drop(std::mem::replace(rx, mpsc::sync_channel(1).1));
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                warn!("log subscription worker panicked");
            }
        }
    }
}

impl Iterator for LogSubscription {
    type Item = Result<LogLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_cancelled() {
                return None;
            }
            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(item) => return Some(item),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        // 不 join：生产者在当前读取窗口结束后自行退出并丢弃连接
        self.cancel.cancel();
    }
}

// ── 生产者 ──────────────────────────────────────────────────────────────────

fn pump<I>(source: I, tx: SyncSender<Result<LogLine>>, cancel: CancelToken)
where
    I: Iterator<Item = Result<LogLine>>,
{
    let mut delivered = 0usize;
    for item in source {
        if cancel.is_cancelled() {
            break;
        }
        let failed = item.is_err();
        if !deliver(&tx, item, &cancel) {
            break;
        }
        delivered += 1;
        if failed {
            break;
        }
    }
    debug!(delivered, cancelled = cancel.is_cancelled(), "log subscription finished");
}

/// 投递一项；通道满时轮询取消标志。返回 false 表示应停止
fn deliver(tx: &SyncSender<Result<LogLine>>, item: Result<LogLine>, cancel: &CancelToken) -> bool {
    let mut item = item;
    loop {
        match tx.try_send(item) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(_)) => return false,
            Err(TrySendError::Full(back)) => {
                if cancel.is_cancelled() {
                    return false;
                }
                item = back;
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

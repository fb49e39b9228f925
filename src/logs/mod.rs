pub mod demux;
pub mod subscription;

pub use demux::{demux_bytes, encode_frame, Demuxer, MAX_LINE_BYTES};
pub use subscription::{CancelToken, LogSubscription, DEFAULT_CAPACITY};

use std::io::{self, ErrorKind, Read};
use crate::engine::views::ContainerDetails;
use crate::utils::{LogLine, Result};

/// 拉模式日志流。持有 HTTP 响应，drop 即关闭连接
pub struct LogStream {
    container: ContainerDetails,
    cancel: CancelToken,
    lines: Demuxer<ResponseReader>,
}

impl LogStream {
    pub(crate) fn new(container: ContainerDetails, response: reqwest::blocking::Response, follow: bool) -> Self {
        let cancel = CancelToken::new();
        let reader = ResponseReader { response, cancel: cancel.clone(), follow };
        let lines = Demuxer::new(reader, container.tty);
        LogStream { container, cancel, lines }
    }

    pub fn container(&self) -> &ContainerDetails {
        &self.container
    }

    /// 取消后迭代在下一个读取窗口内结束
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 读到流结束（tail 模式下即全部请求的行）
    pub fn read_all(self) -> Result<Vec<LogLine>> {
        self.collect()
    }

    /// 转为后台读取的推模式订阅，与本流共用取消标志
    pub fn subscribe(self, capacity: usize) -> Result<LogSubscription> {
        let cancel = self.cancel.clone();
        LogSubscription::spawn_with_token(self, capacity, cancel)
    }
}

impl Iterator for LogStream {
    type Item = Result<LogLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let item = self.lines.next();
        // 取消导致的读取错误不交给调用方
        if self.cancel.is_cancelled() && matches!(item, Some(Err(_))) {
            return None;
        }
        item
    }
}

/// HTTP 响应体的读取端
///
/// follow 连接的客户端把单次读取限制在一个短窗口内：窗口到期只表示暂无新日志，
/// 检查取消标志后继续等。取消后立即返回错误，持有者随即丢弃响应、关闭连接。
struct ResponseReader {
    response: reqwest::blocking::Response,
    cancel: CancelToken,
    follow: bool,
}

impl Read for ResponseReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(io::Error::new(ErrorKind::Other, "log stream cancelled"));
            }
            match self.response.read(buf) {
                Err(e) if self.follow && is_read_timeout(&e) => continue,
                other => return other,
            }
        }
    }
}

fn is_read_timeout(e: &io::Error) -> bool {
    if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock {
        return true;
    }
    e.get_ref()
        .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
        .map_or(false, reqwest::Error::is_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_timeouts_are_recognised() {
        assert!(is_read_timeout(&io::Error::new(ErrorKind::TimedOut, "slow")));
        assert!(is_read_timeout(&io::Error::from(ErrorKind::WouldBlock)));
        assert!(!is_read_timeout(&io::Error::new(ErrorKind::Other, "boom")));
        assert!(!is_read_timeout(&io::Error::from(ErrorKind::ConnectionReset)));
    }
}

//! Docker 日志流解复用
//!
//! 非 tty 容器：stdout/stderr 复用同一条字节流，每帧 8 字节帧头
//! `[stream, 0, 0, 0, len(u32 BE)]` 后跟 `len` 字节 payload。
//! tty 容器：无分帧，原始字节。
//!
//! 帧边界、read() 边界和 UTF-8 字符边界都不一定与行边界对齐，
//! 因此未结束的行按流分别缓存，直到遇到 `\n` 才解码输出。
//! 缓存达到 `MAX_LINE_BYTES` 时整段作为一行输出（如只用 `\r` 刷新的进度条）。

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use crate::utils::{DockwatchError, LogLine, Result, StreamKind};

const HEADER_LEN: usize = 8;
const READ_CHUNK: usize = 8 * 1024;

/// 单条未结束行的缓存上限
pub const MAX_LINE_BYTES: usize = 64 * 1024;

pub struct Demuxer<R> {
    reader: R,
    tty: bool,
    /// 未完成的行，按首次出现顺序
    pending: Vec<(StreamKind, Vec<u8>)>,
    ready: VecDeque<LogLine>,
    scratch: Box<[u8]>,
    error: Option<DockwatchError>,
    done: bool,
}

impl<R: Read> Demuxer<R> {
    pub fn new(reader: R, tty: bool) -> Self {
        Demuxer {
            reader,
            tty,
            pending: Vec::new(),
            ready: VecDeque::new(),
            scratch: vec![0u8; READ_CHUNK].into_boxed_slice(),
            error: None,
            done: false,
        }
    }

    // ── 读取 ────────────────────────────────────────────────────────────────

    /// 推进一步：读一帧（或 tty 模式下读一块）
    fn advance(&mut self) -> Result<()> {
        if self.tty {
            self.advance_raw()
        } else {
            self.advance_frame()
        }
    }

    fn advance_raw(&mut self) -> Result<()> {
        let n = read_retrying(&mut self.reader, &mut self.scratch)?;
        if n == 0 {
            self.finish();
            return Ok(());
        }
        let chunk = self.scratch[..n].to_vec();
        self.feed(StreamKind::Console, &chunk);
        Ok(())
    }

    fn advance_frame(&mut self) -> Result<()> {
        let mut header = [0u8; HEADER_LEN];
        let got = read_full(&mut self.reader, &mut header)?;
        if got == 0 {
            // 恰好停在帧边界：正常结束
            self.finish();
            return Ok(());
        }
        if got < HEADER_LEN {
            return Err(DockwatchError::TruncatedStream(format!(
                "stream ended inside a frame header ({} of {} bytes)", got, HEADER_LEN
            )));
        }

        let stream = StreamKind::from_tag(header[0]).ok_or_else(|| {
            DockwatchError::MalformedResponse(format!("unknown log stream tag {}", header[0]))
        })?;
        let declared = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let mut remaining = declared;
        while remaining > 0 {
            let want = remaining.min(self.scratch.len());
            let n = read_retrying(&mut self.reader, &mut self.scratch[..want])?;
            if n == 0 {
                return Err(DockwatchError::TruncatedStream(format!(
                    "stream ended inside a {} frame ({} of {} payload bytes)",
                    stream, declared - remaining, declared
                )));
            }
            let chunk = self.scratch[..n].to_vec();
            self.feed(stream, &chunk);
            remaining -= n;
        }
        Ok(())
    }

    // ── 切行 ────────────────────────────────────────────────────────────────

    fn feed(&mut self, stream: StreamKind, mut bytes: &[u8]) {
        while let Some(pos) = bytes.iter().position(|&b| b == b'\n') {
            let line = match self.take_pending(stream) {
                Some(mut head) => {
                    head.extend_from_slice(&bytes[..pos]);
                    head
                }
                None => bytes[..pos].to_vec(),
            };
            self.ready.push_back(decode(stream, line));
            bytes = &bytes[pos + 1..];
        }

        if bytes.is_empty() {
            return;
        }
        let idx = match self.pending.iter().position(|(s, _)| *s == stream) {
            Some(idx) => {
                self.pending[idx].1.extend_from_slice(bytes);
                idx
            }
            None => {
                self.pending.push((stream, bytes.to_vec()));
                self.pending.len() - 1
            }
        };

        let buf = &mut self.pending[idx].1;
        if buf.len() >= MAX_LINE_BYTES {
            // 不完整的 UTF-8 尾部留到下一段
            let cut = utf8_boundary(buf);
            let tail = buf.split_off(cut);
            let head = std::mem::replace(buf, tail);
            if self.pending[idx].1.is_empty() {
                self.pending.remove(idx);
            }
            self.ready.push_back(decode(stream, head));
        }
    }

    fn take_pending(&mut self, stream: StreamKind) -> Option<Vec<u8>> {
        let idx = self.pending.iter().position(|(s, _)| *s == stream)?;
        Some(self.pending.remove(idx).1)
    }

    /// 流正常结束：没有换行符的尾行也输出
    fn finish(&mut self) {
        for (stream, line) in std::mem::take(&mut self.pending) {
            self.ready.push_back(decode(stream, line));
        }
        self.done = true;
    }
}

impl<R: Read> Iterator for Demuxer<R> {
    type Item = Result<LogLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            if let Some(e) = self.error.take() {
                self.done = true;
                return Some(Err(e));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.advance() {
                // 已切好的行先交付，再报错
                self.pending.clear();
                self.error = Some(e);
            }
        }
    }
}

/// 一次性解复用整个缓冲区
pub fn demux_bytes(bytes: &[u8], tty: bool) -> Result<Vec<LogLine>> {
    Demuxer::new(bytes, tty).collect()
}

/// 构造一帧，测试与示例数据用
pub fn encode_frame(stream: StreamKind, payload: &[u8]) -> Vec<u8> {
    let tag = match stream {
        StreamKind::Stdin => 0,
        StreamKind::Stderr => 2,
        StreamKind::Stdout | StreamKind::Console => 1,
    };
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(tag);
    frame.extend_from_slice(&[0, 0, 0]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

// ── 工具 ────────────────────────────────────────────────────────────────────

fn decode(stream: StreamKind, mut line: Vec<u8>) -> LogLine {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    let text = match String::from_utf8(line) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    LogLine { stream, text }
}

/// 去掉末尾未完整的多字节序列后的长度
fn utf8_boundary(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let b = bytes[len - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let need = match b {
            0xF0..=0xFF => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if need > back { len - back } else { len };
    }
    len
}

fn read_retrying<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(map_read_error(e)),
        }
    }
}

/// 读满 `buf`，返回实际读到的字节数（小于 len 表示 EOF）
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = read_retrying(reader, &mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn map_read_error(e: std::io::Error) -> DockwatchError {
    match e.kind() {
        ErrorKind::UnexpectedEof => DockwatchError::TruncatedStream(e.to_string()),
        ErrorKind::TimedOut
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => DockwatchError::EngineUnreachable(format!("log stream: {}", e)),
        _ => DockwatchError::Io(e),
    }
}

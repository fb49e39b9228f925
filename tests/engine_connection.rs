//! 连接层行为：超时、空闲 follow 流的取消、读不完的错误体
//! 用手写的 TCP Engine，mockito 无法模拟“接受连接后不再响应”。

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use dockwatch::engine::ClientOptions;
use dockwatch::logs::encode_frame;
use dockwatch::{ConnectionProfile, DockwatchError, EngineClient, StreamKind, Tail};

/// 在后台线程上运行 `serve`，返回 `host:port`
fn raw_engine<F>(serve: F) -> String
where
    F: FnOnce(TcpListener) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    thread::spawn(move || serve(listener));
    addr
}

fn client(addr: &str, timeout: Option<Duration>) -> EngineClient {
    let profile = ConnectionProfile::new(addr, "http").unwrap();
    EngineClient::with_options(&profile, ClientOptions {
        connect_timeout: Duration::from_secs(2),
        timeout,
    }).unwrap()
}

/// 读到请求头结束
fn read_request(conn: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut byte = [0u8; 1];
    while !request.ends_with(b"\r\n\r\n") {
        match conn.read(&mut byte) {
            Ok(0) | Err(_) => break,
            Ok(_) => request.push(byte[0]),
        }
    }
    String::from_utf8_lossy(&request).into_owned()
}

fn write_json(conn: &mut TcpStream, body: &str) {
    write!(
        conn,
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    ).unwrap();
    conn.flush().unwrap();
}

/// 对端是否已关闭连接（在 `wait` 内）
fn peer_closed(conn: &mut TcpStream, wait: Duration) -> bool {
    conn.set_read_timeout(Some(wait)).unwrap();
    let mut buf = [0u8; 256];
    loop {
        match conn.read(&mut buf) {
            Ok(0) => return true,
            Ok(_) => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => return false,
            Err(_) => return true,
        }
    }
}

/// inspect 之后的 follow 流只发一帧 "tick\n"，然后保持空闲 `idle`，
/// 通过返回的通道报告客户端是否在此期间断开
fn idle_follow_engine(idle: Duration) -> (String, Receiver<bool>) {
    let (closed_tx, closed_rx) = mpsc::channel();
    let addr = raw_engine(move |listener| {
        let (mut inspect, _) = listener.accept().unwrap();
        read_request(&mut inspect);
        write_json(&mut inspect, r#"{"Id":"idle","Name":"/idle","Config":{"Tty":false},"State":{"Running":true}}"#);

        let (mut logs, _) = listener.accept().unwrap();
        let request = read_request(&mut logs);
        assert!(request.contains("follow=1"), "{}", request);
        logs.write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/vnd.docker.raw-stream\r\nTransfer-Encoding: chunked\r\n\r\n").unwrap();
        let frame = encode_frame(StreamKind::Stdout, b"tick\n");
        write!(logs, "{:x}\r\n", frame.len()).unwrap();
        logs.write_all(&frame).unwrap();
        logs.write_all(b"\r\n").unwrap();
        logs.flush().unwrap();

        closed_tx.send(peer_closed(&mut logs, idle)).ok();
    });
    (addr, closed_rx)
}

#[test]
fn dropping_cancelled_follow_subscription_closes_idle_connection() {
    let (addr, closed) = idle_follow_engine(Duration::from_secs(4));
    let sub = client(&addr, Some(Duration::from_secs(5)))
        .open_container_log_stream("idle", Tail::Lines(0), true)
        .unwrap()
        .subscribe(4)
        .unwrap();

    let first = sub.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert_eq!(first.text, "tick");

    sub.cancel();
    drop(sub);
    assert_eq!(closed.recv_timeout(Duration::from_secs(6)), Ok(true));
}

#[test]
fn close_returns_while_follow_stream_is_idle() {
    let (addr, _closed) = idle_follow_engine(Duration::from_secs(10));
    let sub = client(&addr, Some(Duration::from_secs(5)))
        .open_container_log_stream("idle", Tail::Lines(0), true)
        .unwrap()
        .subscribe(4)
        .unwrap();
    assert_eq!(sub.recv_timeout(Duration::from_secs(5)).unwrap().unwrap().text, "tick");

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        sub.close();
        done_tx.send(()).ok();
    });
    assert!(done_rx.recv_timeout(Duration::from_secs(3)).is_ok(), "close did not return");
}

#[test]
fn cancelled_pull_stream_ends_iteration() {
    let (addr, closed) = idle_follow_engine(Duration::from_secs(4));
    let mut stream = client(&addr, Some(Duration::from_secs(5)))
        .open_container_log_stream("idle", Tail::Lines(0), true)
        .unwrap();
    assert_eq!(stream.next().unwrap().unwrap().text, "tick");

    let token = stream.cancel_token();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        token.cancel();
    });
    assert!(stream.next().is_none());
    drop(stream);
    assert_eq!(closed.recv_timeout(Duration::from_secs(6)), Ok(true));
}

/// 接受连接、读完请求后一直不响应
fn stalled_engine(hold: Duration) -> String {
    raw_engine(move |listener| {
        let (mut conn, _) = listener.accept().unwrap();
        read_request(&mut conn);
        thread::sleep(hold);
    })
}

#[test]
fn caller_timeout_bounds_a_stalled_call() {
    let addr = stalled_engine(Duration::from_secs(5));
    let client = client(&addr, None).with_timeout(Some(Duration::from_millis(200)));

    let started = Instant::now();
    let err = client.list_containers(true).unwrap_err();
    assert!(matches!(err, DockwatchError::EngineUnreachable(_)), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
}

#[test]
fn no_timeout_waits_for_a_slow_engine() {
    let addr = raw_engine(|listener| {
        let (mut conn, _) = listener.accept().unwrap();
        read_request(&mut conn);
        thread::sleep(Duration::from_millis(600));
        write_json(&mut conn, "[]");
    });
    let containers = client(&addr, None).list_containers(false).unwrap();
    assert!(containers.is_empty());
}

#[test]
fn broken_error_body_keeps_status() {
    let addr = raw_engine(|listener| {
        let (mut conn, _) = listener.accept().unwrap();
        read_request(&mut conn);
        // 声明 100 字节，只发 5 字节就断开
        conn.write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\nshort").unwrap();
        conn.flush().unwrap();
    });
    match client(&addr, Some(Duration::from_secs(5))).list_images() {
        Err(DockwatchError::EngineError { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.contains("unreadable response body"), "{}", body);
        }
        other => panic!("expected EngineError, got {:?}", other),
    }
}

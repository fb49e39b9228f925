//! Docker Engine HTTP API 客户端
//! 每个 ConnectionProfile 一个实例；构造开销小，不做进程级缓存

use std::time::{Duration, Instant};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};
use crate::engine::normalize;
use crate::engine::views::*;
use crate::engine::EngineApi;
use crate::logs::LogStream;
use crate::profile::{ConnectionProfile, Scheme, TlsMaterial};
use crate::utils::{DockwatchError, Result};

const USER_AGENT: &str = concat!("dockwatch/", env!("CARGO_PKG_VERSION"));

/// follow 日志流单次读取的等待上限；到期只表示暂无新日志
const FOLLOW_READ_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    /// 单次调用的总超时；`None` 表示不限
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            connect_timeout: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// 日志请求的行数范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    All,
    Lines(u64),
}

impl Tail {
    fn as_query(self) -> String {
        match self {
            Tail::All      => "all".to_string(),
            Tail::Lines(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineClient {
    http: Client,
    follow_http: Client,
    base_url: String,
    timeout: Option<Duration>,
}

// ── 构造 ────────────────────────────────────────────────────────────────────

impl EngineClient {
    pub fn new(profile: &ConnectionProfile) -> Result<Self> {
        Self::with_options(profile, ClientOptions::default())
    }

    pub fn with_options(profile: &ConnectionProfile, options: ClientOptions) -> Result<Self> {
        let tls = match (profile.scheme(), profile.tls_material()) {
            (Scheme::Https, TlsMaterial::Complete { ca, cert, key }) => {
                let ca = reqwest::Certificate::from_pem(ca.as_bytes())
                    .map_err(|e| DockwatchError::Validation(format!("invalid CA certificate: {}", e)))?;
                let identity = reqwest::Identity::from_pem(format!("{}\n{}", cert.trim_end(), key).as_bytes())
                    .map_err(|e| DockwatchError::Validation(format!("invalid client certificate/key: {}", e)))?;
                debug!(host = profile.host(), "TLS client authentication enabled");
                Some((ca, identity))
            }
            (Scheme::Https, TlsMaterial::Partial) => {
                warn!(
                    host = profile.host(),
                    "incomplete TLS material (need ca, cert and key); continuing without client authentication"
                );
                None
            }
            (Scheme::Http, TlsMaterial::Complete { .. } | TlsMaterial::Partial) => {
                warn!(host = profile.host(), "TLS material ignored for plain http connection");
                None
            }
            _ => None,
        };

        Ok(EngineClient {
            // 每个请求自己设置超时
            http: http_client(&options, None, tls.as_ref())?,
            // follow 日志流：单次读取限时，便于及时响应取消
            follow_http: http_client(&options, Some(FOLLOW_READ_WINDOW), tls.as_ref())?,
            base_url: profile.base_url(),
            timeout: options.timeout,
        })
    }

    /// 同一连接，不同的单次调用超时
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        EngineClient { timeout, ..self.clone() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// ── 查询 ────────────────────────────────────────────────────────────────────

impl EngineClient {
    pub fn list_containers(&self, all: bool) -> Result<Vec<ContainerView>> {
        let all = if all { "true" } else { "false" };
        let body = self.get_json("/containers/json", &[("all", all)])?;
        normalize::containers(&body)
    }

    pub fn list_images(&self) -> Result<Vec<ImageView>> {
        normalize::images(&self.get_json("/images/json", &[])?)
    }

    pub fn list_networks(&self) -> Result<Vec<NetworkView>> {
        normalize::networks(&self.get_json("/networks", &[])?)
    }

    pub fn list_volumes(&self) -> Result<Vec<VolumeView>> {
        normalize::volumes(&self.get_json("/volumes", &[])?)
    }

    pub fn host_info(&self) -> Result<HostInfo> {
        normalize::host_info(&self.get_json("/info", &[])?)
    }

    pub fn inspect_container(&self, id: &str) -> Result<ContainerDetails> {
        let path = format!("/containers/{}/json", segment(id)?);
        normalize::container_details(&self.get_json(&path, &[])?)
    }

    /// 打开日志流。先 inspect 取得 tty 标志，决定是否按帧解析
    pub fn open_container_log_stream(&self, id: &str, tail: Tail, follow: bool) -> Result<LogStream> {
        let details = self.inspect_container(id)?;
        let path = format!("/containers/{}/logs", segment(id)?);

        let tail = tail.as_query();
        let mut query = vec![("stdout", "1"), ("stderr", "1"), ("tail", tail.as_str())];
        if follow {
            query.push(("follow", "1"));
        }

        let response = if follow {
            self.open_follow(&path, &query)?
        } else {
            self.send(self.apply_timeout(self.http.get(self.url(&path)).query(&query)), &path)?
        };
        debug!(container = %details.id, tty = details.tty, follow, "log stream opened");

        Ok(LogStream::new(details, response, follow))
    }

    /// follow 客户端等响应头也只等一个读取窗口，超时重试，总时长受调用超时约束
    fn open_follow(&self, path: &str, query: &[(&str, &str)]) -> Result<Response> {
        let started = Instant::now();
        loop {
            match self.follow_http.get(self.url(path)).query(query).send() {
                Ok(response) => return check_status(response, path),
                Err(e) if e.is_timeout() && self.timeout.map_or(true, |t| started.elapsed() < t) => {
                    debug!(path, "no response headers yet, retrying follow request");
                }
                Err(e) => return Err(map_transport(e, path)),
            }
        }
    }
}

// ── 命令 ────────────────────────────────────────────────────────────────────

impl EngineClient {
    pub fn start_container(&self, id: &str) -> Result<()> {
        self.command(self.http.post(self.url(&format!("/containers/{}/start", segment(id)?))), id)
    }

    pub fn stop_container(&self, id: &str) -> Result<()> {
        self.command(self.http.post(self.url(&format!("/containers/{}/stop", segment(id)?))), id)
    }

    pub fn restart_container(&self, id: &str) -> Result<()> {
        self.command(self.http.post(self.url(&format!("/containers/{}/restart", segment(id)?))), id)
    }

    pub fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let req = self.http.delete(self.url(&format!("/containers/{}", segment(id)?)))
            .query(&[("force", bool_query(force))]);
        self.command(req, id)
    }

    pub fn remove_image(&self, reference: &str, force: bool) -> Result<()> {
        let req = self.http.delete(self.url(&format!("/images/{}", image_segment(reference)?)))
            .query(&[("force", bool_query(force))]);
        self.command(req, reference)
    }

    /// 保留网络（bridge/host/none）在本地拒绝，不发送到 Engine
    pub fn remove_network(&self, name: &str) -> Result<()> {
        if normalize::is_reserved_network(name) {
            return Err(DockwatchError::Validation(format!(
                "network {} is reserved by the host and cannot be removed", name
            )));
        }
        self.command(self.http.delete(self.url(&format!("/networks/{}", segment(name)?))), name)
    }

    pub fn remove_volume(&self, name: &str) -> Result<()> {
        self.command(self.http.delete(self.url(&format!("/volumes/{}", segment(name)?))), name)
    }
}

// ── HTTP ────────────────────────────────────────────────────────────────────

impl EngineClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_timeout(&self, req: RequestBuilder) -> RequestBuilder {
        match self.timeout {
            Some(t) => req.timeout(t),
            None    => req,
        }
    }

    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let req = self.apply_timeout(self.http.get(self.url(path)).query(query));
        let response = self.send(req, path)?;
        let text = response.text().map_err(|e| map_transport(e, path))?;
        serde_json::from_str(&text)
            .map_err(|e| DockwatchError::MalformedResponse(format!("{}: invalid JSON: {}", path, e)))
    }

    /// 无返回体的命令；304 表示目标已处于该状态
    fn command(&self, req: RequestBuilder, target: &str) -> Result<()> {
        let response = self.send(self.apply_timeout(req), target)?;
        if response.status() == StatusCode::NOT_MODIFIED {
            debug!(resource = target, "engine reported no change");
        }
        Ok(())
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let response = req.send().map_err(|e| map_transport(e, what))?;
        check_status(response, what)
    }
}

impl EngineApi for EngineClient {
    fn list_containers(&self, all: bool) -> Result<Vec<ContainerView>> {
        EngineClient::list_containers(self, all)
    }

    fn list_images(&self) -> Result<Vec<ImageView>> {
        EngineClient::list_images(self)
    }

    fn list_networks(&self) -> Result<Vec<NetworkView>> {
        EngineClient::list_networks(self)
    }

    fn list_volumes(&self) -> Result<Vec<VolumeView>> {
        EngineClient::list_volumes(self)
    }

    fn host_info(&self) -> Result<HostInfo> {
        EngineClient::host_info(self)
    }
}

// ── 工具 ────────────────────────────────────────────────────────────────────

fn http_client(
    options: &ClientOptions,
    read_timeout: Option<Duration>,
    tls: Option<&(reqwest::Certificate, reqwest::Identity)>,
) -> Result<Client> {
    let mut builder = Client::builder()
        .use_rustls_tls()
        .user_agent(USER_AGENT)
        .connect_timeout(options.connect_timeout)
        .timeout(read_timeout);
    if let Some((ca, identity)) = tls {
        builder = builder.add_root_certificate(ca.clone()).identity(identity.clone());
    }
    builder.build()
        .map_err(|e| DockwatchError::Validation(format!("cannot build HTTP client: {}", e)))
}

fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        return Ok(response);
    }

    let body = match response.text() {
        Ok(body) => body,
        Err(e) => format!("<unreadable response body: {}>", e),
    };
    if status == StatusCode::NOT_FOUND {
        return Err(DockwatchError::NotFound(match engine_message(&body) {
            Some(msg) => msg,
            None => format!("{} not found", what),
        }));
    }
    Err(DockwatchError::EngineError { status: status.as_u16(), body })
}

fn map_transport(e: reqwest::Error, what: &str) -> DockwatchError {
    if e.is_decode() {
        DockwatchError::MalformedResponse(format!("{}: {}", what, e))
    } else {
        // connect / timeout / 连接中断都归为不可达
        DockwatchError::EngineUnreachable(format!("{}: {}", what, e))
    }
}

/// Engine 错误体为 `{"message": "..."}`
fn engine_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body).ok()?
        .get("message")?
        .as_str()
        .map(String::from)
}

/// 容器 id / 名称 / 卷名 / 网络名作为单个路径段
fn segment(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains(|c: char| c == '/' || c == '?' || c == '#' || c.is_whitespace()) {
        return Err(DockwatchError::Validation(format!("invalid resource id: {:?}", id)));
    }
    Ok(id)
}

/// 镜像引用可以带仓库路径，如 `library/nginx:latest`
fn image_segment(reference: &str) -> Result<&str> {
    let reference = reference.trim();
    if reference.is_empty()
        || reference.starts_with('/')
        || reference.contains(|c: char| c == '?' || c == '#' || c.is_whitespace())
    {
        return Err(DockwatchError::Validation(format!("invalid image reference: {:?}", reference)));
    }
    Ok(reference)
}

fn bool_query(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

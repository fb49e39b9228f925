//! 连接配置：host / scheme / 可选 TLS PEM 材料
//! 每个会话构造一次，构造后只读

use serde::{Deserialize, Serialize};
use crate::utils::{DockwatchError, Result};

const DEFAULT_HTTP_PORT: u16 = 2375;
const DEFAULT_HTTPS_PORT: u16 = 2376;

// ── 数据结构 ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "http"  => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other   => Err(DockwatchError::Validation(
                format!("scheme must be http or https, got {:?}", other)
            )),
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http  => DEFAULT_HTTP_PORT,
            Scheme::Https => DEFAULT_HTTPS_PORT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http  => "http",
            Scheme::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未校验的输入，字段与前端存储的 JSON 一致：
/// `{"host": "10.0.0.5:2376", "protocol": "https", "ca": "...", "cert": "...", "key": "..."}`
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub host: String,
    /// 缺省留空，由调用方按是否带证书推断
    #[serde(default, alias = "protocol")]
    pub scheme: String,
    #[serde(default)]
    pub ca: Option<String>,
    #[serde(default)]
    pub cert: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

/// 已校验的连接配置
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionProfile {
    host: String,
    port: u16,
    scheme: Scheme,
    ca: Option<String>,
    cert: Option<String>,
    key: Option<String>,
}

/// TLS 材料完整度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMaterial<'a> {
    None,
    Partial,
    Complete { ca: &'a str, cert: &'a str, key: &'a str },
}

// ── 构造 ────────────────────────────────────────────────────────────────────

impl ConnectionProfile {
    pub fn new(host: &str, scheme: &str) -> Result<Self> {
        Self::from_spec(ProfileSpec {
            host: host.to_string(),
            scheme: scheme.to_string(),
            ..ProfileSpec::default()
        })
    }

    pub fn from_spec(spec: ProfileSpec) -> Result<Self> {
        let scheme = Scheme::parse(&spec.scheme)?;
        let (host, port) = split_host_port(&spec.host, scheme)?;

        Ok(ConnectionProfile {
            host,
            port,
            scheme,
            ca:   non_empty(spec.ca),
            cert: non_empty(spec.cert),
            key:  non_empty(spec.key),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// `scheme://host:port`，不带结尾斜杠
    pub fn base_url(&self) -> String {
        if self.host.contains(':') {
            format!("{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }

    pub fn tls_material(&self) -> TlsMaterial<'_> {
        match (&self.ca, &self.cert, &self.key) {
            (None, None, None) => TlsMaterial::None,
            (Some(ca), Some(cert), Some(key)) => TlsMaterial::Complete { ca, cert, key },
            _ => TlsMaterial::Partial,
        }
    }
}

// 不打印证书和私钥
impl std::fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("ca", &self.ca.as_ref().map(|_| "<pem>"))
            .field("cert", &self.cert.as_ref().map(|_| "<pem>"))
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl std::fmt::Debug for ProfileSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileSpec")
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

// ── 解析 ────────────────────────────────────────────────────────────────────

fn split_host_port(raw: &str, scheme: Scheme) -> Result<(String, u16)> {
    let raw = raw.trim();
    let raw = raw.strip_prefix("tcp://").unwrap_or(raw);
    let raw = raw.trim_end_matches('/');

    if raw.is_empty() {
        return Err(DockwatchError::Validation("host must not be empty".to_string()));
    }

    // [::1]:2375
    if let Some(rest) = raw.strip_prefix('[') {
        let (addr, tail) = rest.split_once(']')
            .ok_or_else(|| DockwatchError::Validation(format!("unterminated IPv6 address: {}", raw)))?;
        if addr.is_empty() {
            return Err(DockwatchError::Validation("host must not be empty".to_string()));
        }
        let port = match tail.strip_prefix(':') {
            Some(p) => parse_port(p)?,
            None if tail.is_empty() => scheme.default_port(),
            None => return Err(DockwatchError::Validation(format!("invalid host: {}", raw))),
        };
        return Ok((addr.to_string(), port));
    }

    match raw.split_once(':') {
        // 多个冒号：裸 IPv6，无端口
        Some((_, rest)) if rest.contains(':') => Ok((raw.to_string(), scheme.default_port())),
        Some((host, port)) => {
            if host.is_empty() {
                return Err(DockwatchError::Validation("host must not be empty".to_string()));
            }
            Ok((host.to_string(), parse_port(port)?))
        }
        None => Ok((raw.to_string(), scheme.default_port())),
    }
}

fn parse_port(s: &str) -> Result<u16> {
    match s.parse::<u16>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(DockwatchError::Validation(format!("invalid port: {:?}", s))),
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

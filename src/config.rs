//! 连接配置来源：JSON profile 文件 + 命令行/环境变量覆盖
//! 证书以文件路径给出，这里读成 PEM 文本

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use crate::engine::ClientOptions;
use crate::profile::{ConnectionProfile, ProfileSpec};
use crate::utils::{DockwatchError, Result};

#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    pub profile_file: Option<PathBuf>,
    pub host: Option<String>,
    pub scheme: Option<String>,
    /// 含 ca.pem / cert.pem / key.pem 的目录（同 DOCKER_CERT_PATH）
    pub tls_dir: Option<PathBuf>,
    pub tls_ca: Option<PathBuf>,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl ConnectionSettings {
    /// 优先级：单独给出的证书文件 > 证书目录 > profile 文件
    pub fn resolve(&self) -> Result<ConnectionProfile> {
        let mut spec = match &self.profile_file {
            Some(path) => read_profile_file(path)?,
            None => ProfileSpec::default(),
        };

        if let Some(host) = &self.host {
            spec.host = host.clone();
        }
        if let Some(scheme) = &self.scheme {
            spec.scheme = scheme.clone();
        }
        if spec.host.trim().is_empty() {
            return Err(DockwatchError::Config(
                "no Docker host configured (use --host, DOCKWATCH_HOST or --profile)".to_string()
            ));
        }

        if let Some(dir) = &self.tls_dir {
            spec.ca   = read_optional_pem(&dir.join("ca.pem"))?.or(spec.ca);
            spec.cert = read_optional_pem(&dir.join("cert.pem"))?.or(spec.cert);
            spec.key  = read_optional_pem(&dir.join("key.pem"))?.or(spec.key);
        }
        if let Some(p) = &self.tls_ca {
            spec.ca = Some(read_pem(p)?);
        }
        if let Some(p) = &self.tls_cert {
            spec.cert = Some(read_pem(p)?);
        }
        if let Some(p) = &self.tls_key {
            spec.key = Some(read_pem(p)?);
        }

        // 只给了 host 时默认 http；有证书时 https
        if spec.scheme.trim().is_empty() {
            spec.scheme = if spec.ca.is_some() || spec.cert.is_some() { "https" } else { "http" }.to_string();
        }

        debug!(host = %spec.host, scheme = %spec.scheme, "connection profile resolved");
        ConnectionProfile::from_spec(spec)
    }

    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::default();
        if let Some(secs) = self.timeout_secs {
            // 0 表示不限时
            options.timeout = if secs == 0 { None } else { Some(Duration::from_secs(secs)) };
        }
        options
    }
}

fn read_profile_file(path: &Path) -> Result<ProfileSpec> {
    let content = fs::read_to_string(path)
        .map_err(|e| DockwatchError::Config(format!("cannot read profile {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| DockwatchError::Config(format!("invalid profile {}: {}", path.display(), e)))
}

fn read_pem(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| DockwatchError::Config(format!("cannot read {}: {}", path.display(), e)))
}

fn read_optional_pem(path: &Path) -> Result<Option<String>> {
    if path.exists() {
        read_pem(path).map(Some)
    } else {
        Ok(None)
    }
}

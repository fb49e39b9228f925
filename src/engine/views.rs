use serde::{Deserialize, Serialize};
use crate::utils::ContainerState;

/// 宿主机保留网络，不可删除
pub const RESERVED_NETWORKS: [&str; 3] = ["bridge", "host", "none"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerView {
    pub id: String,
    /// Engine 原样返回（带前导 `/`），展示用 `display_name()`
    pub names: Vec<String>,
    pub image: String,
    pub state: ContainerState,
    pub status: String,
    pub ports: Vec<PortMapping>,
}

impl ContainerView {
    pub fn display_name(&self) -> &str {
        self.names.first()
            .map(|n| n.trim_start_matches('/'))
            .unwrap_or("")
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortMapping {
    pub private_port: u16,
    pub public_port: Option<u16>,
    pub protocol: String,
}

impl std::fmt::Display for PortMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.public_port {
            Some(p) => write!(f, "{}->{}/{}", p, self.private_port, self.protocol),
            None    => write!(f, "{}/{}", self.private_port, self.protocol),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageView {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub created: i64,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkView {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub scope: String,
    pub reserved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeView {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
}

/// `GET /info` 中与仪表盘相关的字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub name: String,
    pub server_version: String,
    pub operating_system: String,
    pub ncpu: u64,
    pub mem_total: u64,
    /// 并非所有 Engine 版本都返回
    pub mem_available: Option<u64>,
    pub containers: u64,
    pub containers_running: u64,
    pub images: u64,
}

/// 检查容器得到的日志相关配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub tty: bool,
    pub running: bool,
}

use serde::{Deserialize, Serialize};

/// Engine 报告的容器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Exited,
    Removing,
    Dead,
}

impl ContainerState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created"    => Some(ContainerState::Created),
            "running"    => Some(ContainerState::Running),
            "paused"     => Some(ContainerState::Paused),
            "restarting" => Some(ContainerState::Restarting),
            "exited"     => Some(ContainerState::Exited),
            "removing"   => Some(ContainerState::Removing),
            "dead"       => Some(ContainerState::Dead),
            _            => None,
        }
    }

    pub fn is_running(self) -> bool {
        self == ContainerState::Running
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerState::Created    => write!(f, "created"),
            ContainerState::Running    => write!(f, "running"),
            ContainerState::Paused     => write!(f, "paused"),
            ContainerState::Restarting => write!(f, "restarting"),
            ContainerState::Exited     => write!(f, "exited"),
            ContainerState::Removing   => write!(f, "removing"),
            ContainerState::Dead       => write!(f, "dead"),
        }
    }
}

/// 日志行来源。tty 模式下没有分帧，统一记为 Console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
    Console,
}

impl StreamKind {
    /// 帧头第一个字节 → 流类型
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(StreamKind::Stdin),
            1 => Some(StreamKind::Stdout),
            2 => Some(StreamKind::Stderr),
            _ => None,
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Stdin   => write!(f, "stdin"),
            StreamKind::Stdout  => write!(f, "stdout"),
            StreamKind::Stderr  => write!(f, "stderr"),
            StreamKind::Console => write!(f, "console"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub stream: StreamKind,
    pub text: String,
}

//! Engine 原始 JSON → 视图模型
//! 只取需要的字段；多余字段忽略，缺失的可选数组视为空

use serde_json::Value;
use crate::engine::views::*;
use crate::utils::{ContainerState, DockwatchError, Result};

// ── 容器 ────────────────────────────────────────────────────────────────────

pub fn containers(body: &Value) -> Result<Vec<ContainerView>> {
    list(body, "containers")?.iter().map(container).collect()
}

pub fn container(c: &Value) -> Result<ContainerView> {
    let id = required_str(c, "Id", "container")?;

    let raw_state = required_str(c, "State", "container")?;
    let state = ContainerState::parse(&raw_state).ok_or_else(|| {
        DockwatchError::MalformedResponse(format!("container {}: unknown state {:?}", id, raw_state))
    })?;

    Ok(ContainerView {
        names:  str_array(&c["Names"]),
        image:  str_val(c, "Image"),
        status: str_val(c, "Status"),
        ports:  ports(&c["Ports"]),
        state,
        id,
    })
}

fn ports(v: &Value) -> Vec<PortMapping> {
    // IPv4 / IPv6 绑定会各报一次，去重
    let mut ports: Vec<PortMapping> = v.as_array()
        .map(|arr| arr.iter()
            .filter_map(|p| {
                let private_port = p["PrivatePort"].as_u64()
                    .and_then(|n| u16::try_from(n).ok())?;
                Some(PortMapping {
                    private_port,
                    public_port: p["PublicPort"].as_u64().and_then(|n| u16::try_from(n).ok()),
                    protocol: p["Type"].as_str().unwrap_or("tcp").to_string(),
                })
            })
            .collect())
        .unwrap_or_default();

    ports.sort();
    ports.dedup();
    ports
}

// ── 镜像 ────────────────────────────────────────────────────────────────────

pub fn images(body: &Value) -> Result<Vec<ImageView>> {
    list(body, "images")?.iter().map(image).collect()
}

pub fn image(i: &Value) -> Result<ImageView> {
    Ok(ImageView {
        id:         required_str(i, "Id", "image")?,
        repo_tags:  str_array(&i["RepoTags"]),
        created:    i["Created"].as_i64().unwrap_or(0),
        size_bytes: i["Size"].as_u64().unwrap_or(0),
    })
}

// ── 网络 ────────────────────────────────────────────────────────────────────

pub fn networks(body: &Value) -> Result<Vec<NetworkView>> {
    list(body, "networks")?.iter().map(network).collect()
}

pub fn network(n: &Value) -> Result<NetworkView> {
    let name = str_val(n, "Name");
    Ok(NetworkView {
        id:       required_str(n, "Id", "network")?,
        driver:   str_val(n, "Driver"),
        scope:    str_val(n, "Scope"),
        reserved: is_reserved_network(&name),
        name,
    })
}

pub fn is_reserved_network(name: &str) -> bool {
    RESERVED_NETWORKS.contains(&name)
}

// ── 卷 ──────────────────────────────────────────────────────────────────────

/// `/volumes` 返回 `{"Volumes": [...], "Warnings": [...]}`，`Volumes` 可能为 null
pub fn volumes(body: &Value) -> Result<Vec<VolumeView>> {
    if !body.is_object() {
        return Err(DockwatchError::MalformedResponse(
            "volumes: expected an object envelope".to_string()
        ));
    }
    match &body["Volumes"] {
        Value::Null => Ok(vec![]),
        Value::Array(arr) => arr.iter().map(volume).collect(),
        _ => Err(DockwatchError::MalformedResponse("volumes: Volumes is not an array".to_string())),
    }
}

pub fn volume(v: &Value) -> Result<VolumeView> {
    Ok(VolumeView {
        name:       required_str(v, "Name", "volume")?,
        driver:     str_val(v, "Driver"),
        mountpoint: str_val(v, "Mountpoint"),
    })
}

// ── 宿主机 / 容器详情 ─────────────────────────────────────────────────────────

pub fn host_info(j: &Value) -> Result<HostInfo> {
    if !j.is_object() {
        return Err(DockwatchError::MalformedResponse("info: expected an object".to_string()));
    }
    Ok(HostInfo {
        name:               str_val(j, "Name"),
        server_version:     str_val(j, "ServerVersion"),
        operating_system:   str_val(j, "OperatingSystem"),
        ncpu:               j["NCPU"].as_u64().unwrap_or(0),
        mem_total:          j["MemTotal"].as_u64().unwrap_or(0),
        mem_available:      j["MemAvailable"].as_u64(),
        containers:         j["Containers"].as_u64().unwrap_or(0),
        containers_running: j["ContainersRunning"].as_u64().unwrap_or(0),
        images:             j["Images"].as_u64().unwrap_or(0),
    })
}

pub fn container_details(c: &Value) -> Result<ContainerDetails> {
    Ok(ContainerDetails {
        id:      required_str(c, "Id", "container")?,
        name:    str_val(c, "Name").trim_start_matches('/').to_string(),
        tty:     c["Config"]["Tty"].as_bool().unwrap_or(false),
        running: c["State"]["Running"].as_bool().unwrap_or(false),
    })
}

// ── 工具 ────────────────────────────────────────────────────────────────────

fn list<'a>(body: &'a Value, kind: &str) -> Result<&'a Vec<Value>> {
    body.as_array().ok_or_else(|| {
        DockwatchError::MalformedResponse(format!("{}: expected a JSON array", kind))
    })
}

fn required_str(v: &Value, key: &str, kind: &str) -> Result<String> {
    match v[key].as_str() {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(DockwatchError::MalformedResponse(format!("{}: missing {}", kind, key))),
    }
}

fn str_val(v: &Value, key: &str) -> String {
    v[key].as_str().unwrap_or("").to_string()
}

fn str_array(v: &Value) -> Vec<String> {
    v.as_array()
        .map(|a| a.iter()
            .filter_map(|s| s.as_str())
            .map(String::from)
            .collect())
        .unwrap_or_default()
}

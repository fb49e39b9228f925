//! 输出层：text 表格或 json

use anyhow::{bail, Result};
use serde::Serialize;
use dockwatch::engine::{ContainerView, ImageView, NetworkView, VolumeView};
use dockwatch::hub::HubRepository;
use dockwatch::{HostSnapshot, LogLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other  => bail!("unknown format: {}", other),
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── 仪表盘 ──────────────────────────────────────────────────────────────────

pub fn snapshot(s: &HostSnapshot, format: Format) -> Result<()> {
    if format == Format::Json {
        return print_json(s);
    }

    match s {
        HostSnapshot::Unavailable { error } => {
            print_section("CONNECTION ERROR");
            println!("  Docker engine is not reachable.");
            println!("  {}", error);
        }
        HostSnapshot::Available(m) => {
            print_section("HOST");
            println!("  CPU (approx)  : {:.1}%", m.cpu_usage_percent);
            println!("  Memory        : {:.1}% of {:.1}GiB", m.memory_usage_percent, m.memory_limit_gb);
            println!("  Containers    : {} total  {} running  {} stopped",
                m.total_containers, m.running_containers, m.stopped_containers);
            println!("  Images        : {}", m.total_images);
            println!("  Networks      : {}", m.total_networks);
            println!("  Volumes       : {}", m.total_volumes);
            println!("  Collected at  : {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z"));
        }
    }
    Ok(())
}

// ── 列表 ────────────────────────────────────────────────────────────────────

pub fn containers(list: &[ContainerView], format: Format) -> Result<()> {
    if format == Format::Json {
        return print_json(list);
    }
    print_section(&format!("CONTAINERS ({})", list.len()));
    println!("  {:<2} {:<12}  {:<24} {:<24} {:<11} {}", "", "ID", "NAME", "IMAGE", "STATE", "PORTS");
    for c in list {
        let ports: Vec<String> = c.ports.iter().map(|p| p.to_string()).collect();
        println!("  {:<2} {:<12}  {:<24} {:<24} {:<11} {}",
            state_icon(&c.state.to_string()), c.short_id(), truncate(c.display_name(), 24),
            truncate(&c.image, 24), c.state, ports.join(", "));
        println!("  {:<2} {:<12}  {}", "", "", c.status);
    }
    Ok(())
}

pub fn images(list: &[ImageView], format: Format) -> Result<()> {
    if format == Format::Json {
        return print_json(list);
    }
    print_section(&format!("IMAGES ({})", list.len()));
    println!("  {:<19}  {:<36} {:<20} {}", "ID", "TAGS", "CREATED", "SIZE");
    for i in list {
        let tags = if i.repo_tags.is_empty() { "<none>".to_string() } else { i.repo_tags.join(", ") };
        println!("  {:<19}  {:<36} {:<20} {}",
            i.id.chars().take(19).collect::<String>(), truncate(&tags, 36),
            fmt_timestamp(i.created), fmt_bytes(i.size_bytes));
    }
    Ok(())
}

pub fn networks(list: &[NetworkView], format: Format) -> Result<()> {
    if format == Format::Json {
        return print_json(list);
    }
    print_section(&format!("NETWORKS ({})", list.len()));
    println!("  {:<12}  {:<24} {:<10} {:<8}", "ID", "NAME", "DRIVER", "SCOPE");
    for n in list {
        println!("  {:<12}  {:<24} {:<10} {:<8}{}",
            n.id.chars().take(12).collect::<String>(), truncate(&n.name, 24), n.driver, n.scope,
            if n.reserved { "  (reserved)" } else { "" });
    }
    Ok(())
}

pub fn volumes(list: &[VolumeView], format: Format) -> Result<()> {
    if format == Format::Json {
        return print_json(list);
    }
    print_section(&format!("VOLUMES ({})", list.len()));
    println!("  {:<28} {:<8} {}", "NAME", "DRIVER", "MOUNTPOINT");
    for v in list {
        println!("  {:<28} {:<8} {}", truncate(&v.name, 28), v.driver, v.mountpoint);
    }
    Ok(())
}

// ── 日志 ────────────────────────────────────────────────────────────────────

pub fn log_line(line: &LogLine, format: Format, with_stream: bool) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(line)?),
        Format::Text if with_stream => println!("{:<6} | {}", line.stream, line.text),
        Format::Text => println!("{}", line.text),
    }
    Ok(())
}

// ── Docker Hub ──────────────────────────────────────────────────────────────

pub fn hub_repository(name: &str, repo: Option<&HubRepository>, format: Format) -> Result<()> {
    if format == Format::Json {
        return print_json(&repo);
    }
    let Some(r) = repo else {
        println!("No official image named {:?} on Docker Hub", name);
        return Ok(());
    };
    print_section(&format!("library/{}", r.name));
    println!("  Stars        : {}", r.star_count);
    println!("  Pulls        : {}", r.pull_count);
    if let Some(at) = r.last_updated_at() {
        println!("  Last updated : {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();
    println!("  {}", r.description.as_deref().unwrap_or("No description available."));
    Ok(())
}

pub fn done(action: &str, target: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => print_json(&serde_json::json!({ "action": action, "target": target, "ok": true })),
        Format::Text => {
            println!("{} {}", action, target);
            Ok(())
        }
    }
}

// ── 格式化工具 ───────────────────────────────────────────────────────────────

fn print_section(title: &str) {
    println!("\n{}", "─".repeat(60));
    println!("  {}", title);
    println!("{}", "─".repeat(60));
}

fn state_icon(state: &str) -> &'static str {
    match state {
        "running"    => "●",
        "exited"     => "○",
        "paused"     => "⏸",
        "restarting" => "↻",
        _            => "?",
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn fmt_timestamp(unix: i64) -> String {
    chrono::DateTime::from_timestamp(unix, 0)
        .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn fmt_bytes(b: u64) -> String {
    if b >= 1 << 30 {
        format!("{:.1}GiB", b as f64 / (1u64 << 30) as f64)
    } else if b >= 1 << 20 {
        format!("{:.1}MiB", b as f64 / (1u64 << 20) as f64)
    } else if b >= 1 << 10 {
        format!("{:.1}KiB", b as f64 / (1u64 << 10) as f64)
    } else {
        format!("{}B", b)
    }
}

use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};
use dockwatch::config::ConnectionSettings;

#[derive(Parser)]
#[command(name = "dockwatch")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"))]
#[command(about = "Inspect and control a Docker host over the Engine API", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format (text or json)
    #[arg(short, long, global = true, default_value = "text")]
    pub output: String,

    /// Verbose logging (repeat for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Engine address, ip_or_domain[:port]
    #[arg(short = 'H', long, global = true, env = "DOCKWATCH_HOST")]
    pub host: Option<String>,

    /// http or https
    #[arg(long, global = true, env = "DOCKWATCH_SCHEME")]
    pub scheme: Option<String>,

    /// JSON connection profile {host, protocol, ca, cert, key}
    #[arg(long, global = true, env = "DOCKWATCH_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Directory containing ca.pem, cert.pem and key.pem
    #[arg(long, global = true, env = "DOCKER_CERT_PATH")]
    pub tls_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "DOCKWATCH_TLS_CA")]
    pub tls_ca: Option<PathBuf>,

    #[arg(long, global = true, env = "DOCKWATCH_TLS_CERT")]
    pub tls_cert: Option<PathBuf>,

    #[arg(long, global = true, env = "DOCKWATCH_TLS_KEY")]
    pub tls_key: Option<PathBuf>,

    /// Per-call timeout in seconds (0 = none)
    #[arg(long, global = true, env = "DOCKWATCH_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            profile_file: self.profile.clone(),
            host:         self.host.clone(),
            scheme:       self.scheme.clone(),
            tls_dir:      self.tls_dir.clone(),
            tls_ca:       self.tls_ca.clone(),
            tls_cert:     self.tls_cert.clone(),
            tls_key:      self.tls_key.clone(),
            timeout_secs: self.timeout,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dashboard summary of the host
    Snapshot,

    /// List containers
    Containers {
        /// Include stopped containers
        #[arg(short, long)]
        all: bool,
    },

    /// List images
    Images,

    /// List networks
    Networks,

    /// List volumes
    Volumes,

    /// Show container logs
    #[command(arg_required_else_help = true)]
    Logs {
        /// Container ID or name
        container: String,

        /// Number of lines from the end ("all" for everything)
        #[arg(short = 'n', long, default_value = "100")]
        tail: String,

        /// Keep streaming new output
        #[arg(short, long)]
        follow: bool,

        /// Prefix each line with its stream (stdout/stderr)
        #[arg(long)]
        streams: bool,
    },

    /// Start a container
    Start { container: String },

    /// Stop a container
    Stop { container: String },

    /// Restart a container
    Restart { container: String },

    /// Remove a container
    Rm {
        container: String,
        #[arg(short, long)]
        force: bool,
    },

    /// Remove an image
    Rmi {
        image: String,
        #[arg(short, long)]
        force: bool,
    },

    /// Remove a network
    NetworkRm { network: String },

    /// Remove a volume
    VolumeRm { volume: String },

    /// Look up an official image on Docker Hub
    Search { name: String },
}

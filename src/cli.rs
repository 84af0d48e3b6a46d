use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "kube-pulse",
    version,
    about = "A live terminal dashboard for Kubernetes workloads."
)]
pub struct CliArgs {
    /// Path to a kubeconfig file (defaults to $KUBECONFIG or in-cluster config)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Start scoped to a namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    pub refresh_ms: Option<u64>,

    /// Local port used for port-forwards
    #[arg(long)]
    pub forward_port: Option<u16>,

    /// Number of log lines shown in the log viewer
    #[arg(long)]
    pub log_tail: Option<i64>,

    /// Explicit config file (otherwise discovered)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append tracing output to this file instead of discarding it
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

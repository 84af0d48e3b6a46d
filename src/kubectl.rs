use crate::model::WorkloadKey;
use crate::registry::{Launcher, PortMapping, ProcessHandle};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command as TokioCommand};

/// Base `kubectl` invocation honouring an explicit kubeconfig.
pub fn kubectl(kubeconfig: Option<&PathBuf>) -> TokioCommand {
    let mut cmd = TokioCommand::new("kubectl");
    if let Some(path) = kubeconfig {
        cmd.arg("--kubeconfig").arg(path);
    }
    cmd
}

pub fn shell_command(
    kubeconfig: Option<&PathBuf>,
    key: &WorkloadKey,
    container: &str,
) -> TokioCommand {
    let mut cmd = kubectl(kubeconfig);
    cmd.arg("exec")
        .arg("-it")
        .arg("-n")
        .arg(&key.namespace)
        .arg(&key.name);
    if !container.is_empty() {
        cmd.arg("-c").arg(container);
    }
    cmd.arg("--")
        .arg("/bin/sh")
        .arg("-c")
        .arg("bash || sh")
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}

pub async fn fetch_manifest(kubeconfig: Option<&PathBuf>, key: &WorkloadKey) -> Result<String> {
    let output = kubectl(kubeconfig)
        .arg("get")
        .arg("pod")
        .arg(&key.name)
        .arg("-n")
        .arg(&key.namespace)
        .arg("-o")
        .arg("yaml")
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("failed to run kubectl get for {key}"))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        anyhow::bail!("kubectl get exited with {}", output.status);
    }
    anyhow::bail!("kubectl get exited with {}: {stderr}", output.status)
}

#[derive(Debug, Clone, Default)]
pub struct KubectlLauncher {
    kubeconfig: Option<PathBuf>,
}

impl KubectlLauncher {
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self { kubeconfig }
    }
}

impl Launcher for KubectlLauncher {
    fn launch(&self, key: &WorkloadKey, mapping: PortMapping) -> Result<Box<dyn ProcessHandle>> {
        let child = kubectl(self.kubeconfig.as_ref())
            .arg("port-forward")
            .arg("-n")
            .arg(&key.namespace)
            .arg(format!("pod/{}", key.name))
            .arg(format!("{}:{}", mapping.local_port, mapping.remote_port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn port-forward for {key}"))?;

        Ok(Box::new(ChildHandle { child }))
    }
}

struct ChildHandle {
    child: Child,
}

impl ProcessHandle for ChildHandle {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn terminate(&mut self) -> Result<()> {
        self.child
            .start_kill()
            .context("failed to signal kubectl port-forward")
    }
}

// src/sync/transport.rs
use std::fmt;
use std::process::Command;

/// Command that prints the remote kubeconfig on stdout.
const REMOTE_KUBECONFIG_COMMAND: &str = "cat ~/.kube/config";

#[derive(Debug)]
pub struct TransportError {
    pub message: String,
    pub stderr: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stderr.trim().is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.message, self.stderr.trim_end())
        }
    }
}

impl std::error::Error for TransportError {}

pub trait Transport {
    fn fetch(&self, user: &str, host: &str) -> Result<Vec<u8>, TransportError>;
}

/// Fetches the remote kubeconfig by shelling out to `ssh`.
pub struct SshTransport {
    ssh_key_path: Option<String>,
    connect_timeout_secs: u64,
}

impl SshTransport {
    pub fn new(ssh_key_path: Option<String>, connect_timeout_secs: u64) -> Self {
        Self {
            ssh_key_path,
            connect_timeout_secs,
        }
    }
}

impl Transport for SshTransport {
    fn fetch(&self, user: &str, host: &str) -> Result<Vec<u8>, TransportError> {
        let mut command = Command::new("ssh");
        command
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout_secs))
            // A dead link must surface as a failed command, not a hang.
            .arg("-o")
            .arg("ServerAliveInterval=15")
            .arg("-o")
            .arg("ServerAliveCountMax=2");

        if let Some(key_path) = &self.ssh_key_path {
            command
                .arg("-i")
                .arg(shellexpand::tilde(key_path).to_string());
        }

        command
            .arg(format!("{}@{}", user, host))
            .arg(REMOTE_KUBECONFIG_COMMAND);

        let output = command.output().map_err(|e| TransportError {
            message: format!("failed to run ssh: {}", e),
            stderr: String::new(),
        })?;

        if !output.status.success() {
            return Err(TransportError {
                message: format!("ssh command failed ({})", output.status),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(output.stdout)
    }
}

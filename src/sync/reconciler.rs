// src/sync/reconciler.rs
use std::fmt;
use std::io;
use std::path::PathBuf;

use url::Url;

use crate::kubeconfig::{self, KubeConfig};
use crate::utils::logging::Logger;

use super::transport::{Transport, TransportError};

#[derive(Debug)]
pub enum SyncError {
    ContextNotFound(String),
    ClusterNotFound(String),
    UserNotFound(String),
    InvalidServerUrl(String),
    AmbiguousRemoteCluster(usize),
    AmbiguousRemoteUser(usize),
    Transport(TransportError),
    Parse(serde_yaml::Error),
    Write(io::Error),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextNotFound(name) => {
                write!(f, "context '{}' not found in local kubeconfig", name)
            }
            Self::ClusterNotFound(name) => {
                write!(f, "cluster '{}' not found in local kubeconfig", name)
            }
            Self::UserNotFound(name) => {
                write!(f, "user '{}' not found in local kubeconfig", name)
            }
            Self::InvalidServerUrl(server) => {
                write!(f, "cluster server URL '{}' has no usable host", server)
            }
            Self::AmbiguousRemoteCluster(count) => write!(
                f,
                "remote kubeconfig has {} clusters and none matches the local cluster name",
                count
            ),
            Self::AmbiguousRemoteUser(count) => write!(
                f,
                "remote kubeconfig has {} users and none matches the local user name",
                count
            ),
            Self::Transport(e) => write!(f, "failed to fetch remote kubeconfig: {}", e),
            Self::Parse(e) => write!(f, "failed to parse remote kubeconfig: {}", e),
            Self::Write(e) => write!(f, "failed to write updated kubeconfig: {}", e),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<TransportError> for SyncError {
    fn from(error: TransportError) -> Self {
        SyncError::Transport(error)
    }
}

impl From<SyncError> for io::Error {
    fn from(error: SyncError) -> Self {
        let kind = match &error {
            SyncError::ContextNotFound(_)
            | SyncError::ClusterNotFound(_)
            | SyncError::UserNotFound(_) => io::ErrorKind::NotFound,
            SyncError::InvalidServerUrl(_) | SyncError::Parse(_) => io::ErrorKind::InvalidData,
            SyncError::Write(e) => e.kind(),
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated,
    UpToDate,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub config_path: PathBuf,
    pub remote_user: String,
    pub host_override: Option<String>,
    pub sync_all: bool,
}

/// Reconciles the credential fields of a local kubeconfig context against
/// the kubeconfig fetched from the cluster host itself.
pub struct Reconciler<T: Transport> {
    transport: T,
    options: SyncOptions,
    logger: Box<dyn Logger>,
}

impl<T: Transport> Reconciler<T> {
    pub fn new(transport: T, options: SyncOptions, logger: Box<dyn Logger>) -> Self {
        Self {
            transport,
            options,
            logger,
        }
    }

    /// Syncs a single context. Saves the local kubeconfig back to its
    /// original path only when a field actually changed.
    pub fn sync_context(
        &mut self,
        name: &str,
        local: &mut KubeConfig,
    ) -> Result<SyncOutcome, SyncError> {
        let context = local
            .context(name)
            .ok_or_else(|| SyncError::ContextNotFound(name.to_string()))?;
        let cluster_name = context.cluster.clone();
        let user_name = context.user.clone();

        let server = local
            .cluster(&cluster_name)
            .map(|cluster| cluster.server.clone())
            .ok_or_else(|| SyncError::ClusterNotFound(cluster_name.clone()))?;
        if local.user(&user_name).is_none() {
            return Err(SyncError::UserNotFound(user_name));
        }

        let host = match &self.options.host_override {
            Some(host) => host.clone(),
            None => host_from_server(&server)?,
        };

        self.logger.log(&format!(
            "Connecting to {}@{} to fetch the remote kubeconfig...",
            self.options.remote_user, host
        ));
        let raw = self.transport.fetch(&self.options.remote_user, &host)?;
        self.logger
            .debug_log(&format!("fetched {} bytes from {}", raw.len(), host));

        let remote = kubeconfig::parse(&raw).map_err(SyncError::Parse)?;

        let mut changed = false;
        changed |= self.merge_cluster(&cluster_name, &remote, local)?;
        changed |= self.merge_user(&user_name, &remote, local)?;

        if changed {
            kubeconfig::save(local, &self.options.config_path).map_err(SyncError::Write)?;
            self.logger.debug_log(&format!(
                "wrote updated kubeconfig to {}",
                self.options.config_path.display()
            ));
            Ok(SyncOutcome::Updated)
        } else {
            Ok(SyncOutcome::UpToDate)
        }
    }

    /// Syncs every context, isolating failures: one broken context never
    /// aborts the rest. Returns the per-context outcomes in name order.
    pub fn sync_all(
        &mut self,
        local: &mut KubeConfig,
    ) -> Vec<(String, Result<SyncOutcome, SyncError>)> {
        let mut outcomes = Vec::new();
        for name in local.context_names() {
            self.logger.log(&format!("Syncing context: {}", name));
            let result = self.sync_context(&name, local);
            outcomes.push((name, result));
        }
        outcomes
    }

    fn merge_cluster(
        &mut self,
        cluster_name: &str,
        remote: &KubeConfig,
        local: &mut KubeConfig,
    ) -> Result<bool, SyncError> {
        let remote_cluster = match select_by_name(&remote.clusters, cluster_name, |named| {
            named.name.as_str()
        }) {
            Ok(Some(named)) => &named.cluster,
            Ok(None) => return Ok(false),
            Err(count) => return Err(SyncError::AmbiguousRemoteCluster(count)),
        };

        let local_cluster = local
            .cluster_mut(cluster_name)
            .ok_or_else(|| SyncError::ClusterNotFound(cluster_name.to_string()))?;

        let mut changed = false;
        if local_cluster.certificate_authority_data != remote_cluster.certificate_authority_data {
            self.logger.log("Updating certificate-authority-data...");
            local_cluster.certificate_authority_data =
                remote_cluster.certificate_authority_data.clone();
            changed = true;
        }
        Ok(changed)
    }

    fn merge_user(
        &mut self,
        user_name: &str,
        remote: &KubeConfig,
        local: &mut KubeConfig,
    ) -> Result<bool, SyncError> {
        let remote_user =
            match select_by_name(&remote.users, user_name, |named| named.name.as_str()) {
                Ok(Some(named)) => &named.user,
                Ok(None) => return Ok(false),
                Err(count) => return Err(SyncError::AmbiguousRemoteUser(count)),
            };

        let local_user = local
            .user_mut(user_name)
            .ok_or_else(|| SyncError::UserNotFound(user_name.to_string()))?;

        let mut changed = false;
        if local_user.client_certificate_data != remote_user.client_certificate_data {
            self.logger.log("Updating client-certificate-data...");
            local_user.client_certificate_data = remote_user.client_certificate_data.clone();
            changed = true;
        }
        if local_user.client_key_data != remote_user.client_key_data {
            self.logger.log("Updating client-key-data...");
            local_user.client_key_data = remote_user.client_key_data.clone();
            changed = true;
        }
        Ok(changed)
    }
}

/// Picks the remote record to merge from. Name match wins; a lone record is
/// accepted under any name; several records with no name match is an error
/// carried as `Err(count)`.
fn select_by_name<'a, T>(
    records: &'a [T],
    name: &str,
    record_name: impl Fn(&T) -> &str,
) -> Result<Option<&'a T>, usize> {
    if let Some(record) = records.iter().find(|record| record_name(record) == name) {
        return Ok(Some(record));
    }
    match records.len() {
        0 => Ok(None),
        1 => Ok(Some(&records[0])),
        count => Err(count),
    }
}

/// Derives the SSH host from a cluster server value. Absolute URLs yield
/// their host; anything else is treated as `host[:port]`.
pub fn host_from_server(server: &str) -> Result<String, SyncError> {
    if let Ok(parsed) = Url::parse(server) {
        if let Some(host) = parsed.host_str() {
            // url keeps the brackets on IPv6 hosts; ssh wants them bare.
            return Ok(host.trim_matches(|c| c == '[' || c == ']').to_string());
        }
    }

    let stripped = server.strip_prefix("https://").unwrap_or(server);
    let host = stripped.split(':').next().unwrap_or("");
    if host.is_empty() {
        return Err(SyncError::InvalidServerUrl(server.to_string()));
    }
    Ok(host.to_string())
}

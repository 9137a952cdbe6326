// src/kubeconfig/store.rs
use std::fs;
use std::io;
use std::path::Path;

use super::KubeConfig;

pub fn load(path: &Path) -> io::Result<KubeConfig> {
    let contents = fs::read_to_string(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("failed to read kubeconfig {}: {}", path.display(), e),
        )
    })?;
    parse(contents.as_bytes()).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed to parse kubeconfig {}: {}", path.display(), e),
        )
    })
}

pub fn parse(bytes: &[u8]) -> Result<KubeConfig, serde_yaml::Error> {
    serde_yaml::from_slice(bytes)
}

/// Writes to a temp file in the same directory, then renames over the
/// target, so an interrupted save never leaves a half-written kubeconfig.
pub fn save(config: &KubeConfig, path: &Path) -> io::Result<()> {
    let yaml = serde_yaml::to_string(config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("kubeconfig");
    let tmp = dir.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    fs::write(&tmp, yaml)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> KubeConfig {
        parse(
            b"\
apiVersion: v1
kind: Config
clusters:
- name: c1
  cluster:
    server: https://10.0.0.5:6443
    certificate-authority-data: AQ==
contexts:
- name: staging
  context:
    cluster: c1
    user: u1
users:
- name: u1
  user:
    client-certificate-data: Ag==
    client-key-data: Aw==
",
        )
        .unwrap()
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");

        let config = sample();
        save(&config, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");

        save(&sample(), &path).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("config")]);
    }

    #[test]
    fn load_reports_the_missing_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope");

        let error = load(&path).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert!(error.to_string().contains("nope"));
    }

    #[test]
    fn load_rejects_malformed_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "clusters: [unterminated").unwrap();

        let error = load(&path).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}

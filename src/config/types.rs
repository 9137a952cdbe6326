// config/types.rs
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Optional defaults file, read from `~/.config/kctxsync/settings.json`.
/// Command-line flags always win over values found here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_remote_user")]
    pub remote_user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig_path: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_remote_user() -> String {
    "root".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_user: default_remote_user(),
            ssh_key_path: None,
            kubeconfig_path: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kctxsync").join("settings.json"))
    }

    pub fn load() -> io::Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    // A missing settings file is the normal case and yields the defaults.
    pub fn load_from_file(path: &Path) -> io::Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("failed to parse settings {}: {}", path.display(), e),
                )
            }),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> io::Result<()> {
        if let Some(key_path) = &self.ssh_key_path {
            if !Path::new(&shellexpand::tilde(key_path).to_string()).exists() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("SSH key not found at: {}", key_path),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from_file(&dir.path().join("settings.json")).unwrap();

        assert_eq!(settings.remote_user, "root");
        assert_eq!(settings.connect_timeout_secs, 10);
        assert!(settings.ssh_key_path.is_none());
        assert!(settings.kubeconfig_path.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"remote_user": "ubuntu", "connect_timeout_secs": 3}"#,
        )
        .unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        assert_eq!(settings.remote_user, "ubuntu");
        assert_eq!(settings.connect_timeout_secs, 3);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        assert!(Settings::load_from_file(&path).is_err());
    }

    #[test]
    fn validate_rejects_a_missing_ssh_key() {
        let settings = Settings {
            ssh_key_path: Some("/definitely/not/here/id_rsa".to_string()),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_accepts_an_existing_ssh_key() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("id_rsa");
        fs::write(&key_path, "key material").unwrap();

        let settings = Settings {
            ssh_key_path: Some(key_path.to_str().unwrap().to_string()),
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }
}

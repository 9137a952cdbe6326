// src/kubeconfig/types.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use serde_yaml::Value;

/// A kubeconfig document (`apiVersion: v1`, `kind: Config`).
///
/// Only the fields the sync procedure touches are modeled as typed fields;
/// everything else is carried through the flattened `extra` maps so a
/// load/save cycle preserves content this tool does not understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubeConfig {
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<NamedCluster>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<NamedContext>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<NamedAuthInfo>,
    #[serde(
        rename = "current-context",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_context: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_kind() -> String {
    "Config".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAuthInfo {
    pub name: String,
    pub user: AuthInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,
    #[serde(
        rename = "certificate-authority-data",
        default,
        with = "b64",
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate_authority_data: Option<Vec<u8>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(
        rename = "client-certificate-data",
        default,
        with = "b64",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_certificate_data: Option<Vec<u8>>,
    #[serde(
        rename = "client-key-data",
        default,
        with = "b64",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_key_data: Option<Vec<u8>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub cluster: String,
    pub user: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl KubeConfig {
    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts
            .iter()
            .find(|named| named.name == name)
            .map(|named| &named.context)
    }

    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters
            .iter()
            .find(|named| named.name == name)
            .map(|named| &named.cluster)
    }

    pub fn cluster_mut(&mut self, name: &str) -> Option<&mut Cluster> {
        self.clusters
            .iter_mut()
            .find(|named| named.name == name)
            .map(|named| &mut named.cluster)
    }

    pub fn user(&self, name: &str) -> Option<&AuthInfo> {
        self.users
            .iter()
            .find(|named| named.name == name)
            .map(|named| &named.user)
    }

    pub fn user_mut(&mut self, name: &str) -> Option<&mut AuthInfo> {
        self.users
            .iter_mut()
            .find(|named| named.name == name)
            .map(|named| &mut named.user)
    }

    /// All context names, sorted ascending.
    pub fn context_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .contexts
            .iter()
            .map(|named| named.name.clone())
            .collect();
        names.sort();
        names
    }
}

// Kubeconfig stores binary credential fields base64-encoded.
mod b64 {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => general_purpose::STANDARD.encode(bytes).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => general_purpose::STANDARD
                .decode(encoded.trim())
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
apiVersion: v1
kind: Config
preferences: {}
current-context: staging
clusters:
- name: staging
  cluster:
    server: https://10.0.0.5:6443
    certificate-authority-data: AQ==
contexts:
- name: staging
  context:
    cluster: staging
    user: admin
    namespace: kube-system
users:
- name: admin
  user:
    client-certificate-data: Ag==
    client-key-data: Aw==
- name: token-user
  user:
    token: sekret
";

    #[test]
    fn parses_credential_fields_as_bytes() {
        let config: KubeConfig = serde_yaml::from_str(SAMPLE).unwrap();

        let cluster = config.cluster("staging").unwrap();
        assert_eq!(cluster.server, "https://10.0.0.5:6443");
        assert_eq!(cluster.certificate_authority_data, Some(vec![0x01]));

        let user = config.user("admin").unwrap();
        assert_eq!(user.client_certificate_data, Some(vec![0x02]));
        assert_eq!(user.client_key_data, Some(vec![0x03]));

        let context = config.context("staging").unwrap();
        assert_eq!(context.cluster, "staging");
        assert_eq!(context.user, "admin");
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let config: KubeConfig = serde_yaml::from_str(SAMPLE).unwrap();

        // namespace on the context, token auth and top-level preferences are
        // not modeled fields and must ride along in the extras.
        assert!(config.context("staging").unwrap().extra.contains_key("namespace"));
        assert!(config.user("token-user").unwrap().extra.contains_key("token"));
        assert!(config.extra.contains_key("preferences"));

        let rendered = serde_yaml::to_string(&config).unwrap();
        let reparsed: KubeConfig = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(config, reparsed);
    }

    #[test]
    fn context_names_are_sorted() {
        let config: KubeConfig = serde_yaml::from_str(
            "\
contexts:
- name: b
  context:
    cluster: c
    user: u
- name: a
  context:
    cluster: c
    user: u
",
        )
        .unwrap();
        assert_eq!(config.context_names(), vec!["a", "b"]);
    }

    #[test]
    fn empty_document_lists_no_contexts() {
        let config: KubeConfig = serde_yaml::from_str("apiVersion: v1\nkind: Config\n").unwrap();
        assert!(config.context_names().is_empty());
    }

    #[test]
    fn rejects_invalid_base64_data() {
        let result: Result<KubeConfig, _> = serde_yaml::from_str(
            "\
clusters:
- name: bad
  cluster:
    server: https://10.0.0.5:6443
    certificate-authority-data: '%%%'
",
        );
        assert!(result.is_err());
    }
}

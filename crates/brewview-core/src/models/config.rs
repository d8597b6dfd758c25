use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Namespaces {
    #[serde(default)]
    pub local: Option<String>,
    #[serde(default)]
    pub remote: Vec<String>,
}

/// Console configuration served by the backend's `/config` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_auth_enabled")]
    pub auth_enabled: bool,
    #[serde(default = "default_application_name")]
    pub application_name: String,
    #[serde(default)]
    pub namespaces: Namespaces,
}

fn default_auth_enabled() -> bool {
    true
}

fn default_application_name() -> String {
    "Beer Garden".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            auth_enabled: default_auth_enabled(),
            application_name: default_application_name(),
            namespaces: Namespaces::default(),
        }
    }
}

impl ServerConfig {
    /// Local namespace first, then remote ones.
    pub fn all_namespaces(&self) -> Vec<String> {
        self.namespaces
            .local
            .iter()
            .chain(self.namespaces.remote.iter())
            .cloned()
            .collect()
    }
}

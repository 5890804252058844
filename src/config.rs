// Bridge Configuration
// Server binding, resource identifiers and page limits per legacy kind, and the
// static datasource table. Loaded from TOML with environment overrides.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::datasources::DataSource;
use crate::resource::GroupVersionResource;
use crate::selector::PageLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub annotations: ResourceConfig,
    pub correlations: ResourceConfig,
    /// Default `limit` of the annotation tags endpoint
    pub tags_default_limit: u64,
    pub datasources: Vec<DataSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where one legacy kind lives in the generic store, and its list limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub group: String,
    pub version: String,
    pub resource: String,
    pub kind: String,
    #[serde(default = "default_list_limit")]
    pub default_limit: u64,
    #[serde(default = "max_list_limit")]
    pub max_limit: u64,
}

fn default_list_limit() -> u64 {
    100
}

fn max_list_limit() -> u64 {
    1000
}

impl ResourceConfig {
    pub fn new(group: &str, version: &str, resource: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
            kind: kind.to_string(),
            default_limit: default_list_limit(),
            max_limit: max_list_limit(),
        }
    }

    pub fn gvr(&self) -> GroupVersionResource {
        GroupVersionResource::new(&self.group, &self.version, &self.resource)
    }

    pub fn limits(&self) -> PageLimits {
        PageLimits::new(self.default_limit, self.max_limit)
    }

    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }

    fn validate(&self, section: &str) -> Result<()> {
        for (field, value) in [
            ("group", &self.group),
            ("version", &self.version),
            ("resource", &self.resource),
            ("kind", &self.kind),
        ] {
            if value.trim().is_empty() {
                bail!("{section}.{field} cannot be empty");
            }
        }
        if self.default_limit == 0 || self.max_limit == 0 {
            bail!("{section} limits must be greater than zero");
        }
        if self.default_limit > self.max_limit {
            bail!(
                "{section}.default_limit ({}) exceeds {section}.max_limit ({})",
                self.default_limit,
                self.max_limit
            );
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            annotations: ResourceConfig::new(
                "annotation.grafana.app",
                "v0alpha1",
                "annotations",
                "Annotation",
            ),
            correlations: ResourceConfig::new(
                "correlations.grafana.app",
                "v0alpha1",
                "correlations",
                "Correlation",
            ),
            tags_default_limit: 100,
            datasources: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: BridgeConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// File (or defaults) plus environment overrides, validated
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override with environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("BRIDGE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("BRIDGE_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("BRIDGE_PORT is not a valid port: {port:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            bail!("server.host cannot be empty");
        }
        self.annotations.validate("annotations")?;
        self.correlations.validate("correlations")?;
        if self.annotations.gvr() == self.correlations.gvr() {
            bail!("annotations and correlations must use different resources");
        }
        if self.tags_default_limit == 0 {
            bail!("tags_default_limit must be greater than zero");
        }
        for ds in &self.datasources {
            if ds.uid.trim().is_empty() {
                bail!("datasource uid cannot be empty");
            }
            if ds.org_id < 1 {
                bail!("datasource {} has invalid org_id {}", ds.uid, ds.org_id);
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

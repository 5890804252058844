// Datasource Lookup
// Side lookups the correlation adapter performs before building a spec: does a
// datasource exist in the caller's org, what type is it, is it read-only.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::context::{RequestContext, DEFAULT_ORG_ID};

fn default_org_id() -> i64 {
    DEFAULT_ORG_ID
}

/// A datasource as the correlation adapter sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub uid: String,
    /// Plugin type; used as the reference group in correlation specs
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_org_id")]
    pub org_id: i64,
}

impl DataSource {
    pub fn new(uid: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            type_name: type_name.into(),
            read_only: false,
            org_id: DEFAULT_ORG_ID,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn in_org(mut self, org_id: i64) -> Self {
        self.org_id = org_id;
        self
    }
}

#[async_trait]
pub trait DatasourceLookup: Send + Sync {
    /// Datasource with the given uid in the caller's org, if any
    async fn get_by_uid(&self, ctx: &RequestContext, uid: &str) -> Result<Option<DataSource>>;
}

/// Fixed datasource table, typically loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticDatasources {
    by_org_uid: HashMap<(i64, String), DataSource>,
}

impl StaticDatasources {
    pub fn new(datasources: impl IntoIterator<Item = DataSource>) -> Self {
        let by_org_uid = datasources
            .into_iter()
            .map(|ds| ((ds.org_id, ds.uid.clone()), ds))
            .collect();
        Self { by_org_uid }
    }

    pub fn len(&self) -> usize {
        self.by_org_uid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_org_uid.is_empty()
    }
}

#[async_trait]
impl DatasourceLookup for StaticDatasources {
    async fn get_by_uid(&self, ctx: &RequestContext, uid: &str) -> Result<Option<DataSource>> {
        Ok(self
            .by_org_uid
            .get(&(ctx.org_id, uid.to_string()))
            .cloned())
    }
}

// Generic Resource API Contract
// Typed group/version/resource objects with system metadata and a schemaless spec,
// plus the client interface the legacy adapters drive. Implementations live
// elsewhere (`memory` ships an in-process one).

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::context::RequestContext;
use crate::value::SpecDocument;

pub use memory::{MemoryClientProvider, MemoryResourceStore, StoreCallCounts};

/// Annotation key marking an object as provisioned out of band (value "true")
pub const PROVENANCE_ANNOTATION: &str = "grafana.app/provisioned";

/// Identifies a resource collection in the generic store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// `group/version` as carried in an object's `apiVersion`
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}/{}", self.resource, self.group, self.version)
    }
}

/// System-managed metadata of a generic resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generate_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Schemaless resource envelope: metadata plus spec document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceObject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: SpecDocument,
}

impl ResourceObject {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }

    /// Provisioned objects are read-only through the legacy API
    pub fn is_provisioned(&self) -> bool {
        self.annotation(PROVENANCE_ANNOTATION) == Some("true")
    }

    pub fn mark_provisioned(&mut self) {
        self.metadata
            .annotations
            .insert(PROVENANCE_ANNOTATION.to_string(), "true".to_string());
    }
}

/// Metadata of a list response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    #[serde(default, rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
}

/// One page of a list call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default)]
    pub items: Vec<ResourceObject>,
}

impl ResourceList {
    pub fn continue_token(&self) -> Option<&str> {
        self.metadata.continue_token.as_deref()
    }
}

/// Selector and pagination request for a list call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Comma-joined `path=value` clauses (logical AND)
    pub field_selector: Option<String>,
    pub label_selector: Option<String>,
    /// Page size; 0 means unbounded
    pub limit: u64,
    pub continue_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Delete only when the stored resource version still matches
    pub precondition_resource_version: Option<String>,
}

/// Machine-readable category of a `StatusError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusReason {
    NotFound,
    AlreadyExists,
    Conflict,
    Invalid,
    BadRequest,
    Forbidden,
    InternalError,
}

/// Structured error returned by the generic store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct StatusError {
    pub code: u16,
    pub reason: StatusReason,
    pub message: String,
}

impl StatusError {
    pub fn new(code: u16, reason: StatusReason, message: impl Into<String>) -> Self {
        Self {
            code,
            reason,
            message: message.into(),
        }
    }

    pub fn not_found(gvr: &GroupVersionResource, name: &str) -> Self {
        Self::new(
            404,
            StatusReason::NotFound,
            format!("{}.{} \"{}\" not found", gvr.resource, gvr.group, name),
        )
    }

    pub fn already_exists(gvr: &GroupVersionResource, name: &str) -> Self {
        Self::new(
            409,
            StatusReason::AlreadyExists,
            format!("{}.{} \"{}\" already exists", gvr.resource, gvr.group, name),
        )
    }

    pub fn conflict(gvr: &GroupVersionResource, name: &str) -> Self {
        Self::new(
            409,
            StatusReason::Conflict,
            format!(
                "Operation cannot be fulfilled on {}.{} \"{}\": the object has been modified",
                gvr.resource, gvr.group, name
            ),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, StatusReason::BadRequest, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(422, StatusReason::Invalid, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.reason == StatusReason::NotFound
    }
}

/// Client for one resource collection, scoped to a single namespace.
///
/// Errors are `anyhow::Error`; a structured store failure is carried as a
/// `StatusError` inside it so callers can downcast and pass it through.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn list(&self, ctx: &RequestContext, opts: &ListOptions) -> anyhow::Result<ResourceList>;

    async fn get(&self, ctx: &RequestContext, name: &str) -> anyhow::Result<ResourceObject>;

    async fn create(
        &self,
        ctx: &RequestContext,
        obj: ResourceObject,
        opts: &CreateOptions,
    ) -> anyhow::Result<ResourceObject>;

    /// Replace an object. A non-empty `metadata.resource_version` is checked
    /// against the stored version.
    async fn update(
        &self,
        ctx: &RequestContext,
        obj: ResourceObject,
        opts: &UpdateOptions,
    ) -> anyhow::Result<ResourceObject>;

    async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        opts: &DeleteOptions,
    ) -> anyhow::Result<()>;
}

/// Hands out namespace-scoped clients. Called once per request.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    async fn client_for(
        &self,
        ctx: &RequestContext,
        gvr: &GroupVersionResource,
    ) -> anyhow::Result<Box<dyn ResourceClient>>;
}

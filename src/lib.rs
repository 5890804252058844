// Resource Bridge - legacy annotations and correlations REST served from a generic Resource API
// Root library module

pub mod annotations;
pub mod config;
pub mod context;
pub mod correlations;
pub mod datasources;
pub mod errors;
pub mod generic_api;
pub mod http_server;
pub mod http_types;
pub mod identifier;
pub mod observability;
pub mod resource;
pub mod selector;
pub mod value;

// Re-export key types
pub use observability::{
    init_logging, init_logging_with_level, with_operation, with_trace_id, OperationContext,
};

pub use config::{BridgeConfig, ResourceConfig, ServerConfig};
pub use context::RequestContext;
pub use datasources::{DataSource, DatasourceLookup, StaticDatasources};
pub use errors::AdapterError;

// Re-export the Resource API contract
pub use resource::{
    ClientProvider, CreateOptions, DeleteOptions, GroupVersionResource, ListOptions,
    MemoryClientProvider, MemoryResourceStore, ObjectMeta, ResourceClient, ResourceList,
    ResourceObject, StatusError, StatusReason, UpdateOptions,
};

pub use identifier::{LegacyId, RecordKind};
pub use value::SpecDocument;

// HTTP server
pub use http_server::{create_server, start_server, AppState};

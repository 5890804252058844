// Correlations Adapter
// Serves the legacy datasource correlation routes from the generic correlation
// resource. Correlation uids are used verbatim as resource names.

pub mod handlers;
pub mod mapper;
pub mod merge;
pub mod model;
pub mod query;

pub use handlers::routes;
pub use model::{
    Correlation, CorrelationConfig, CorrelationType, CreateCorrelationCommand, Transformation,
    UpdateCorrelationCommand,
};

pub const NOT_FOUND_MESSAGE: &str = "Correlation not found";
pub const NONE_FOUND_MESSAGE: &str = "No correlation found";
pub const SOURCE_NOT_FOUND_MESSAGE: &str = "Source data source not found";
pub const TARGET_NOT_FOUND_MESSAGE: &str = "Target data source not found";
pub const SOURCE_READ_ONLY_MESSAGE: &str = "Source data source is read only";
pub const PROVISIONED_MESSAGE: &str = "Correlation can only be edited via provisioning";

// Annotations Adapter
// Serves the legacy `/api/annotations` contract from the generic annotation
// resource. Ids are store-assigned and travel as `a-<id>` resource names.

pub mod handlers;
pub mod mapper;
pub mod merge;
pub mod model;
pub mod query;

pub use handlers::routes;
pub use model::{
    AnnotationDto, PatchAnnotationCommand, PostAnnotationCommand, UpdateAnnotationCommand,
};

/// Message used whenever an annotation id does not resolve
pub const NOT_FOUND_MESSAGE: &str = "Annotation not found";

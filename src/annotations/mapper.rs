// Annotation document mapper
// PostAnnotationCommand -> spec document for create, resource -> AnnotationDto for reads.

use tracing::warn;

use super::model::{AnnotationDto, PostAnnotationCommand};
use crate::config::ResourceConfig;
use crate::identifier::{annotation_id, RecordKind};
use crate::resource::ResourceObject;
use crate::value::SpecDocument;

pub const SPEC_TEXT: &str = "text";
pub const SPEC_TIME: &str = "time";
pub const SPEC_TIME_END: &str = "timeEnd";
pub const SPEC_DASHBOARD_UID: &str = "dashboardUID";
pub const SPEC_PANEL_ID: &str = "panelID";
pub const SPEC_TAGS: &str = "tags";

/// Spec document for a new annotation. Zero and empty inputs produce no key.
pub fn to_spec(cmd: &PostAnnotationCommand) -> SpecDocument {
    let mut spec = SpecDocument::new();
    if !cmd.text.is_empty() {
        spec.set(SPEC_TEXT, cmd.text.clone());
    }
    if cmd.time != 0 {
        spec.set(SPEC_TIME, cmd.time);
    }
    if cmd.time_end != 0 {
        spec.set(SPEC_TIME_END, cmd.time_end);
    }
    if !cmd.dashboard_uid.is_empty() {
        spec.set(SPEC_DASHBOARD_UID, cmd.dashboard_uid.clone());
    }
    if cmd.panel_id != 0 {
        spec.set(SPEC_PANEL_ID, cmd.panel_id);
    }
    if !cmd.tags.is_empty() {
        spec.set(SPEC_TAGS, cmd.tags.clone());
    }
    spec
}

/// Resource to create; the store picks the numeric suffix of the name
pub fn to_resource(cmd: &PostAnnotationCommand, resource: &ResourceConfig) -> ResourceObject {
    let mut obj = ResourceObject::new(resource.api_version(), &resource.kind);
    obj.metadata.generate_name = RecordKind::Annotation
        .name_prefix()
        .unwrap_or_default()
        .to_string();
    obj.spec = to_spec(cmd);
    obj
}

/// Legacy view of a stored annotation, or None when its name is not an
/// annotation id. Spec values of an unexpected type read as absent.
pub fn to_legacy(obj: &ResourceObject) -> Option<AnnotationDto> {
    let id = match annotation_id(&obj.metadata.name) {
        Ok(id) => id,
        Err(e) => {
            warn!(name = %obj.metadata.name, error = %e, "skipping resource with foreign name");
            return None;
        }
    };

    let spec = &obj.spec;
    Some(AnnotationDto {
        id,
        dashboard_uid: spec.str(SPEC_DASHBOARD_UID).unwrap_or_default().to_string(),
        panel_id: spec.i64(SPEC_PANEL_ID).unwrap_or_default(),
        time: spec.i64(SPEC_TIME).unwrap_or_default(),
        time_end: spec.i64(SPEC_TIME_END).unwrap_or_default(),
        text: spec.str(SPEC_TEXT).unwrap_or_default().to_string(),
        tags: spec.string_list(SPEC_TAGS).unwrap_or_default(),
        created: obj
            .metadata
            .creation_timestamp
            .map(|ts| ts.timestamp_millis())
            .unwrap_or_default(),
    })
}

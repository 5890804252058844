// Annotation merge engine
// PUT replaces text, time and timeEnd and overwrites tags whenever the command
// carries a list (even an empty one). PATCH only touches non-zero fields.
// Both work on a copy of the stored spec.

use super::mapper::{SPEC_TAGS, SPEC_TEXT, SPEC_TIME, SPEC_TIME_END};
use super::model::{PatchAnnotationCommand, UpdateAnnotationCommand};
use crate::value::SpecDocument;

fn set_or_clear_str(spec: &mut SpecDocument, key: &str, value: &str) {
    if value.is_empty() {
        spec.remove(key);
    } else {
        spec.set(key, value);
    }
}

fn set_or_clear_i64(spec: &mut SpecDocument, key: &str, value: i64) {
    if value == 0 {
        spec.remove(key);
    } else {
        spec.set(key, value);
    }
}

pub fn apply_put(existing: &SpecDocument, cmd: &UpdateAnnotationCommand) -> SpecDocument {
    let mut spec = existing.clone();
    set_or_clear_str(&mut spec, SPEC_TEXT, &cmd.text);
    set_or_clear_i64(&mut spec, SPEC_TIME, cmd.time);
    set_or_clear_i64(&mut spec, SPEC_TIME_END, cmd.time_end);
    if let Some(tags) = &cmd.tags {
        spec.set(SPEC_TAGS, tags.clone());
    }
    spec
}

pub fn apply_patch(existing: &SpecDocument, cmd: &PatchAnnotationCommand) -> SpecDocument {
    let mut spec = existing.clone();
    if !cmd.text.is_empty() {
        spec.set(SPEC_TEXT, cmd.text.clone());
    }
    if cmd.time != 0 {
        spec.set(SPEC_TIME, cmd.time);
    }
    if cmd.time_end != 0 {
        spec.set(SPEC_TIME_END, cmd.time_end);
    }
    if let Some(tags) = &cmd.tags {
        spec.set(SPEC_TAGS, tags.clone());
    }
    spec
}

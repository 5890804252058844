// Correlation merge engine
// PATCH overwrites only the fields the command carries. The nested config
// document is copied before it is touched and written back whole. A switch to
// `external` drops the stored target; a resolved target replaces it.

use super::mapper::{
    reference, transformations_to_value, CONFIG_FIELD, CONFIG_TARGET, CONFIG_TRANSFORMATIONS, SPEC_CONFIG,
    SPEC_DESCRIPTION, SPEC_LABEL, SPEC_TARGET, SPEC_TYPE,
};
use super::model::{CorrelationType, UpdateCorrelationCommand};
use crate::datasources::DataSource;
use crate::errors::AdapterError;
use crate::value::SpecDocument;
use serde_json::Value;

/// `target` is the datasource resolved from the command's `targetUID`, if any
pub fn apply_patch(
    existing: &SpecDocument,
    cmd: &UpdateCorrelationCommand,
    target: Option<&DataSource>,
) -> SpecDocument {
    let mut spec = existing.clone();
    match (target, cmd.correlation_type) {
        (Some(target), _) => spec.set(SPEC_TARGET, reference(target)),
        // external correlations link out by URL, never to a datasource
        (None, Some(CorrelationType::External)) => {
            spec.remove(SPEC_TARGET);
        }
        (None, _) => {}
    }
    if let Some(label) = &cmd.label {
        spec.set(SPEC_LABEL, label.clone());
    }
    if let Some(description) = &cmd.description {
        spec.set(SPEC_DESCRIPTION, description.clone());
    }
    if let Some(correlation_type) = cmd.correlation_type {
        spec.set(SPEC_TYPE, correlation_type.as_str());
    }
    if let Some(update) = cmd.config.as_ref().filter(|c| !c.is_empty()) {
        let mut config = existing.document(SPEC_CONFIG).unwrap_or_default();
        if let Some(field) = &update.field {
            config.set(CONFIG_FIELD, field.clone());
        }
        if let Some(target) = &update.target {
            config.set(CONFIG_TARGET, Value::Object(target.clone()));
        }
        if let Some(transformations) = &update.transformations {
            config.set(CONFIG_TRANSFORMATIONS, transformations_to_value(transformations));
        }
        spec.set(SPEC_CONFIG, config);
    }
    spec
}

/// Type/target consistency of a merged spec
pub fn validate_merged(spec: &SpecDocument) -> Result<(), AdapterError> {
    let correlation_type = CorrelationType::from_spec(spec.str(SPEC_TYPE));
    let has_target = spec.object(SPEC_TARGET).is_some();
    match (correlation_type, has_target) {
        (CorrelationType::External, true) => Err(AdapterError::validation(
            "correlations of type external must not have a targetUID",
        )),
        (CorrelationType::Query, false) => Err(AdapterError::validation(
            "correlations of type query require a targetUID",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlations::model::{CorrelationConfigUpdate, Transformation};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn existing() -> SpecDocument {
        serde_json::from_value(json!({
            "source": {"group": "loki", "name": "test-A"},
            "target": {"group": "tempo", "name": "test-B"},
            "label": "L",
            "description": "old",
            "type": "query",
            "config": {
                "field": "traceID",
                "target": {"query": "q"},
                "transformations": [{"type": "logfmt"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_description_only_patch() {
        let spec = apply_patch(
            &existing(),
            &UpdateCorrelationCommand {
                description: Some("new".into()),
                ..Default::default()
            },
            None,
        );
        assert_eq!(spec.str("description"), Some("new"));
        assert_eq!(spec.str("label"), Some("L"));
        assert_eq!(spec.document("config"), existing().document("config"));
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let before = existing();
        assert_eq!(apply_patch(&before, &UpdateCorrelationCommand::default(), None), before);
        let with_empty_config = UpdateCorrelationCommand {
            config: Some(CorrelationConfigUpdate::default()),
            ..Default::default()
        };
        assert_eq!(apply_patch(&before, &with_empty_config, None), before);
    }

    #[test]
    fn test_config_patch_keeps_other_config_keys() {
        let before = existing();
        let spec = apply_patch(
            &before,
            &UpdateCorrelationCommand {
                config: Some(CorrelationConfigUpdate {
                    transformations: Some(vec![
                        Transformation {
                            kind: "regex".into(),
                            expression: "a".into(),
                            ..Default::default()
                        },
                        Transformation {
                            kind: "logfmt".into(),
                            ..Default::default()
                        },
                    ]),
                    ..Default::default()
                }),
                ..Default::default()
            },
            None,
        );
        assert_eq!(
            serde_json::to_value(spec.document("config").unwrap()).unwrap(),
            json!({
                "field": "traceID",
                "target": {"query": "q"},
                "transformations": [
                    {"type": "regex", "expression": "a"},
                    {"type": "logfmt"}
                ]
            })
        );
        // the input document is untouched
        assert_eq!(before, existing());
    }

    #[test]
    fn test_switch_to_external_drops_target() {
        let spec = apply_patch(
            &existing(),
            &UpdateCorrelationCommand {
                correlation_type: Some(CorrelationType::External),
                ..Default::default()
            },
            None,
        );
        assert_eq!(spec.str("type"), Some("external"));
        assert!(!spec.contains_key("target"));
        assert!(validate_merged(&spec).is_ok());
        // config.target is the link template and survives
        assert!(spec.lookup("config.target").is_some());
    }

    #[test]
    fn test_switch_to_query_needs_target() {
        let external = apply_patch(
            &existing(),
            &UpdateCorrelationCommand {
                correlation_type: Some(CorrelationType::External),
                ..Default::default()
            },
            None,
        );
        let to_query = UpdateCorrelationCommand {
            correlation_type: Some(CorrelationType::Query),
            ..Default::default()
        };

        let without_target = apply_patch(&external, &to_query, None);
        assert!(validate_merged(&without_target).is_err());

        let target = DataSource::new("test-C", "prometheus");
        let with_target = apply_patch(&external, &to_query, Some(&target));
        assert!(validate_merged(&with_target).is_ok());
        assert_eq!(
            with_target.object("target").map(|t| serde_json::Value::Object(t.clone())),
            Some(json!({"group": "prometheus", "name": "test-C"}))
        );
    }

    #[test]
    fn test_target_only_patch_replaces_reference() {
        let target = DataSource::new("test-C", "prometheus");
        let spec = apply_patch(
            &existing(),
            &UpdateCorrelationCommand {
                target_uid: Some("test-C".into()),
                ..Default::default()
            },
            Some(&target),
        );
        assert_eq!(spec.lookup("target.name"), Some(&json!("test-C")));
        assert_eq!(spec.str("label"), Some("L"));
    }

    #[test]
    fn test_merged_type_consistency() {
        assert!(validate_merged(&existing()).is_ok());
        let mut inconsistent = existing();
        inconsistent.set("type", "external");
        assert!(validate_merged(&inconsistent).is_err());
    }
}

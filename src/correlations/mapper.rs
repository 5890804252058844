// Correlation document mapper
// Source and target datasources become `{group, name}` references where group
// is the datasource type and name its uid. The provenance marker lives in
// metadata, not in the spec document.

use serde_json::{Map, Value};

use super::model::{
    Correlation, CorrelationConfig, CorrelationType, CreateCorrelationCommand, Transformation,
};
use crate::config::ResourceConfig;
use crate::datasources::DataSource;
use crate::identifier::{decode, org_for_namespace, LegacyId, RecordKind};
use crate::resource::ResourceObject;
use crate::value::{object_str, SpecDocument};

pub const SPEC_SOURCE: &str = "source";
pub const SPEC_TARGET: &str = "target";
pub const SPEC_LABEL: &str = "label";
pub const SPEC_DESCRIPTION: &str = "description";
pub const SPEC_TYPE: &str = "type";
pub const SPEC_CONFIG: &str = "config";
pub const CONFIG_FIELD: &str = "field";
pub const CONFIG_TARGET: &str = "target";
pub const CONFIG_TRANSFORMATIONS: &str = "transformations";

/// Selector path of the source datasource uid
pub const SOURCE_NAME_PATH: &str = "spec.source.name";

/// `{group, name}` reference to a datasource
pub fn reference(ds: &DataSource) -> Value {
    let mut map = Map::new();
    map.insert("group".to_string(), Value::from(ds.type_name.clone()));
    map.insert("name".to_string(), Value::from(ds.uid.clone()));
    Value::Object(map)
}

pub fn transformation_to_value(t: &Transformation) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), Value::from(t.kind.clone()));
    for (key, value) in [
        ("expression", &t.expression),
        ("field", &t.field),
        ("mapValue", &t.map_value),
    ] {
        if !value.is_empty() {
            map.insert(key.to_string(), Value::from(value.clone()));
        }
    }
    Value::Object(map)
}

pub fn transformations_to_value(transformations: &[Transformation]) -> Value {
    Value::Array(transformations.iter().map(transformation_to_value).collect())
}

fn transformation_from_value(value: &Value) -> Option<Transformation> {
    let map = value.as_object()?;
    let text = |key: &str| object_str(map, key).unwrap_or_default().to_string();
    Some(Transformation {
        kind: text("type"),
        expression: text("expression"),
        field: text("field"),
        map_value: text("mapValue"),
    })
}

fn config_to_value(config: &CorrelationConfig) -> Value {
    let mut doc = SpecDocument::new();
    doc.set(CONFIG_FIELD, config.field.clone());
    if !config.target.is_empty() {
        doc.set(CONFIG_TARGET, Value::Object(config.target.clone()));
    }
    if !config.transformations.is_empty() {
        doc.set(
            CONFIG_TRANSFORMATIONS,
            transformations_to_value(&config.transformations),
        );
    }
    doc.into()
}

fn config_from_spec(spec: &SpecDocument) -> CorrelationConfig {
    let Some(config) = spec.document(SPEC_CONFIG) else {
        return CorrelationConfig::default();
    };
    CorrelationConfig {
        field: config.str(CONFIG_FIELD).unwrap_or_default().to_string(),
        target: config.object(CONFIG_TARGET).cloned().unwrap_or_default(),
        transformations: config
            .array(CONFIG_TRANSFORMATIONS)
            .map(|items| items.iter().filter_map(transformation_from_value).collect())
            .unwrap_or_default(),
    }
}

/// Spec document for a new correlation. Datasources must already be resolved.
pub fn to_spec(
    cmd: &CreateCorrelationCommand,
    source: &DataSource,
    target: Option<&DataSource>,
) -> SpecDocument {
    let mut spec = SpecDocument::new();
    spec.set(SPEC_SOURCE, reference(source));
    if let Some(target) = target {
        spec.set(SPEC_TARGET, reference(target));
    }
    if !cmd.label.is_empty() {
        spec.set(SPEC_LABEL, cmd.label.clone());
    }
    if !cmd.description.is_empty() {
        spec.set(SPEC_DESCRIPTION, cmd.description.clone());
    }
    spec.set(SPEC_TYPE, cmd.correlation_type.as_str());
    spec.set(SPEC_CONFIG, config_to_value(&cmd.config));
    spec
}

/// Resource to create under the given uid
pub fn to_resource(
    uid: &str,
    cmd: &CreateCorrelationCommand,
    source: &DataSource,
    target: Option<&DataSource>,
    resource: &ResourceConfig,
) -> ResourceObject {
    let mut obj = ResourceObject::new(resource.api_version(), &resource.kind);
    obj.metadata.name = uid.to_string();
    obj.spec = to_spec(cmd, source, target);
    if cmd.provisioned {
        obj.mark_provisioned();
    }
    obj
}

/// Uid of the source datasource a stored correlation belongs to
pub fn source_uid(obj: &ResourceObject) -> Option<&str> {
    obj.spec
        .lookup("source.name")
        .and_then(Value::as_str)
        .filter(|uid| !uid.is_empty())
}

/// Legacy view of a stored correlation; None when it has no usable uid or source
pub fn to_legacy(obj: &ResourceObject) -> Option<Correlation> {
    let uid = match decode(RecordKind::Correlation, &obj.metadata.name).ok()? {
        LegacyId::Uid(uid) => uid,
        LegacyId::Numeric(_) => return None,
    };
    let spec = &obj.spec;

    Some(Correlation {
        uid,
        source_uid: source_uid(obj)?.to_string(),
        target_uid: spec
            .lookup("target.name")
            .and_then(Value::as_str)
            .map(str::to_string),
        org_id: org_for_namespace(&obj.metadata.namespace).unwrap_or_default(),
        label: spec.str(SPEC_LABEL).unwrap_or_default().to_string(),
        description: spec.str(SPEC_DESCRIPTION).unwrap_or_default().to_string(),
        config: config_from_spec(spec),
        provisioned: obj.is_provisioned(),
        correlation_type: CorrelationType::from_spec(spec.str(SPEC_TYPE)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn stored(cmd: &CreateCorrelationCommand) -> ResourceObject {
        let source = DataSource::new("test-A", "loki");
        let target = DataSource::new("test-B", "tempo");
        let mut obj = to_resource(
            "corr-1",
            cmd,
            &source,
            cmd.target().map(|_| &target),
            &BridgeConfig::default().correlations,
        );
        obj.metadata.namespace = "org-3".to_string();
        obj
    }

    fn sample() -> CreateCorrelationCommand {
        CreateCorrelationCommand {
            target_uid: Some("test-B".into()),
            label: "L".into(),
            description: "D".into(),
            config: CorrelationConfig {
                field: "traceID".into(),
                target: serde_json::from_value(json!({"query": "${traceID}"})).unwrap(),
                transformations: vec![
                    Transformation {
                        kind: "regex".into(),
                        expression: "id=(\\w+)".into(),
                        map_value: "traceID".into(),
                        ..Default::default()
                    },
                    Transformation {
                        kind: "logfmt".into(),
                        field: "line".into(),
                        ..Default::default()
                    },
                ],
            },
            provisioned: false,
            correlation_type: CorrelationType::Query,
            org_id: 0,
        }
    }

    #[test]
    fn test_spec_shape() {
        let obj = stored(&sample());
        assert_eq!(
            serde_json::to_value(&obj.spec).unwrap(),
            json!({
                "source": {"group": "loki", "name": "test-A"},
                "target": {"group": "tempo", "name": "test-B"},
                "label": "L",
                "description": "D",
                "type": "query",
                "config": {
                    "field": "traceID",
                    "target": {"query": "${traceID}"},
                    "transformations": [
                        {"type": "regex", "expression": "id=(\\w+)", "mapValue": "traceID"},
                        {"type": "logfmt", "field": "line"}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_round_trip_preserves_fields_and_order() {
        let cmd = sample();
        let correlation = to_legacy(&stored(&cmd)).unwrap();
        assert_eq!(
            correlation,
            Correlation {
                uid: "corr-1".into(),
                source_uid: "test-A".into(),
                target_uid: Some("test-B".into()),
                org_id: 3,
                label: cmd.label.clone(),
                description: cmd.description.clone(),
                config: cmd.config.clone(),
                provisioned: false,
                correlation_type: CorrelationType::Query,
            }
        );
    }

    #[test]
    fn test_provisioned_marker() {
        let cmd = CreateCorrelationCommand {
            provisioned: true,
            ..sample()
        };
        let obj = stored(&cmd);
        assert!(obj.is_provisioned());
        assert!(!obj.spec.contains_key("provisioned"));
        assert!(to_legacy(&obj).unwrap().provisioned);
    }

    #[test]
    fn test_external_has_no_target() {
        let cmd = CreateCorrelationCommand {
            target_uid: None,
            correlation_type: CorrelationType::External,
            ..sample()
        };
        let correlation = to_legacy(&stored(&cmd)).unwrap();
        assert_eq!(correlation.target_uid, None);
        assert_eq!(correlation.correlation_type, CorrelationType::External);
    }

    #[test]
    fn test_lenient_read() {
        let mut obj = ResourceObject::default();
        obj.metadata.name = "c9".into();
        obj.spec = serde_json::from_value(json!({
            "source": {"name": "src"},
            "label": 5,
            "type": "mystery",
            "config": {
                "field": ["x"],
                "transformations": ["bad", {"type": "regex", "expression": 1}]
            }
        }))
        .unwrap();

        let correlation = to_legacy(&obj).unwrap();
        assert_eq!(correlation.label, "");
        assert_eq!(correlation.correlation_type, CorrelationType::Query);
        assert_eq!(correlation.config.field, "");
        assert_eq!(
            correlation.config.transformations,
            vec![Transformation {
                kind: "regex".into(),
                ..Default::default()
            }]
        );
        assert_eq!(correlation.org_id, 0);
    }

    #[test]
    fn test_missing_source_is_unreadable() {
        let mut obj = ResourceObject::default();
        obj.metadata.name = "c1".into();
        assert!(to_legacy(&obj).is_none());
    }

    fn json_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            "[ -~]{0,12}".prop_map(Value::from),
        ]
    }

    /// Empty strings stand for absent optional keys
    fn transformation() -> impl Strategy<Value = Transformation> {
        (
            prop::sample::select(vec!["regex", "logfmt", ""]),
            "[a-z()+=]{0,8}",
            "[a-zA-Z]{0,6}",
            "[a-zA-Z]{0,6}",
        )
            .prop_map(|(kind, expression, field, map_value)| Transformation {
                kind: kind.to_string(),
                expression,
                field,
                map_value,
            })
    }

    proptest! {
        #[test]
        fn prop_create_round_trip(
            label in "[ -~]{0,16}",
            description in "[ -~]{0,16}",
            external in any::<bool>(),
            provisioned in any::<bool>(),
            field in "[a-zA-Z_]{0,10}",
            target in prop::collection::btree_map("[a-z]{1,6}", json_scalar(), 0..4),
            transformations in prop::collection::vec(transformation(), 0..5),
        ) {
            let (correlation_type, target_uid) = if external {
                (CorrelationType::External, None)
            } else {
                (CorrelationType::Query, Some("test-B".to_string()))
            };
            let cmd = CreateCorrelationCommand {
                target_uid: target_uid.clone(),
                label,
                description,
                config: CorrelationConfig {
                    field,
                    target: target.into_iter().collect(),
                    transformations,
                },
                provisioned,
                correlation_type,
                org_id: 0,
            };

            let correlation = to_legacy(&stored(&cmd)).unwrap();
            prop_assert_eq!(correlation, Correlation {
                uid: "corr-1".into(),
                source_uid: "test-A".into(),
                target_uid,
                org_id: 3,
                label: cmd.label.clone(),
                description: cmd.description.clone(),
                config: cmd.config.clone(),
                provisioned,
                correlation_type,
            });
        }
    }
}

// Legacy correlation DTOs and commands

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::errors::AdapterError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationType {
    #[default]
    Query,
    External,
}

impl CorrelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            CorrelationType::Query => "query",
            CorrelationType::External => "external",
        }
    }

    /// Lenient parse used when reading stored specs; unknown values read as the default
    pub fn from_spec(value: Option<&str>) -> Self {
        match value {
            Some("external") => CorrelationType::External,
            _ => CorrelationType::Query,
        }
    }
}

impl fmt::Display for CorrelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a correlation's transformation pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expression: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
    #[serde(rename = "mapValue", default, skip_serializing_if = "String::is_empty")]
    pub map_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub target: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformations: Vec<Transformation>,
}

/// Correlation as returned by the legacy endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub uid: String,
    #[serde(rename = "sourceUID")]
    pub source_uid: String,
    #[serde(rename = "targetUID", default)]
    pub target_uid: Option<String>,
    #[serde(rename = "orgId", default)]
    pub org_id: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: CorrelationConfig,
    #[serde(default)]
    pub provisioned: bool,
    #[serde(rename = "type", default)]
    pub correlation_type: CorrelationType,
}

/// Body of `POST /api/datasources/uid/:sourceUID/correlations`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCorrelationCommand {
    #[serde(rename = "targetUID", default)]
    pub target_uid: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub config: CorrelationConfig,
    #[serde(default)]
    pub provisioned: bool,
    #[serde(rename = "type", default)]
    pub correlation_type: CorrelationType,
    /// Zero means "the caller's org"
    #[serde(rename = "orgId", default)]
    pub org_id: i64,
}

impl CreateCorrelationCommand {
    /// Target uid with empty strings treated as absent
    pub fn target(&self) -> Option<&str> {
        self.target_uid.as_deref().filter(|uid| !uid.is_empty())
    }

    /// Shape checks that need no lookups
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.config.field.trim().is_empty() {
            return Err(AdapterError::validation("config.field is required"));
        }
        match (self.correlation_type, self.target()) {
            (CorrelationType::Query, None) => Err(AdapterError::validation(
                "correlations of type query require a targetUID",
            )),
            (CorrelationType::External, Some(_)) => Err(AdapterError::validation(
                "correlations of type external must not have a targetUID",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConfigUpdate {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub target: Option<Map<String, Value>>,
    #[serde(default)]
    pub transformations: Option<Vec<Transformation>>,
}

impl CorrelationConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.field.is_none() && self.target.is_none() && self.transformations.is_none()
    }
}

/// Body of `PATCH .../correlations/:correlationUID`; absent fields are kept.
/// Switching to `external` drops the stored target; switching to `query`
/// needs a `targetUID` unless one is already stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCorrelationCommand {
    #[serde(rename = "targetUID", default)]
    pub target_uid: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub correlation_type: Option<CorrelationType>,
    #[serde(default)]
    pub config: Option<CorrelationConfigUpdate>,
}

pub const EMPTY_UPDATE_MESSAGE: &str =
    "At least one of label, description, type or config is required";

impl UpdateCorrelationCommand {
    /// Target uid with empty strings treated as absent
    pub fn target(&self) -> Option<&str> {
        self.target_uid.as_deref().filter(|uid| !uid.is_empty())
    }

    pub fn validate(&self) -> Result<(), AdapterError> {
        let config_empty = self.config.as_ref().map_or(true, CorrelationConfigUpdate::is_empty);
        if self.target().is_none()
            && self.label.is_none()
            && self.description.is_none()
            && self.correlation_type.is_none()
            && config_empty
        {
            return Err(AdapterError::EmptyUpdate(EMPTY_UPDATE_MESSAGE.to_string()));
        }
        if self.correlation_type == Some(CorrelationType::External) && self.target().is_some() {
            return Err(AdapterError::validation(
                "correlations of type external must not have a targetUID",
            ));
        }
        if let Some(field) = self.config.as_ref().and_then(|c| c.field.as_deref()) {
            if field.trim().is_empty() {
                return Err(AdapterError::validation("config.field cannot be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_cmd(value: Value) -> CreateCorrelationCommand {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_defaults_to_query() {
        let cmd = create_cmd(json!({"targetUID": "b", "config": {"field": "f"}}));
        assert_eq!(cmd.correlation_type, CorrelationType::Query);
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_create_target_rules() {
        let missing = create_cmd(json!({"config": {"field": "f"}}));
        assert!(matches!(missing.validate(), Err(AdapterError::Validation(_))));

        let blank = create_cmd(json!({"targetUID": "", "config": {"field": "f"}}));
        assert!(blank.validate().is_err());

        let external = create_cmd(json!({"type": "external", "config": {"field": "f"}}));
        assert!(external.validate().is_ok());

        let external_with_target =
            create_cmd(json!({"type": "external", "targetUID": "b", "config": {"field": "f"}}));
        assert!(external_with_target.validate().is_err());

        let no_field = create_cmd(json!({"targetUID": "b", "config": {"field": ""}}));
        assert!(no_field.validate().is_err());
    }

    #[test]
    fn test_empty_update_is_rejected() {
        let empty = UpdateCorrelationCommand::default();
        assert!(matches!(empty.validate(), Err(AdapterError::EmptyUpdate(_))));

        let empty_config: UpdateCorrelationCommand =
            serde_json::from_value(json!({"config": {}})).unwrap();
        assert!(matches!(
            empty_config.validate(),
            Err(AdapterError::EmptyUpdate(_))
        ));

        let description: UpdateCorrelationCommand =
            serde_json::from_value(json!({"description": ""})).unwrap();
        assert!(description.validate().is_ok());

        let target_only: UpdateCorrelationCommand =
            serde_json::from_value(json!({"targetUID": "b"})).unwrap();
        assert!(target_only.validate().is_ok());

        let blank_target: UpdateCorrelationCommand =
            serde_json::from_value(json!({"targetUID": ""})).unwrap();
        assert!(matches!(
            blank_target.validate(),
            Err(AdapterError::EmptyUpdate(_))
        ));
    }

    #[test]
    fn test_external_update_with_target_is_rejected() {
        let cmd: UpdateCorrelationCommand =
            serde_json::from_value(json!({"type": "external", "targetUID": "b"})).unwrap();
        assert!(matches!(cmd.validate(), Err(AdapterError::Validation(_))));
    }

    #[test]
    fn test_correlation_wire_shape() {
        let correlation = Correlation {
            uid: "c1".into(),
            source_uid: "a".into(),
            target_uid: None,
            org_id: 1,
            label: "L".into(),
            description: String::new(),
            config: CorrelationConfig {
                field: "f".into(),
                target: Map::new(),
                transformations: vec![Transformation {
                    kind: "regex".into(),
                    expression: "(\\w+)".into(),
                    ..Default::default()
                }],
            },
            provisioned: false,
            correlation_type: CorrelationType::External,
        };
        assert_eq!(
            serde_json::to_value(&correlation).unwrap(),
            json!({
                "uid": "c1",
                "sourceUID": "a",
                "targetUID": null,
                "orgId": 1,
                "label": "L",
                "description": "",
                "config": {
                    "field": "f",
                    "target": {},
                    "transformations": [{"type": "regex", "expression": "(\\w+)"}]
                },
                "provisioned": false,
                "type": "external"
            })
        );
    }
}

// Legacy annotation DTOs and commands, in the wire shape of `/api/annotations`

use serde::{Deserialize, Serialize};

use crate::errors::AdapterError;

/// Annotation as returned by the legacy read endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDto {
    pub id: i64,
    #[serde(rename = "dashboardUID", default)]
    pub dashboard_uid: String,
    #[serde(rename = "panelId", default)]
    pub panel_id: i64,
    #[serde(default)]
    pub time: i64,
    #[serde(rename = "timeEnd", default)]
    pub time_end: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation instant, epoch milliseconds
    #[serde(default)]
    pub created: i64,
}

/// Body of `POST /api/annotations`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAnnotationCommand {
    #[serde(rename = "dashboardUID", default)]
    pub dashboard_uid: String,
    #[serde(rename = "panelId", default)]
    pub panel_id: i64,
    #[serde(default)]
    pub time: i64,
    #[serde(rename = "timeEnd", default)]
    pub time_end: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PostAnnotationCommand {
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.text.trim().is_empty() {
            return Err(AdapterError::validation("Failed to save annotation: text is required"));
        }
        if self.time < 0 || self.time_end < 0 {
            return Err(AdapterError::validation(
                "Failed to save annotation: time cannot be negative",
            ));
        }
        if self.panel_id < 0 {
            return Err(AdapterError::validation(
                "Failed to save annotation: panelId cannot be negative",
            ));
        }
        Ok(())
    }
}

/// Body of `PUT /api/annotations/:id`: replaces text, time range and,
/// when present, tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAnnotationCommand {
    /// Ignored; the path id wins
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub time: i64,
    #[serde(rename = "timeEnd", default)]
    pub time_end: i64,
    #[serde(default)]
    pub text: String,
    /// `None` keeps stored tags; `Some(vec![])` clears them
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Body of `PATCH /api/annotations/:id`. Zero values mean "no change".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchAnnotationCommand {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub time: i64,
    #[serde(rename = "timeEnd", default)]
    pub time_end: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// One entry of the tags endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsResult {
    pub tags: Vec<TagCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsResponse {
    pub result: TagsResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dto_uses_legacy_keys() {
        let dto = AnnotationDto {
            id: 3,
            dashboard_uid: "dash".into(),
            panel_id: 2,
            time: 10,
            time_end: 20,
            text: "hi".into(),
            tags: vec!["a".into()],
            created: 99,
        };
        assert_eq!(
            serde_json::to_value(&dto).unwrap(),
            json!({
                "id": 3,
                "dashboardUID": "dash",
                "panelId": 2,
                "time": 10,
                "timeEnd": 20,
                "text": "hi",
                "tags": ["a"],
                "created": 99
            })
        );
    }

    #[test]
    fn test_put_distinguishes_missing_and_empty_tags() {
        let missing: UpdateAnnotationCommand = serde_json::from_value(json!({"text": "x"})).unwrap();
        let empty: UpdateAnnotationCommand =
            serde_json::from_value(json!({"text": "x", "tags": []})).unwrap();
        assert_eq!(missing.tags, None);
        assert_eq!(empty.tags, Some(vec![]));
    }

    #[test]
    fn test_post_validation() {
        let mut cmd = PostAnnotationCommand {
            text: "deploy".into(),
            time: 1000,
            ..Default::default()
        };
        assert!(cmd.validate().is_ok());

        cmd.text = "  ".into();
        assert!(matches!(cmd.validate(), Err(AdapterError::Validation(_))));

        cmd.text = "ok".into();
        cmd.time = -1;
        assert!(cmd.validate().is_err());
    }
}

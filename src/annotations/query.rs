// Annotation list query -> field selector and paging

use serde::Deserialize;

use crate::resource::ListOptions;
use crate::selector::{list_options, FieldSelector, PageLimits};

/// Recognized query parameters of `GET /api/annotations`; anything else is ignored
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnnotationQuery {
    #[serde(rename = "dashboardUID")]
    pub dashboard_uid: Option<String>,
    #[serde(rename = "panelId")]
    pub panel_id: Option<i64>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "continue")]
    pub continue_token: Option<String>,
}

/// Query of `GET /api/annotations/tags`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TagsQuery {
    pub tag: Option<String>,
    pub limit: Option<i64>,
}

pub fn selector(query: &AnnotationQuery) -> FieldSelector {
    FieldSelector::new()
        .eq_str("spec.dashboardUID", query.dashboard_uid.as_deref())
        .eq_nonzero("spec.panelID", query.panel_id.unwrap_or_default())
        .eq_nonzero("spec.from", query.from.unwrap_or_default())
        .eq_nonzero("spec.to", query.to.unwrap_or_default())
}

pub fn build(query: &AnnotationQuery, limits: &PageLimits) -> ListOptions {
    list_options(
        selector(query),
        limits.resolve(query.limit),
        query.continue_token.as_deref(),
    )
}

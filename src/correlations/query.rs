// Correlation list query -> field selector and paging.
// Only a single source can be filtered on: selectors cannot express OR, so a
// request for several sources is not pushed down.

use serde::Deserialize;

use super::mapper::SOURCE_NAME_PATH;
use crate::resource::ListOptions;
use crate::selector::{list_options, FieldSelector, PageLimits};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CorrelationsQuery {
    #[serde(rename = "sourceUID")]
    pub source_uid: Option<String>,
    pub limit: Option<i64>,
    #[serde(rename = "continue")]
    pub continue_token: Option<String>,
}

/// Options for listing, optionally narrowed to one source datasource
pub fn build(query: &CorrelationsQuery, source_uid: Option<&str>, limits: &PageLimits) -> ListOptions {
    let source = source_uid.or(query.source_uid.as_deref());
    list_options(
        FieldSelector::new().eq_str(SOURCE_NAME_PATH, source),
        limits.resolve(query.limit),
        query.continue_token.as_deref(),
    )
}

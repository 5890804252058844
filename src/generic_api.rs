// Generic API pass-through
// Read-only namespaced access to the configured resources in their native
// envelope shape, for callers that already speak the Resource API.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::config::ResourceConfig;
use crate::context::RequestContext;
use crate::errors::AdapterError;
use crate::http_server::AppState;
use crate::observability::{with_operation, OperationContext};
use crate::resource::{ListOptions, ResourceList, ResourceObject};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/apis/:group/:version/namespaces/:namespace/:resource",
            get(list_resources),
        )
        .route(
            "/apis/:group/:version/namespaces/:namespace/:resource/:name",
            get(get_resource),
        )
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub field_selector: Option<String>,
    pub label_selector: Option<String>,
    pub limit: Option<i64>,
    #[serde(rename = "continue")]
    pub continue_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionPath {
    pub group: String,
    pub version: String,
    pub namespace: String,
    pub resource: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectPath {
    pub group: String,
    pub version: String,
    pub namespace: String,
    pub resource: String,
    pub name: String,
}

/// Configured resource addressed by the path, checked against the caller's namespace
fn resolve<'a>(
    state: &'a AppState,
    ctx: &RequestContext,
    group: &str,
    version: &str,
    namespace: &str,
    resource: &str,
) -> Result<&'a ResourceConfig, AdapterError> {
    let config = [&state.config.annotations, &state.config.correlations]
        .into_iter()
        .find(|c| c.group == group && c.version == version && c.resource == resource)
        .ok_or_else(|| {
            AdapterError::not_found(format!("the server could not find {group}/{version}/{resource}"))
        })?;

    if namespace != ctx.namespace {
        return Err(AdapterError::org_mismatch(format!(
            "namespace {namespace} does not belong to the request organization"
        )));
    }
    Ok(config)
}

fn list_params_to_options(params: ListParams, config: &ResourceConfig) -> ListOptions {
    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
    ListOptions {
        field_selector: non_empty(params.field_selector),
        label_selector: non_empty(params.label_selector),
        limit: config.limits().resolve(params.limit),
        continue_token: non_empty(params.continue_token),
    }
}

/// GET /apis/:group/:version/namespaces/:namespace/:resource
async fn list_resources(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<CollectionPath>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ResourceList>, AdapterError> {
    let Query(params) = params?;
    let op = OperationContext::new("list_resources")
        .with_trace(ctx.trace_id)
        .with_record(format!("{}/{}", path.group, path.resource));

    with_operation(op, async {
        let config = resolve(
            &state,
            &ctx,
            &path.group,
            &path.version,
            &path.namespace,
            &path.resource,
        )?;
        let client = state.client_for(&ctx, config).await?;
        let opts = list_params_to_options(params, config);
        Ok(Json(client.list(&ctx, &opts).await?))
    })
    .await
}

/// GET /apis/:group/:version/namespaces/:namespace/:resource/:name
async fn get_resource(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<ObjectPath>,
) -> Result<Json<ResourceObject>, AdapterError> {
    let op = OperationContext::new("get_resource")
        .with_trace(ctx.trace_id)
        .with_record(path.name.clone());

    with_operation(op, async {
        let config = resolve(
            &state,
            &ctx,
            &path.group,
            &path.version,
            &path.namespace,
            &path.resource,
        )?;
        let client = state.client_for(&ctx, config).await?;
        Ok(Json(client.get(&ctx, &path.name).await?))
    })
    .await
}

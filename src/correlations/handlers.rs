// Correlation request handlers
// Source datasource checks run first (existence, read-only), then shape
// validation, then the store calls. A correlation stored under another source
// than the path names is reported as missing.

use anyhow::anyhow;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use uuid::Uuid;

use super::mapper::{source_uid, to_legacy, to_resource};
use super::merge::{apply_patch, validate_merged};
use super::model::{Correlation, CreateCorrelationCommand, UpdateCorrelationCommand};
use super::query::{self, CorrelationsQuery};
use super::{
    NONE_FOUND_MESSAGE, NOT_FOUND_MESSAGE, PROVISIONED_MESSAGE, SOURCE_NOT_FOUND_MESSAGE,
    SOURCE_READ_ONLY_MESSAGE, TARGET_NOT_FOUND_MESSAGE,
};
use crate::context::RequestContext;
use crate::datasources::DataSource;
use crate::errors::AdapterError;
use crate::http_server::AppState;
use crate::http_types::{continue_headers, MessageResponse};
use crate::identifier::{encode, LegacyId, RecordKind};
use crate::observability::{with_operation, OperationContext};
use crate::resource::{
    CreateOptions, DeleteOptions, ResourceClient, ResourceList, ResourceObject, UpdateOptions,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/datasources/correlations", get(list_correlations))
        .route(
            "/api/datasources/uid/:source_uid/correlations",
            get(list_source_correlations).post(create_correlation),
        )
        .route(
            "/api/datasources/uid/:source_uid/correlations/:correlation_uid",
            get(get_correlation)
                .patch(update_correlation)
                .delete(delete_correlation),
        )
}

fn operation(name: &str, ctx: &RequestContext) -> OperationContext {
    OperationContext::new(name)
        .with_trace(ctx.trace_id)
        .with_kind(RecordKind::Correlation)
}

async fn lookup_datasource(
    state: &AppState,
    ctx: &RequestContext,
    uid: &str,
    missing: &str,
) -> Result<DataSource, AdapterError> {
    state
        .datasources
        .get_by_uid(ctx, uid)
        .await
        .map_err(AdapterError::internal)?
        .ok_or_else(|| AdapterError::not_found(missing))
}

fn ensure_source_writable(source: &DataSource) -> Result<(), AdapterError> {
    if source.read_only {
        return Err(AdapterError::read_only(SOURCE_READ_ONLY_MESSAGE));
    }
    Ok(())
}

fn ensure_writable(obj: &ResourceObject) -> Result<(), AdapterError> {
    if obj.is_provisioned() {
        return Err(AdapterError::read_only(PROVISIONED_MESSAGE));
    }
    Ok(())
}

/// Stored correlation `uid` belonging to `source`
async fn fetch(
    client: &dyn ResourceClient,
    ctx: &RequestContext,
    source: &str,
    uid: &str,
) -> Result<ResourceObject, AdapterError> {
    let name = encode(RecordKind::Correlation, &LegacyId::Uid(uid.to_string()))
        .map_err(|e| AdapterError::validation(e.to_string()))?;
    let obj = match client.get(ctx, &name).await.map_err(AdapterError::from) {
        // Store 404s name the resource; the legacy API answers with its own message
        Err(e) if e.is_store_not_found() => return Err(AdapterError::not_found(NOT_FOUND_MESSAGE)),
        other => other?,
    };
    // Uids are global, so the path source must be checked against the stored one
    if source_uid(&obj) != Some(source) {
        return Err(AdapterError::not_found(NOT_FOUND_MESSAGE));
    }
    Ok(obj)
}

fn render(obj: &ResourceObject) -> Result<Correlation, AdapterError> {
    to_legacy(obj).ok_or_else(|| {
        AdapterError::internal(anyhow!(
            "stored correlation {} cannot be read back",
            obj.metadata.name
        ))
    })
}

fn render_list(list: &ResourceList) -> Result<(HeaderMap, Json<Vec<Correlation>>), AdapterError> {
    let items: Vec<Correlation> = list.items.iter().filter_map(to_legacy).collect();
    // A page whose items were all unreadable still hands back its token
    if items.is_empty() && list.continue_token().map_or(true, str::is_empty) {
        return Err(AdapterError::not_found(NONE_FOUND_MESSAGE));
    }
    Ok((continue_headers(list.continue_token()), Json(items)))
}

/// GET /api/datasources/correlations
async fn list_correlations(
    State(state): State<AppState>,
    ctx: RequestContext,
    params: Result<Query<CorrelationsQuery>, QueryRejection>,
) -> Result<(HeaderMap, Json<Vec<Correlation>>), AdapterError> {
    let Query(params) = params?;
    let op = operation("list_correlations", &ctx);

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.correlations).await?;
        let opts = query::build(&params, None, &state.config.correlations.limits());
        let list = client.list(&ctx, &opts).await?;
        render_list(&list)
    })
    .await
}

/// GET /api/datasources/uid/:source_uid/correlations
async fn list_source_correlations(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(source): Path<String>,
    params: Result<Query<CorrelationsQuery>, QueryRejection>,
) -> Result<(HeaderMap, Json<Vec<Correlation>>), AdapterError> {
    let Query(params) = params?;
    let op = operation("list_source_correlations", &ctx).with_record(source.clone());

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.correlations).await?;
        lookup_datasource(&state, &ctx, &source, SOURCE_NOT_FOUND_MESSAGE).await?;

        let opts = query::build(&params, Some(&source), &state.config.correlations.limits());
        let list = client.list(&ctx, &opts).await?;
        render_list(&list)
    })
    .await
}

/// POST /api/datasources/uid/:source_uid/correlations
async fn create_correlation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(source): Path<String>,
    payload: Result<Json<CreateCorrelationCommand>, JsonRejection>,
) -> Result<Json<MessageResponse<Correlation>>, AdapterError> {
    let Json(cmd) = payload?;
    let op = operation("create_correlation", &ctx).with_record(source.clone());

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.correlations).await?;
        // orgId 0 means "the caller's org"
        if cmd.org_id != 0 && cmd.org_id != ctx.org_id {
            return Err(AdapterError::org_mismatch(
                "Correlation organization differs from the request organization",
            ));
        }

        let source_ds = lookup_datasource(&state, &ctx, &source, SOURCE_NOT_FOUND_MESSAGE).await?;
        ensure_source_writable(&source_ds)?;
        cmd.validate()?;

        let target_ds = match cmd.target() {
            Some(uid) => Some(lookup_datasource(&state, &ctx, uid, TARGET_NOT_FOUND_MESSAGE).await?),
            None => None,
        };

        let uid = Uuid::new_v4().simple().to_string();
        let obj = to_resource(
            &uid,
            &cmd,
            &source_ds,
            target_ds.as_ref(),
            &state.config.correlations,
        );
        let created = client.create(&ctx, obj, &CreateOptions::default()).await?;

        Ok(Json(
            MessageResponse::new("Correlation created").with_result(render(&created)?),
        ))
    })
    .await
}

/// GET /api/datasources/uid/:source_uid/correlations/:correlation_uid
async fn get_correlation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((source, uid)): Path<(String, String)>,
) -> Result<Json<Correlation>, AdapterError> {
    let op = operation("get_correlation", &ctx).with_record(uid.clone());

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.correlations).await?;
        lookup_datasource(&state, &ctx, &source, SOURCE_NOT_FOUND_MESSAGE).await?;

        let obj = fetch(client.as_ref(), &ctx, &source, &uid).await?;
        Ok(Json(render(&obj)?))
    })
    .await
}

/// PATCH /api/datasources/uid/:source_uid/correlations/:correlation_uid
async fn update_correlation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((source, uid)): Path<(String, String)>,
    payload: Result<Json<UpdateCorrelationCommand>, JsonRejection>,
) -> Result<Json<MessageResponse<Correlation>>, AdapterError> {
    let Json(cmd) = payload?;
    let op = operation("update_correlation", &ctx).with_record(uid.clone());

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.correlations).await?;
        let source_ds = lookup_datasource(&state, &ctx, &source, SOURCE_NOT_FOUND_MESSAGE).await?;
        ensure_source_writable(&source_ds)?;
        cmd.validate()?;

        let target_ds = match cmd.target() {
            Some(uid) => Some(lookup_datasource(&state, &ctx, uid, TARGET_NOT_FOUND_MESSAGE).await?),
            None => None,
        };

        let existing = fetch(client.as_ref(), &ctx, &source, &uid).await?;
        ensure_writable(&existing)?;

        let mut updated = existing.clone();
        updated.spec = apply_patch(&existing.spec, &cmd, target_ds.as_ref());
        // Type and target are only checked together once merged with what is stored
        validate_merged(&updated.spec)?;

        // resourceVersion from the read above makes this a checked write
        let stored = client.update(&ctx, updated, &UpdateOptions::default()).await?;

        Ok(Json(
            MessageResponse::new("Correlation updated").with_result(render(&stored)?),
        ))
    })
    .await
}

/// DELETE /api/datasources/uid/:source_uid/correlations/:correlation_uid
async fn delete_correlation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((source, uid)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AdapterError> {
    let op = operation("delete_correlation", &ctx).with_record(uid.clone());

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.correlations).await?;
        let source_ds = lookup_datasource(&state, &ctx, &source, SOURCE_NOT_FOUND_MESSAGE).await?;
        ensure_source_writable(&source_ds)?;

        let existing = fetch(client.as_ref(), &ctx, &source, &uid).await?;
        ensure_writable(&existing)?;

        // Refuse the delete if the object changed after the provisioned check
        let opts = DeleteOptions {
            precondition_resource_version: Some(existing.metadata.resource_version.clone())
                .filter(|rv| !rv.is_empty()),
        };
        client.delete(&ctx, &existing.metadata.name, &opts).await?;

        Ok(Json(MessageResponse::new("Correlation deleted")))
    })
    .await
}

// Annotation request handlers
// Each handler acquires a fresh client, validates, issues its store calls and
// renders the legacy body. Provisioned annotations are rejected before any
// mutating store call.

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
use std::collections::BTreeMap;
use tracing::warn;

use super::mapper::{to_legacy, to_resource};
use super::merge::{apply_patch, apply_put};
use super::model::{
    AnnotationDto, PatchAnnotationCommand, PostAnnotationCommand, TagCount, TagsResponse,
    TagsResult, UpdateAnnotationCommand,
};
use super::query::{self, AnnotationQuery, TagsQuery};
use super::NOT_FOUND_MESSAGE;
use crate::context::RequestContext;
use crate::errors::AdapterError;
use crate::http_server::AppState;
use crate::http_types::{continue_headers, MessageResponse};
use crate::identifier::{annotation_id, annotation_name, RecordKind};
use crate::observability::{with_operation, OperationContext};
use crate::resource::{
    CreateOptions, DeleteOptions, ListOptions, ResourceClient, ResourceObject, UpdateOptions,
};
use crate::selector::PageLimits;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/annotations",
            get(list_annotations).post(create_annotation),
        )
        .route("/api/annotations/tags", get(list_tags))
        .route(
            "/api/annotations/:id",
            get(get_annotation)
                .put(update_annotation)
                .patch(patch_annotation)
                .delete(delete_annotation),
        )
}

fn operation(name: &str, ctx: &RequestContext) -> OperationContext {
    OperationContext::new(name)
        .with_trace(ctx.trace_id)
        .with_kind(RecordKind::Annotation)
}

/// Resource name for a legacy path id
fn resource_name(raw_id: &str) -> Result<String, AdapterError> {
    raw_id
        .parse::<i64>()
        .ok()
        .and_then(|id| annotation_name(id).ok())
        .ok_or_else(|| AdapterError::validation(format!("Invalid annotation id: {raw_id}")))
}

async fn fetch(
    client: &dyn ResourceClient,
    ctx: &RequestContext,
    name: &str,
) -> Result<ResourceObject, AdapterError> {
    match client.get(ctx, name).await.map_err(AdapterError::from) {
        // Store 404s carry the resource name; callers only know the legacy id
        Err(e) if e.is_store_not_found() => Err(AdapterError::not_found(NOT_FOUND_MESSAGE)),
        other => other,
    }
}

fn ensure_writable(obj: &ResourceObject) -> Result<(), AdapterError> {
    if obj.is_provisioned() {
        return Err(AdapterError::read_only(
            "Annotation is provisioned and cannot be modified",
        ));
    }
    Ok(())
}

/// GET /api/annotations
async fn list_annotations(
    State(state): State<AppState>,
    ctx: RequestContext,
    params: Result<Query<AnnotationQuery>, QueryRejection>,
) -> Result<(HeaderMap, Json<Vec<AnnotationDto>>), AdapterError> {
    let Query(params) = params?;
    let op = operation("list_annotations", &ctx);

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.annotations).await?;
        let opts = query::build(&params, &state.config.annotations.limits());
        let list = client.list(&ctx, &opts).await?;

        let items = list.items.iter().filter_map(to_legacy).collect();
        Ok((continue_headers(list.continue_token()), Json(items)))
    })
    .await
}

/// POST /api/annotations
async fn create_annotation(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<PostAnnotationCommand>, JsonRejection>,
) -> Result<Json<MessageResponse>, AdapterError> {
    let Json(cmd) = payload?;
    let op = operation("create_annotation", &ctx);

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.annotations).await?;
        cmd.validate()?;

        let created = client
            .create(
                &ctx,
                to_resource(&cmd, &state.config.annotations),
                &CreateOptions::default(),
            )
            .await?;

        // The store picked the name from generateName; its suffix is the legacy id
        let id = annotation_id(&created.metadata.name).map_err(AdapterError::internal)?;
        Ok(Json(MessageResponse::new("Annotation added").with_id(id)))
    })
    .await
}

/// GET /api/annotations/:id
async fn get_annotation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<AnnotationDto>, AdapterError> {
    let op = operation("get_annotation", &ctx).with_record(id.clone());

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.annotations).await?;
        let name = resource_name(&id)?;
        let obj = fetch(client.as_ref(), &ctx, &name).await?;
        to_legacy(&obj)
            .map(Json)
            .ok_or_else(|| AdapterError::not_found(NOT_FOUND_MESSAGE))
    })
    .await
}

/// PUT /api/annotations/:id
async fn update_annotation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAnnotationCommand>, JsonRejection>,
) -> Result<Json<MessageResponse>, AdapterError> {
    let Json(cmd) = payload?;
    let op = operation("update_annotation", &ctx).with_record(id.clone());

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.annotations).await?;
        let name = resource_name(&id)?;
        let existing = fetch(client.as_ref(), &ctx, &name).await?;
        ensure_writable(&existing)?;

        // Carries the fetched resourceVersion: a concurrent write yields 409
        let mut updated = existing.clone();
        updated.spec = apply_put(&existing.spec, &cmd);
        client.update(&ctx, updated, &UpdateOptions::default()).await?;

        Ok(Json(MessageResponse::new("Annotation updated")))
    })
    .await
}

/// PATCH /api/annotations/:id
async fn patch_annotation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<PatchAnnotationCommand>, JsonRejection>,
) -> Result<Json<MessageResponse>, AdapterError> {
    let Json(cmd) = payload?;
    let op = operation("patch_annotation", &ctx).with_record(id.clone());

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.annotations).await?;
        let name = resource_name(&id)?;
        let existing = fetch(client.as_ref(), &ctx, &name).await?;
        ensure_writable(&existing)?;

        let mut patched = existing.clone();
        patched.spec = apply_patch(&existing.spec, &cmd);
        client.update(&ctx, patched, &UpdateOptions::default()).await?;

        Ok(Json(MessageResponse::new("Annotation patched")))
    })
    .await
}

/// DELETE /api/annotations/:id
async fn delete_annotation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AdapterError> {
    let op = operation("delete_annotation", &ctx).with_record(id.clone());

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.annotations).await?;
        let name = resource_name(&id)?;
        let existing = fetch(client.as_ref(), &ctx, &name).await?;
        ensure_writable(&existing)?;

        // Refuse the delete if the object changed after the provisioned check
        let opts = DeleteOptions {
            precondition_resource_version: Some(existing.metadata.resource_version.clone())
                .filter(|rv| !rv.is_empty()),
        };
        client.delete(&ctx, &name, &opts).await?;

        Ok(Json(MessageResponse::new("Annotation deleted")))
    })
    .await
}

/// GET /api/annotations/tags
async fn list_tags(
    State(state): State<AppState>,
    ctx: RequestContext,
    params: Result<Query<TagsQuery>, QueryRejection>,
) -> Result<Json<TagsResponse>, AdapterError> {
    let Query(params) = params?;
    let op = operation("list_annotation_tags", &ctx);

    with_operation(op, async {
        let client = state.client_for(&ctx, &state.config.annotations).await?;
        let resource = &state.config.annotations;
        let prefix = params.tag.unwrap_or_default();
        let limit = PageLimits::new(state.config.tags_default_limit, resource.max_limit)
            .resolve(params.limit) as usize;

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut opts = ListOptions {
            limit: resource.max_limit,
            ..Default::default()
        };
        // Tags are not selectable, so every page is read and counted here
        loop {
            let page = client.list(&ctx, &opts).await?;
            for dto in page.items.iter().filter_map(to_legacy) {
                for tag in dto.tags.into_iter().filter(|t| t.starts_with(&prefix)) {
                    *counts.entry(tag).or_default() += 1;
                }
            }
            match page.continue_token() {
                Some(token) if !token.is_empty() => opts.continue_token = Some(token.to_string()),
                _ => break,
            }
        }

        if counts.len() > limit {
            warn!(
                total = counts.len(),
                limit, "annotation tag list truncated"
            );
        }
        let tags = counts
            .into_iter()
            .take(limit)
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        Ok(Json(TagsResponse {
            result: TagsResult { tags },
        }))
    })
    .await
}

// In-memory Resource API
// Namespaced object maps per group/resource with resource versions, generateName,
// field/label selectors and continuation-token pagination. Backs the standalone
// server and the test suites.

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{
    ClientProvider, CreateOptions, DeleteOptions, GroupVersionResource, ListMeta, ListOptions,
    ResourceClient, ResourceList, ResourceObject, StatusError, UpdateOptions,
};
use crate::context::RequestContext;
use crate::selector::{parse_selector, Clause, SelectorOp};
use crate::value::selector_text;

/// (group, resource, namespace)
type CollectionKey = (String, String, String);

/// Snapshot of how often each store verb was invoked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCallCounts {
    pub list: u64,
    pub get: u64,
    pub create: u64,
    pub update: u64,
    pub delete: u64,
}

impl StoreCallCounts {
    /// Calls that could have changed stored state
    pub fn mutations(&self) -> u64 {
        self.create + self.update + self.delete
    }
}

#[derive(Default)]
struct CallCounters {
    list: AtomicU64,
    get: AtomicU64,
    create: AtomicU64,
    update: AtomicU64,
    delete: AtomicU64,
}

#[derive(Default)]
struct StoreInner {
    objects: RwLock<HashMap<CollectionKey, BTreeMap<String, ResourceObject>>>,
    /// Served resources: (group, resource) -> kind
    kinds: RwLock<HashMap<(String, String), String>>,
    resource_version: AtomicU64,
    name_sequence: AtomicU64,
    calls: CallCounters,
}

/// Shared handle to an in-memory store
#[derive(Clone, Default)]
pub struct MemoryResourceStore {
    inner: Arc<StoreInner>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a resource collection with the given object kind
    pub fn register(&self, gvr: &GroupVersionResource, kind: impl Into<String>) {
        self.inner
            .kinds
            .write()
            .insert((gvr.group.clone(), gvr.resource.clone()), kind.into());
    }

    pub fn with_resource(self, gvr: &GroupVersionResource, kind: impl Into<String>) -> Self {
        self.register(gvr, kind);
        self
    }

    pub fn is_registered(&self, gvr: &GroupVersionResource) -> bool {
        self.kind_of(gvr).is_some()
    }

    fn kind_of(&self, gvr: &GroupVersionResource) -> Option<String> {
        self.inner
            .kinds
            .read()
            .get(&(gvr.group.clone(), gvr.resource.clone()))
            .cloned()
    }

    /// Client bound to one namespace
    pub fn client(&self, gvr: &GroupVersionResource, namespace: &str) -> Result<MemoryResourceClient> {
        let Some(kind) = self.kind_of(gvr) else {
            bail!("resource {} is not served by this store", gvr);
        };
        Ok(MemoryResourceClient {
            store: self.clone(),
            gvr: gvr.clone(),
            kind,
            namespace: namespace.to_string(),
        })
    }

    pub fn provider(&self) -> MemoryClientProvider {
        MemoryClientProvider {
            store: self.clone(),
        }
    }

    pub fn calls(&self) -> StoreCallCounts {
        let c = &self.inner.calls;
        StoreCallCounts {
            list: c.list.load(Ordering::SeqCst),
            get: c.get.load(Ordering::SeqCst),
            create: c.create.load(Ordering::SeqCst),
            update: c.update.load(Ordering::SeqCst),
            delete: c.delete.load(Ordering::SeqCst),
        }
    }

    /// Number of stored objects in one namespace of a collection
    pub fn len(&self, gvr: &GroupVersionResource, namespace: &str) -> usize {
        self.inner
            .objects
            .read()
            .get(&collection_key(gvr, namespace))
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, gvr: &GroupVersionResource, namespace: &str) -> bool {
        self.len(gvr, namespace) == 0
    }

    fn next_resource_version(&self) -> String {
        (self.inner.resource_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn next_name(&self, prefix: &str, taken: &BTreeMap<String, ResourceObject>) -> String {
        loop {
            let seq = self.inner.name_sequence.fetch_add(1, Ordering::SeqCst) + 1;
            let candidate = format!("{prefix}{seq}");
            if !taken.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

fn collection_key(gvr: &GroupVersionResource, namespace: &str) -> CollectionKey {
    (
        gvr.group.clone(),
        gvr.resource.clone(),
        namespace.to_string(),
    )
}

/// `ClientProvider` handing out namespace-scoped memory clients
#[derive(Clone)]
pub struct MemoryClientProvider {
    store: MemoryResourceStore,
}

#[async_trait]
impl ClientProvider for MemoryClientProvider {
    async fn client_for(
        &self,
        ctx: &RequestContext,
        gvr: &GroupVersionResource,
    ) -> Result<Box<dyn ResourceClient>> {
        let client = self.store.client(gvr, &ctx.namespace)?;
        Ok(Box::new(client))
    }
}

fn parse_requirements(selector: &str) -> std::result::Result<Vec<Clause>, StatusError> {
    // Escaped `,` and `=` stay inside their value; anything else unparseable is a 400
    parse_selector(selector)
        .ok_or_else(|| StatusError::bad_request(format!("invalid selector: {selector:?}")))
}

fn field_matches(obj: &ResourceObject, path: &str, expected: &str) -> bool {
    match path {
        "metadata.name" => obj.metadata.name == expected,
        "metadata.namespace" => obj.metadata.namespace == expected,
        // Range bounds understood by the annotations resource
        "spec.from" => {
            let Ok(from) = expected.parse::<i64>() else {
                return false;
            };
            let time = obj.spec.i64("time");
            let end = obj.spec.i64("timeEnd").max(time);
            end.is_some_and(|end| end >= from)
        }
        "spec.to" => {
            let Ok(to) = expected.parse::<i64>() else {
                return false;
            };
            obj.spec.i64("time").is_some_and(|time| time <= to)
        }
        _ => match path.strip_prefix("spec.") {
            Some(spec_path) => obj
                .spec
                .lookup(spec_path)
                .and_then(selector_text)
                .is_some_and(|actual| actual == expected),
            None => false,
        },
    }
}

fn fields_match(obj: &ResourceObject, requirements: &[Clause]) -> bool {
    requirements.iter().all(|req| {
        let matched = field_matches(obj, &req.key, &req.value);
        match req.op {
            SelectorOp::Equals => matched,
            SelectorOp::NotEquals => !matched,
        }
    })
}

fn labels_match(obj: &ResourceObject, requirements: &[Clause]) -> bool {
    requirements.iter().all(|req| {
        let matched = obj.metadata.labels.get(&req.key) == Some(&req.value);
        match req.op {
            SelectorOp::Equals => matched,
            SelectorOp::NotEquals => !matched,
        }
    })
}

fn encode_continue(name: &str) -> String {
    URL_SAFE_NO_PAD.encode(name.as_bytes())
}

fn decode_continue(token: &str) -> std::result::Result<String, StatusError> {
    URL_SAFE_NO_PAD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| StatusError::bad_request("invalid continue token"))
}

/// Namespace-scoped client over a `MemoryResourceStore`
#[derive(Clone)]
pub struct MemoryResourceClient {
    store: MemoryResourceStore,
    gvr: GroupVersionResource,
    kind: String,
    namespace: String,
}

impl MemoryResourceClient {
    fn key(&self) -> CollectionKey {
        collection_key(&self.gvr, &self.namespace)
    }

    fn check_namespace(&self, obj: &ResourceObject) -> std::result::Result<(), StatusError> {
        if !obj.metadata.namespace.is_empty() && obj.metadata.namespace != self.namespace {
            return Err(StatusError::bad_request(
                "the namespace of the provided object does not match the namespace sent on the request",
            ));
        }
        Ok(())
    }

    fn stamp(&self, obj: &mut ResourceObject) {
        obj.api_version = self.gvr.api_version();
        obj.kind = self.kind.clone();
        obj.metadata.namespace = self.namespace.clone();
    }
}

#[async_trait]
impl ResourceClient for MemoryResourceClient {
    async fn list(&self, _ctx: &RequestContext, opts: &ListOptions) -> Result<ResourceList> {
        self.store.inner.calls.list.fetch_add(1, Ordering::SeqCst);

        let field_reqs = parse_requirements(opts.field_selector.as_deref().unwrap_or(""))?;
        let label_reqs = parse_requirements(opts.label_selector.as_deref().unwrap_or(""))?;
        let after = opts
            .continue_token
            .as_deref()
            .map(decode_continue)
            .transpose()?;

        let objects = self.store.inner.objects.read();
        let mut items = Vec::new();
        let mut continue_token = None;

        if let Some(collection) = objects.get(&self.key()) {
            let candidates = collection
                .iter()
                .filter(|(name, _)| after.as_ref().map_or(true, |last| *name > last))
                .map(|(_, obj)| obj)
                .filter(|obj| fields_match(obj, &field_reqs) && labels_match(obj, &label_reqs));

            for obj in candidates {
                // Page is full and another match follows: hand out a token
                if opts.limit > 0 && items.len() as u64 == opts.limit {
                    continue_token = items
                        .last()
                        .map(|last: &ResourceObject| encode_continue(&last.metadata.name));
                    break;
                }
                items.push(obj.clone());
            }
        }

        debug!(
            resource = %self.gvr,
            namespace = %self.namespace,
            returned = items.len(),
            "memory store list"
        );

        Ok(ResourceList {
            api_version: self.gvr.api_version(),
            kind: format!("{}List", self.kind),
            metadata: ListMeta {
                continue_token,
                resource_version: self
                    .store
                    .inner
                    .resource_version
                    .load(Ordering::SeqCst)
                    .to_string(),
            },
            items,
        })
    }

    async fn get(&self, _ctx: &RequestContext, name: &str) -> Result<ResourceObject> {
        self.store.inner.calls.get.fetch_add(1, Ordering::SeqCst);

        let objects = self.store.inner.objects.read();
        let found = objects
            .get(&self.key())
            .and_then(|collection| collection.get(name))
            .cloned();
        match found {
            Some(obj) => Ok(obj),
            None => Err(StatusError::not_found(&self.gvr, name).into()),
        }
    }

    async fn create(
        &self,
        _ctx: &RequestContext,
        mut obj: ResourceObject,
        opts: &CreateOptions,
    ) -> Result<ResourceObject> {
        self.store.inner.calls.create.fetch_add(1, Ordering::SeqCst);
        self.check_namespace(&obj)?;

        let mut objects = self.store.inner.objects.write();
        let collection = objects.entry(self.key()).or_default();

        if obj.metadata.name.is_empty() {
            if obj.metadata.generate_name.is_empty() {
                return Err(StatusError::invalid("name or generateName is required").into());
            }
            // Sequence is global across collections, skipping names already taken
            obj.metadata.name = self.store.next_name(&obj.metadata.generate_name, collection);
        } else if collection.contains_key(&obj.metadata.name) {
            return Err(StatusError::already_exists(&self.gvr, &obj.metadata.name).into());
        }

        self.stamp(&mut obj);
        obj.metadata.creation_timestamp = Some(Utc::now());
        obj.metadata.resource_version = self.store.next_resource_version();

        if !opts.dry_run {
            collection.insert(obj.metadata.name.clone(), obj.clone());
        }
        Ok(obj)
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        mut obj: ResourceObject,
        opts: &UpdateOptions,
    ) -> Result<ResourceObject> {
        self.store.inner.calls.update.fetch_add(1, Ordering::SeqCst);
        self.check_namespace(&obj)?;

        let mut objects = self.store.inner.objects.write();
        let Some(existing) = objects
            .get_mut(&self.key())
            .and_then(|collection| collection.get_mut(&obj.metadata.name))
        else {
            return Err(StatusError::not_found(&self.gvr, &obj.metadata.name).into());
        };

        // An empty resourceVersion is an unconditional write
        if !obj.metadata.resource_version.is_empty()
            && obj.metadata.resource_version != existing.metadata.resource_version
        {
            return Err(StatusError::conflict(&self.gvr, &obj.metadata.name).into());
        }

        // System metadata is owned by the store, not the caller
        self.stamp(&mut obj);
        obj.metadata.generate_name = existing.metadata.generate_name.clone();
        obj.metadata.creation_timestamp = existing.metadata.creation_timestamp;
        obj.metadata.resource_version = self.store.next_resource_version();

        if !opts.dry_run {
            *existing = obj.clone();
        }
        Ok(obj)
    }

    async fn delete(&self, _ctx: &RequestContext, name: &str, opts: &DeleteOptions) -> Result<()> {
        self.store.inner.calls.delete.fetch_add(1, Ordering::SeqCst);

        let mut objects = self.store.inner.objects.write();
        let Some(collection) = objects.get_mut(&self.key()) else {
            return Err(StatusError::not_found(&self.gvr, name).into());
        };
        let Some(existing) = collection.get(name) else {
            return Err(StatusError::not_found(&self.gvr, name).into());
        };
        if let Some(expected) = &opts.precondition_resource_version {
            if *expected != existing.metadata.resource_version {
                return Err(StatusError::conflict(&self.gvr, name).into());
            }
        }
        collection.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gvr() -> GroupVersionResource {
        GroupVersionResource::new("annotation.grafana.app", "v0alpha1", "annotations")
    }

    fn store() -> MemoryResourceStore {
        MemoryResourceStore::new().with_resource(&gvr(), "Annotation")
    }

    fn annotation(text: &str, time: i64) -> ResourceObject {
        let mut obj = ResourceObject::default();
        obj.metadata.generate_name = "a-".to_string();
        obj.spec.set("text", text);
        obj.spec.set("time", time);
        obj
    }

    #[tokio::test]
    async fn test_generate_name_uses_decimal_sequence() -> Result<()> {
        let store = store();
        let client = store.client(&gvr(), "default")?;
        let ctx = RequestContext::default();

        let first = client.create(&ctx, annotation("one", 1), &CreateOptions::default()).await?;
        let second = client.create(&ctx, annotation("two", 2), &CreateOptions::default()).await?;

        assert_eq!(first.metadata.name, "a-1");
        assert_eq!(second.metadata.name, "a-2");
        assert_eq!(first.metadata.namespace, "default");
        assert!(first.metadata.creation_timestamp.is_some());
        assert_ne!(first.metadata.resource_version, second.metadata.resource_version);
        assert_eq!(first.kind, "Annotation");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_requires_a_name() -> Result<()> {
        let client = store().client(&gvr(), "default")?;
        let err = client
            .create(&RequestContext::default(), ResourceObject::default(), &CreateOptions::default())
            .await
            .unwrap_err();
        let status = err.downcast::<StatusError>()?;
        assert_eq!(status.code, 422);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_names_are_rejected() -> Result<()> {
        let client = store().client(&gvr(), "default")?;
        let ctx = RequestContext::default();
        let mut obj = ResourceObject::default();
        obj.metadata.name = "fixed".to_string();
        client.create(&ctx, obj.clone(), &CreateOptions::default()).await?;
        let err = client.create(&ctx, obj, &CreateOptions::default()).await.unwrap_err();
        assert_eq!(err.downcast::<StatusError>()?.code, 409);
        Ok(())
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() -> Result<()> {
        let store = store();
        let ctx = RequestContext::default();
        let org1 = store.client(&gvr(), "default")?;
        let org2 = store.client(&gvr(), "org-2")?;

        let created = org1.create(&ctx, annotation("mine", 1), &CreateOptions::default()).await?;
        let err = org2.get(&ctx, &created.metadata.name).await.unwrap_err();
        assert!(err.downcast::<StatusError>()?.is_not_found());
        assert_eq!(org2.list(&ctx, &ListOptions::default()).await?.items.len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_field_selectors_and_ranges() -> Result<()> {
        let client = store().client(&gvr(), "default")?;
        let ctx = RequestContext::default();
        for (text, time) in [("a", 100), ("b", 200), ("c", 300)] {
            let mut obj = annotation(text, time);
            obj.spec.set("dashboardUID", if time < 300 { "dash" } else { "other" });
            client.create(&ctx, obj, &CreateOptions::default()).await?;
        }

        let list = |selector: &str| ListOptions {
            field_selector: Some(selector.to_string()),
            ..Default::default()
        };

        let texts = |list: ResourceList| -> Vec<String> {
            list.items
                .iter()
                .filter_map(|o| o.spec.str("text").map(str::to_string))
                .collect()
        };

        assert_eq!(texts(client.list(&ctx, &list("spec.dashboardUID=dash")).await?), ["a", "b"]);
        assert_eq!(texts(client.list(&ctx, &list("spec.from=150")).await?), ["b", "c"]);
        assert_eq!(texts(client.list(&ctx, &list("spec.to=250")).await?), ["a", "b"]);
        assert_eq!(
            texts(client.list(&ctx, &list("spec.dashboardUID=dash,spec.from=150")).await?),
            ["b"]
        );
        assert_eq!(texts(client.list(&ctx, &list("spec.text!=a")).await?), ["b", "c"]);
        assert!(client.list(&ctx, &list("garbage")).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_range_uses_time_end() -> Result<()> {
        let client = store().client(&gvr(), "default")?;
        let ctx = RequestContext::default();
        let mut region = annotation("region", 100);
        region.spec.set("timeEnd", 500);
        client.create(&ctx, region, &CreateOptions::default()).await?;

        let opts = ListOptions {
            field_selector: Some("spec.from=400".to_string()),
            ..Default::default()
        };
        assert_eq!(client.list(&ctx, &opts).await?.items.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_pagination_with_continue_tokens() -> Result<()> {
        let client = store().client(&gvr(), "default")?;
        let ctx = RequestContext::default();
        for i in 0..5 {
            client.create(&ctx, annotation("x", i), &CreateOptions::default()).await?;
        }

        let mut opts = ListOptions {
            limit: 2,
            ..Default::default()
        };
        let mut seen = Vec::new();
        loop {
            let page = client.list(&ctx, &opts).await?;
            assert!(page.items.len() <= 2);
            seen.extend(page.items.iter().map(|o| o.metadata.name.clone()));
            match page.continue_token() {
                Some(token) => opts.continue_token = Some(token.to_string()),
                None => break,
            }
        }
        assert_eq!(seen, ["a-1", "a-2", "a-3", "a-4", "a-5"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_checks_resource_version() -> Result<()> {
        let client = store().client(&gvr(), "default")?;
        let ctx = RequestContext::default();
        let created = client.create(&ctx, annotation("v1", 1), &CreateOptions::default()).await?;

        let mut first = created.clone();
        first.spec.set("text", "v2");
        let updated = client.update(&ctx, first, &UpdateOptions::default()).await?;
        assert_eq!(updated.metadata.creation_timestamp, created.metadata.creation_timestamp);

        let mut stale = created.clone();
        stale.spec.set("text", "v3");
        let err = client.update(&ctx, stale, &UpdateOptions::default()).await.unwrap_err();
        assert_eq!(err.downcast::<StatusError>()?.code, 409);

        let stored = client.get(&ctx, &created.metadata.name).await?;
        assert_eq!(stored.spec.get("text"), Some(&json!("v2")));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_and_call_counts() -> Result<()> {
        let store = store();
        let client = store.client(&gvr(), "default")?;
        let ctx = RequestContext::default();
        let created = client.create(&ctx, annotation("gone", 1), &CreateOptions::default()).await?;

        let stale = DeleteOptions {
            precondition_resource_version: Some("nope".to_string()),
        };
        assert!(client.delete(&ctx, &created.metadata.name, &stale).await.is_err());
        client.delete(&ctx, &created.metadata.name, &DeleteOptions::default()).await?;
        assert!(store.is_empty(&gvr(), "default"));

        let calls = store.calls();
        assert_eq!(calls.create, 1);
        assert_eq!(calls.delete, 2);
        assert_eq!(calls.mutations(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_unregistered_resources_have_no_client() {
        let provider = MemoryResourceStore::new().provider();
        let result = provider
            .client_for(&RequestContext::default(), &gvr())
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!(parse_requirements("a=1, b==2,c!=3").unwrap().len(), 3);
        assert!(parse_requirements("").unwrap().is_empty());
        let err = parse_requirements("novalue").unwrap_err();
        assert_eq!(err.code, 400);
    }
}

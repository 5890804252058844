// Request Context
// Per-request identity threaded unmodified into every store call.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::errors::AdapterError;
use crate::identifier::namespace_for_org;

pub const ORG_HEADER: &str = "x-org-id";
pub const USER_HEADER: &str = "x-user";

/// Organisation used when the caller does not send `X-Org-Id`
pub const DEFAULT_ORG_ID: i64 = 1;

/// Identity and correlation data for one legacy HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub org_id: i64,
    pub namespace: String,
    pub user: Option<String>,
    pub trace_id: Uuid,
}

impl RequestContext {
    pub fn for_org(org_id: i64) -> Self {
        Self {
            org_id,
            namespace: namespace_for_org(org_id),
            user: None,
            trace_id: Uuid::new_v4(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::for_org(DEFAULT_ORG_ID)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AdapterError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let org_id = match parts.headers.get(ORG_HEADER) {
            None => DEFAULT_ORG_ID,
            Some(raw) => raw
                .to_str()
                .ok()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .filter(|org| *org >= 1)
                .ok_or_else(|| AdapterError::validation("Invalid X-Org-Id header"))?,
        };

        let mut ctx = RequestContext::for_org(org_id);
        if let Some(user) = parts.headers.get(USER_HEADER).and_then(|v| v.to_str().ok()) {
            if !user.is_empty() {
                ctx = ctx.with_user(user);
            }
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<RequestContext, AdapterError> {
        let (mut parts, _) = request.into_parts();
        RequestContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_defaults_to_org_one() {
        let ctx = extract(Request::builder().body(()).unwrap()).await.unwrap();
        assert_eq!(ctx.org_id, 1);
        assert_eq!(ctx.namespace, "default");
        assert!(ctx.user.is_none());
    }

    #[tokio::test]
    async fn test_reads_org_and_user_headers() {
        let request = Request::builder()
            .header(ORG_HEADER, "3")
            .header(USER_HEADER, "admin")
            .body(())
            .unwrap();
        let ctx = extract(request).await.unwrap();
        assert_eq!(ctx.org_id, 3);
        assert_eq!(ctx.namespace, "org-3");
        assert_eq!(ctx.user.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_org() {
        for bad in ["abc", "0", "-2"] {
            let request = Request::builder().header(ORG_HEADER, bad).body(()).unwrap();
            let err = extract(request).await.unwrap_err();
            assert!(matches!(err, AdapterError::Validation(_)), "{bad}");
        }
    }
}

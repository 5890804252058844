// Centralized Observability Infrastructure
// Structured logging setup and the operation wrapper every handler runs inside.

use anyhow::Result;
use chrono::Utc;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::errors::AdapterError;
use crate::identifier::RecordKind;

static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNTER: AtomicU64 = AtomicU64::new(0);

pub const DEFAULT_FILTER: &str = "resource_bridge=info,warn";
pub const VERBOSE_FILTER: &str = "resource_bridge=debug,info";
pub const QUIET_FILTER: &str = "error";

/// Initialize the logging and tracing infrastructure
pub fn init_logging() -> Result<()> {
    init_logging_with_level(false, false)
}

/// Initialize logging with configurable verbosity
pub fn init_logging_with_level(verbose: bool, quiet: bool) -> Result<()> {
    let filter_level = if quiet {
        QUIET_FILTER
    } else if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };

    // --quiet wins over RUST_LOG
    let env_filter = if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_level))
    } else {
        EnvFilter::new(filter_level)
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(!quiet)
        .with_thread_ids(!quiet)
        .with_line_number(!quiet)
        .with_file(!quiet)
        .with_ansi(true);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        Ok(()) => {
            if !quiet {
                info!("resource-bridge observability initialized");
            }
            Ok(())
        }
        // Already initialized, which is fine in test environments
        Err(_) => Ok(()),
    }
}

/// Context attached to every log line of one logical operation
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub trace_id: Uuid,
    pub span_id: Uuid,
    pub operation: String,
    pub kind: Option<RecordKind>,
    pub record_id: Option<String>,
    pub start_time: Instant,
}

impl OperationContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            span_id: Uuid::new_v4(),
            operation: operation.into(),
            kind: None,
            record_id: None,
            start_time: Instant::now(),
        }
    }

    /// Reuse the request's trace id so all operations of a request correlate
    pub fn with_trace(mut self, trace_id: Uuid) -> Self {
        self.trace_id = trace_id;
        self
    }

    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn kind_label(&self) -> String {
        self.kind.map(|k| k.to_string()).unwrap_or_default()
    }

    fn record_label(&self) -> &str {
        self.record_id.as_deref().unwrap_or("")
    }
}

fn record_outcome<T, E: Display>(ctx: &OperationContext, result: &std::result::Result<T, E>, internal: bool) {
    let elapsed = ctx.elapsed();
    OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);

    match result {
        Ok(_) => {
            info!(
                trace_id = %ctx.trace_id,
                span_id = %ctx.span_id,
                kind = %ctx.kind_label(),
                record = %ctx.record_label(),
                elapsed_ms = elapsed.as_millis(),
                "Operation completed: {}", ctx.operation
            );
        }
        // Internal failures are logged as errors; caller mistakes as warnings
        Err(e) if internal => {
            ERROR_COUNTER.fetch_add(1, Ordering::Relaxed);
            error!(
                trace_id = %ctx.trace_id,
                span_id = %ctx.span_id,
                kind = %ctx.kind_label(),
                record = %ctx.record_label(),
                elapsed_ms = elapsed.as_millis(),
                error = %e,
                "Operation failed: {}", ctx.operation
            );
        }
        Err(e) => {
            warn!(
                trace_id = %ctx.trace_id,
                span_id = %ctx.span_id,
                kind = %ctx.kind_label(),
                record = %ctx.record_label(),
                elapsed_ms = elapsed.as_millis(),
                error = %e,
                "Operation rejected: {}", ctx.operation
            );
        }
    }
}

fn log_start(ctx: &OperationContext) {
    debug!(
        trace_id = %ctx.trace_id,
        span_id = %ctx.span_id,
        kind = %ctx.kind_label(),
        record = %ctx.record_label(),
        "Starting operation: {}", ctx.operation
    );
}

/// Run a request operation with start/finish logging under the given context
pub async fn with_operation<F, T>(ctx: OperationContext, f: F) -> std::result::Result<T, AdapterError>
where
    F: std::future::Future<Output = std::result::Result<T, AdapterError>>,
{
    log_start(&ctx);
    let result = f.await;
    let internal = result.as_ref().err().is_some_and(AdapterError::is_internal);
    record_outcome(&ctx, &result, internal);
    result
}

/// Execute a future with a fresh trace context
pub async fn with_trace_id<F, T>(operation: &str, f: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    let ctx = OperationContext::new(operation);
    log_start(&ctx);
    let result = f.await;
    record_outcome(&ctx, &result, true);
    result
}

/// Current operation counters
pub fn get_metrics() -> serde_json::Value {
    serde_json::json!({
        "operations": {
            "total": OPERATION_COUNTER.load(Ordering::Relaxed),
            "errors": ERROR_COUNTER.load(Ordering::Relaxed),
        },
        "timestamp": Utc::now().to_rfc3339(),
    })
}

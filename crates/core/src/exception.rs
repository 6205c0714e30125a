//! ExceptionSink: where unrecoverable pipeline failures are reported.

use tracing::error;

/// Reporting hook for failures that escape the pipeline.
pub trait ExceptionSink: Send + Sync {
    fn capture_exception(&self, error: &(dyn std::error::Error + Send + Sync), context: &str);
}

/// Reports through the tracing subscriber. The default sink when no external
/// error tracker is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExceptionSink;

impl ExceptionSink for TracingExceptionSink {
    fn capture_exception(&self, error: &(dyn std::error::Error + Send + Sync), context: &str) {
        error!(error = %error, context, "Captured exception");
    }
}

//! TracingDiagnostics - tracing + host debug channel への診断ログ
//!
//! host 側の debug channel はエラーを返すこともパニックすることもあるが、
//! どちらもここで握りつぶす（capture フローを止めない）。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::ports::{DiagnosticSink, HostDebugChannel};

#[derive(Clone, Default)]
pub struct TracingDiagnostics {
    host: Option<Arc<dyn HostDebugChannel>>,
}

impl TracingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also forward every line to the shell's debug log.
    pub fn with_host_channel(mut self, channel: Arc<dyn HostDebugChannel>) -> Self {
        self.host = Some(channel);
        self
    }
}

impl DiagnosticSink for TracingDiagnostics {
    fn log(&self, category: &str, message: &str) {
        tracing::debug!(target: "housekeep::diagnostics", category, "{message}");

        let Some(host) = &self.host else {
            return;
        };
        let line = format!("[{category}] {message}");
        match catch_unwind(AssertUnwindSafe(|| host.debug_log(&line))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::trace!(error = %err, "host debug channel rejected log line");
            }
            Err(_) => {
                tracing::trace!("host debug channel panicked");
            }
        }
    }
}

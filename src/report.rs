//! Non-fatal reporting and logging setup.
//!
//! Problems that must not stop a batch (an unreadable source, a requested
//! size larger than the source, an option the target format ignores) go
//! through a [`Reporter`] instead of an `Err`. The pipeline takes the
//! reporter as a collaborator so a host can collect, count or surface them
//! however it likes; [`TracingReporter`] forwards to `tracing`.

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Channel for warnings and non-fatal errors.
pub trait Reporter: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn warn(&self, message: &str) {
        (**self).warn(message)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }
}

/// Reporter that emits `tracing` events at WARN / ERROR.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Initialize the global tracing subscriber for the CLI.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects DEBUG for this
/// crate and the default is WARN. Events go to stderr so stdout stays clean
/// for `--json` output.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "simple_srcset=debug"
    } else {
        "warn"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second init (tests, embedding hosts) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

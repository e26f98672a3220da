//! Render dispatch: turning a plan's variants into files.
//!
//! The pipeline never renders directly. It builds one [`RenderRequest`] per
//! source image, carrying every variant operation, and hands it to an
//! injected [`RenderDispatcher`]. The request runs eagerly on the tokio
//! runtime; callers get a [`RenderCompletion`] they can clone and await as
//! many times as they like.
//!
//! ## Dispatchers
//!
//! | Dispatcher | Behavior |
//! |------------|----------|
//! | [`LocalDispatcher`] | Renders through an [`ImageBackend`] on the blocking pool, operations in parallel with rayon |
//! | [`DryRunDispatcher`] | Logs each operation and renders nothing (`--no-render`) |
//!
//! The local dispatcher deduplicates: a request with the same content digest
//! and operations as one that is running or has succeeded shares its
//! completion instead of rendering again. A failed request is forgotten once
//! it resolves, so the next identical request renders afresh. Outputs already
//! on disk are skipped, since their path already encodes content and
//! arguments.

use crate::cache::stable_json;
use crate::imaging::{BackendError, ImageBackend, RenderParams, TransformArgs};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Render failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Render task failed: {0}")]
    Join(String),
    #[error("Could not key render request: {0}")]
    Key(#[from] serde_json::Error),
    #[error(transparent)]
    Shared(Arc<DispatchError>),
}

/// A single variant to write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOperation {
    /// Relative to the request's `output_dir`.
    pub output_path: String,
    pub args: TransformArgs,
}

/// Source facts a dispatcher may want for logging or routing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderMetadata {
    pub content_digest: String,
    pub name: String,
    pub format: String,
}

/// Every variant of one source image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub operations: Vec<RenderOperation>,
    pub metadata: RenderMetadata,
}

impl RenderRequest {
    /// Identity for deduplication: same content, same operations.
    pub fn dedup_key(&self) -> Result<String, serde_json::Error> {
        Ok(format!(
            "{}:{}:{}",
            self.metadata.content_digest,
            self.output_dir.display(),
            stable_json(&self.operations)?
        ))
    }
}

/// Cloneable, awaitable outcome of one dispatched request.
pub type RenderCompletion = Shared<BoxFuture<'static, Result<(), Arc<DispatchError>>>>;

/// Executes render requests. Injected into the pipeline.
#[async_trait]
pub trait RenderDispatcher: Send + Sync {
    async fn dispatch(&self, request: RenderRequest) -> Result<(), DispatchError>;
}

/// Spawn `request` on `dispatcher` right away and return its completion.
///
/// Must be called from within a tokio runtime.
pub fn spawn_dispatch(
    dispatcher: Arc<dyn RenderDispatcher>,
    request: RenderRequest,
) -> RenderCompletion {
    let handle = tokio::spawn(async move { dispatcher.dispatch(request).await });
    async move {
        match handle.await {
            Ok(result) => result.map_err(Arc::new),
            Err(e) => Err(Arc::new(DispatchError::Join(e.to_string()))),
        }
    }
    .boxed()
    .shared()
}

// ============================================================================
// Local dispatcher
// ============================================================================

/// Renders requests in-process through an [`ImageBackend`].
///
/// Parallelism comes from rayon's global pool, which the CLI sizes from
/// `[processing] max_processes`.
pub struct LocalDispatcher {
    backend: Arc<dyn ImageBackend>,
    jobs: Mutex<HashMap<String, RenderCompletion>>,
}

impl LocalDispatcher {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self {
            backend,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct requests running or finished successfully.
    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    fn start(&self, request: RenderRequest) -> RenderCompletion {
        let backend = Arc::clone(&self.backend);
        let handle = tokio::task::spawn_blocking(move || render_request(backend.as_ref(), &request));
        async move {
            match handle.await {
                Ok(result) => result.map_err(Arc::new),
                Err(e) => Err(Arc::new(DispatchError::Join(e.to_string()))),
            }
        }
        .boxed()
        .shared()
    }
}

#[async_trait]
impl RenderDispatcher for LocalDispatcher {
    async fn dispatch(&self, request: RenderRequest) -> Result<(), DispatchError> {
        let key = request.dedup_key()?;
        let completion = {
            let mut jobs = self.jobs.lock().await;
            match jobs.get(&key).cloned() {
                Some(existing) => {
                    tracing::debug!(name = %request.metadata.name, "joining identical render");
                    existing
                }
                None => {
                    let completion = self.start(request);
                    jobs.insert(key.clone(), completion.clone());
                    completion
                }
            }
        };

        let result = completion.clone().await;
        if result.is_err() {
            // Only evict our own entry; a retry may already have replaced it
            let mut jobs = self.jobs.lock().await;
            if jobs.get(&key).is_some_and(|c| c.ptr_eq(&completion)) {
                jobs.remove(&key);
            }
        }
        result.map_err(DispatchError::Shared)
    }
}

/// Render every operation of `request`, skipping outputs that already exist.
///
/// All operations are attempted; the first failure is returned.
pub fn render_request(
    backend: &dyn ImageBackend,
    request: &RenderRequest,
) -> Result<(), DispatchError> {
    let results: Vec<Result<(), BackendError>> = request
        .operations
        .par_iter()
        .map(|op| {
            let output = request.output_dir.join(&op.output_path);
            if output.exists() {
                tracing::debug!(output = %output.display(), "exists, skipping");
                return Ok(());
            }
            tracing::debug!(
                output = %output.display(),
                width = op.args.width,
                height = op.args.height,
                "rendering"
            );
            backend.render(&RenderParams {
                source: request.input_path.clone(),
                output,
                args: op.args.clone(),
            })
        })
        .collect();

    match results.into_iter().find_map(Result::err) {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

// ============================================================================
// Dry run
// ============================================================================

/// Logs what would be rendered and succeeds without touching the disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunDispatcher;

#[async_trait]
impl RenderDispatcher for DryRunDispatcher {
    async fn dispatch(&self, request: RenderRequest) -> Result<(), DispatchError> {
        for op in &request.operations {
            tracing::info!(
                output = %request.output_dir.join(&op.output_path).display(),
                "would render"
            );
        }
        Ok(())
    }
}

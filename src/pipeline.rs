//! The image pipeline: source file in, planned image out.
//!
//! [`ImagePipeline`] ties the pure stages to their collaborators:
//!
//! ```text
//! read source ──► heal options ──► plan ──► placeholders ──► dispatch
//!  (backend)       (options)      (plan)   (backend+cache)  (dispatcher)
//! ```
//!
//! Each call plans one source image and dispatches exactly one
//! [`RenderRequest`] holding every variant. The returned [`Rendered`] carries
//! the plan plus the request's shared completion; the plan is usable right
//! away (its URLs do not depend on the render) while the files appear once
//! the completion resolves.
//!
//! A source that cannot be read is not an error for the batch: it is
//! reported through the [`Reporter`] and the call returns `Ok(None)`.
//! Invalid options do fail the call.

use crate::cache::{Cache, CacheError, cache_key, hash_file, stable_json};
use crate::config::PluginConfig;
use crate::dispatch::{
    DispatchError, RenderCompletion, RenderDispatcher, RenderMetadata, RenderOperation,
    RenderRequest, spawn_dispatch,
};
use crate::imaging::trace::svg_data_uri;
use crate::imaging::{BackendError, ImageBackend};
use crate::naming::{output_root, split_file_name};
use crate::options::{ImageArgs, ImageOptions, OptionsError, heal};
use crate::plan::{FixedPlan, FluidPlan, Plan, ResizePlan, VariantSpec, plan_fixed, plan_fluid, plan_resize};
use crate::report::{Reporter, TracingReporter};
use crate::types::SourceImage;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Could not read {path}: {source}")]
    Source { path: PathBuf, source: BackendError },
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A plan plus the completion of its render request.
#[derive(Clone)]
pub struct Rendered<P> {
    pub image: P,
    completion: RenderCompletion,
}

impl<P> Rendered<P> {
    /// A handle that resolves when every variant is on disk.
    pub fn completion(&self) -> RenderCompletion {
        self.completion.clone()
    }

    /// Wait for the render request to finish.
    pub async fn finished(&self) -> Result<(), Arc<DispatchError>> {
        self.completion.clone().await
    }
}

/// Plans images and dispatches their renders.
pub struct ImagePipeline {
    config: PluginConfig,
    backend: Arc<dyn ImageBackend>,
    dispatcher: Arc<dyn RenderDispatcher>,
    cache: Option<Arc<dyn Cache>>,
    reporter: Arc<dyn Reporter>,
}

impl ImagePipeline {
    pub fn new(
        config: PluginConfig,
        backend: Arc<dyn ImageBackend>,
        dispatcher: Arc<dyn RenderDispatcher>,
    ) -> Self {
        Self {
            config,
            backend,
            dispatcher,
            cache: None,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Memoize placeholders in `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Responsive variants selected by width (or height).
    pub async fn fluid(
        &self,
        path: &Path,
        args: &ImageArgs,
        overrides: Option<&ImageArgs>,
    ) -> Result<Option<Rendered<FluidPlan>>, PipelineError> {
        self.run(path, args, overrides, plan_fluid).await
    }

    /// Fixed-size variants at 1x / 1.5x / 2x.
    pub async fn fixed(
        &self,
        path: &Path,
        args: &ImageArgs,
        overrides: Option<&ImageArgs>,
    ) -> Result<Option<Rendered<FixedPlan>>, PipelineError> {
        self.run(path, args, overrides, plan_fixed).await
    }

    /// A single resized rendition.
    pub async fn resize(
        &self,
        path: &Path,
        args: &ImageArgs,
        overrides: Option<&ImageArgs>,
    ) -> Result<Option<Rendered<ResizePlan>>, PipelineError> {
        self.run(path, args, overrides, plan_resize).await
    }

    /// Identify and hash a source file.
    pub async fn read_source(&self, path: &Path) -> Result<SourceImage, PipelineError> {
        let backend = Arc::clone(&self.backend);
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let input = absolute.clone();
        let read = tokio::task::spawn_blocking(move || {
            let identified = backend.identify(&input)?;
            let content_digest = hash_file(&input)?;
            Ok::<_, BackendError>((identified, content_digest))
        })
        .await?;

        let (identified, content_digest) = read.map_err(|source| PipelineError::Source {
            path: absolute.clone(),
            source,
        })?;
        let (name, extension) = split_file_name(&absolute);
        Ok(SourceImage {
            width: identified.width,
            height: identified.height,
            density: identified.density,
            format: identified.format,
            content_digest,
            absolute_path: absolute,
            name,
            extension,
        })
    }

    async fn run<P, F>(
        &self,
        path: &Path,
        args: &ImageArgs,
        overrides: Option<&ImageArgs>,
        planner: F,
    ) -> Result<Option<Rendered<P>>, PipelineError>
    where
        P: Plan,
        F: FnOnce(&SourceImage, &ImageOptions) -> Result<P, OptionsError>,
    {
        let source = match self.read_source(path).await {
            Ok(source) => source,
            Err(e @ PipelineError::Source { .. }) => {
                self.reporter.error(&e.to_string());
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let healed = heal(&self.config, args, &source.extension, overrides)?;
        for warning in &healed.warnings {
            self.reporter.warn(&format!("{}: {warning}", source.absolute_path.display()));
        }

        let mut plan = planner(&source, &healed.options)?;
        for warning in plan.warnings() {
            self.reporter.warn(warning);
        }

        match self.attach_placeholders(&source, &mut plan).await {
            Ok(()) => {}
            Err(e @ PipelineError::Source { .. }) => {
                self.reporter.error(&e.to_string());
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        let request = self.render_request(&source, plan.variants());
        tracing::debug!(
            source = %source.absolute_path.display(),
            variants = request.operations.len(),
            "dispatching"
        );
        let completion = spawn_dispatch(Arc::clone(&self.dispatcher), request);
        Ok(Some(Rendered {
            image: plan,
            completion,
        }))
    }

    fn render_request(&self, source: &SourceImage, variants: &[VariantSpec]) -> RenderRequest {
        RenderRequest {
            input_path: source.absolute_path.clone(),
            output_dir: output_root(Path::new(&self.config.public_dir), &source.content_digest),
            operations: variants
                .iter()
                .map(|v| RenderOperation {
                    output_path: v.output_relative_path.clone(),
                    args: v.args.clone(),
                })
                .collect(),
            metadata: RenderMetadata {
                content_digest: source.content_digest.clone(),
                name: source.name.clone(),
                format: source.format.clone(),
            },
        }
    }

    async fn attach_placeholders<P: Plan>(
        &self,
        source: &SourceImage,
        plan: &mut P,
    ) -> Result<(), PipelineError> {
        let request = plan.placeholders().clone();

        if let Some(args) = request.base64 {
            let key = cache_key(&source.content_digest, &args).map_err(CacheError::from)?;
            let backend = Arc::clone(&self.backend);
            let input = source.absolute_path.clone();
            let uri = self
                .memoize(key, source, move || {
                    let bytes = backend.encode(&input, &args)?;
                    Ok(format!(
                        "data:{};base64,{}",
                        args.to_format.mime_type(),
                        BASE64.encode(bytes)
                    ))
                })
                .await?;
            plan.set_base64(uri);
        }

        if let Some(traced) = request.traced {
            let options_json = stable_json(&traced.options).map_err(CacheError::from)?;
            let key = format!(
                "traced:{}{}",
                cache_key(&source.content_digest, &traced.args).map_err(CacheError::from)?,
                options_json
            );
            let backend = Arc::clone(&self.backend);
            let input = source.absolute_path.clone();
            let uri = self
                .memoize(key, source, move || {
                    let svg = backend.trace(&input, &traced.args, &traced.options)?;
                    Ok(svg_data_uri(&svg))
                })
                .await?;
            plan.set_traced_svg(uri);
        }

        Ok(())
    }

    /// Look `key` up in the cache, computing and storing it on a miss.
    async fn memoize<F>(
        &self,
        key: String,
        source: &SourceImage,
        compute: F,
    ) -> Result<String, PipelineError>
    where
        F: FnOnce() -> Result<String, BackendError> + Send + 'static,
    {
        if let Some(cache) = &self.cache
            && let Some(Value::String(hit)) = cache.get(&key).await?
        {
            return Ok(hit);
        }

        let value = tokio::task::spawn_blocking(compute)
            .await?
            .map_err(|e| PipelineError::Source {
                path: source.absolute_path.clone(),
                source: e,
            })?;

        if let Some(cache) = &self.cache {
            cache.set(&key, Value::String(value.clone())).await?;
        }
        Ok(value)
    }
}

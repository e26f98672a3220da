//! # Simple Srcset
//!
//! Responsive image variants for static site builds, plus a small
//! declarative directory provider.
//!
//! Given one source image and a handful of sizing options, simple-srcset
//! decides which renditions a page needs, names them by content and
//! arguments, renders them, and hands back everything an `<img>` tag wants:
//! `src`, `srcset`, `sizes`, MIME type, aspect ratio and an optional
//! placeholder (a tiny base64 raster or a traced SVG).
//!
//! # Architecture: Pure Core, Injected Edges
//!
//! ```text
//! ImageArgs ──heal──► ImageOptions ──plan──► FluidPlan / FixedPlan / ResizePlan
//!   (layers)           (resolved)              │
//!                                              ├─► RenderRequest ──► RenderDispatcher
//!                                              └─► placeholders  ──► ImageBackend + Cache
//! ```
//!
//! Healing and planning are pure functions: no I/O, identical inputs give
//! identical output, and every sizing rule can be tested without an image.
//! Everything with side effects sits behind a trait the caller injects:
//!
//! - [`ImageBackend`](imaging::ImageBackend) decodes, transforms and encodes.
//! - [`RenderDispatcher`](dispatch::RenderDispatcher) executes one request per
//!   source image.
//! - [`Cache`](cache::Cache) memoizes placeholders by content and arguments.
//! - [`Reporter`](report::Reporter) receives non-fatal warnings and errors.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`options`] | Merges `config < args < overrides` into resolved options; warnings for ignored options |
//! | [`plan`] | Fluid, fixed and resize variant planning; `srcset`/`sizes` strings |
//! | [`pipeline`] | Source read → heal → plan → placeholders → dispatch |
//! | [`dispatch`] | Render requests, shared completions, the local and dry-run dispatchers |
//! | [`cache`] | Content/args hashing, cache keys, in-memory and JSON-file caches |
//! | [`imaging`] | Pure-Rust image operations: identify, transform, encode, trace |
//! | [`naming`] | Output paths and public URLs for variants |
//! | [`resources`] | Directory create/read/update/destroy/plan/validate |
//! | [`config`] | `simple-srcset.toml` loading, validation and merging |
//! | [`report`] | Reporter trait and tracing setup |
//! | [`output`] | CLI output formatting |
//! | [`types`] | Source image record and sizing axis |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Output
//!
//! Variants land at `static/{contentDigest}/{argsDigest}/{name}.{format}`.
//! The content digest is the SHA-256 of the source file and the args digest
//! is a short SHA-256 of the variant's resolved arguments. An edited photo
//! or a changed option therefore yields a new URL, which makes the output
//! safe to serve with immutable cache headers, and an unchanged variant is
//! never rendered twice: the dispatcher skips files that already exist.
//!
//! ## Never Upscale
//!
//! Both planning modes cap every variant at the source's intrinsic size.
//! Fluid plans always offer the original resolution as the largest entry;
//! a fixed request larger than the source degrades to a single variant at
//! source size with a warning rather than failing the build.
//!
//! ## One Request per Source
//!
//! The pipeline dispatches all variants of an image as a single request and
//! returns a shared completion future. A host can await it, clone it into
//! several consumers, or ignore it; identical requests are deduplicated so
//! two pages using the same image at the same options render once.
//!
//! ## Warnings Are Not Errors
//!
//! An unreadable source, an option the output format ignores, or a size the
//! source cannot satisfy should not stop a site build of thousands of
//! images. Those go to the [`Reporter`](report::Reporter); only caller
//! mistakes (a zero width, an unknown format) return `Err`.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod imaging;
pub mod naming;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod resources;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

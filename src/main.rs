use clap::{Parser, Subcommand};
use serde::Serialize;
use simple_srcset::cache::DiskCache;
use simple_srcset::dispatch::{DryRunDispatcher, LocalDispatcher, RenderDispatcher};
use simple_srcset::imaging::{ImageBackend, RustBackend, TraceOptions};
use simple_srcset::options::ImageArgs;
use simple_srcset::pipeline::ImagePipeline;
use simple_srcset::resources::ProviderContext;
use simple_srcset::resources::directory::{self, DirectoryDescriptor};
use simple_srcset::{config, output, report};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Image options shared by the fluid, fixed and resize commands.
#[derive(clap::Args, Clone)]
struct ImageFlags {
    /// Source image
    image: PathBuf,

    /// Width in pixels (fixed, resize)
    #[arg(long)]
    width: Option<i64>,

    /// Height in pixels (fixed, resize)
    #[arg(long)]
    height: Option<i64>,

    /// Largest presentation width in pixels (fluid)
    #[arg(long)]
    max_width: Option<i64>,

    /// Largest presentation height in pixels (fluid)
    #[arg(long)]
    max_height: Option<i64>,

    /// Explicit srcset widths, comma separated (fluid)
    #[arg(long, value_delimiter = ',')]
    breakpoints: Option<Vec<f64>>,

    /// Output format: png, jpg, webp, tif, avif or gif (default: the source's)
    #[arg(long)]
    format: Option<String>,

    /// Lossy quality 1-100
    #[arg(long)]
    quality: Option<u32>,

    /// `sizes` attribute override (fluid)
    #[arg(long)]
    sizes: Option<String>,

    /// Render in grayscale
    #[arg(long)]
    grayscale: bool,

    /// Skip the base64 placeholder
    #[arg(long)]
    no_base64: bool,

    /// Add a traced SVG placeholder with default trace options
    #[arg(long)]
    trace: bool,

    /// Extra image options as inline TOML, applied over everything else,
    /// e.g. 'fit = "contain"' or 'duotone = { highlight = "#f00", shadow = "#003" }'
    #[arg(long = "override", value_name = "TOML")]
    overrides: Option<String>,

    /// Plan only; do not write any variant
    #[arg(long)]
    no_render: bool,

    /// Ignore cached placeholders and compute them again
    #[arg(long)]
    no_cache: bool,
}

impl ImageFlags {
    fn args(&self) -> ImageArgs {
        ImageArgs {
            width: self.width,
            height: self.height,
            max_width: self.max_width,
            max_height: self.max_height,
            src_set_breakpoints: self.breakpoints.clone(),
            to_format: self.format.clone(),
            quality: self.quality,
            sizes: self.sizes.clone(),
            grayscale: self.grayscale.then_some(true),
            base64: self.no_base64.then_some(false),
            traced_svg: self.trace.then(TraceOptions::default),
            ..ImageArgs::default()
        }
    }

    fn overrides(&self) -> Result<Option<ImageArgs>, toml::de::Error> {
        self.overrides.as_deref().map(toml::from_str).transpose()
    }
}

/// A directory below `--root`.
#[derive(clap::Args, Clone)]
struct DirFlags {
    /// Path relative to the root
    path: String,

    /// Identifier (defaults to the path)
    #[arg(long)]
    id: Option<String>,

    /// Root the path is resolved against
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

impl DirFlags {
    fn split(self) -> (ProviderContext, DirectoryDescriptor) {
        (
            ProviderContext::new(self.root),
            DirectoryDescriptor {
                path: self.path,
                id: self.id,
            },
        )
    }
}

#[derive(Parser)]
#[command(name = "simple-srcset")]
#[command(about = "Responsive image variants and directory resources for static sites")]
#[command(long_about = "\
Responsive image variants and directory resources for static sites

Plans the renditions a page needs for one source image, writes them under
{public_dir}/static/{contentDigest}/{argsDigest}/ and prints the srcset,
sizes and placeholders to embed.

  fluid   srcset by width: base, 1/4, 1/2, 1.5x, 2x (or --breakpoints)
  fixed   srcset by density: 1x, 1.5x, 2x of --width
  resize  one rendition

Option precedence: simple-srcset.toml [defaults] < flags < --override.

Run 'simple-srcset gen-config' to generate a documented simple-srcset.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Responsive variants selected by width
    Fluid(ImageFlags),
    /// Fixed-size variants at 1x, 1.5x and 2x
    Fixed(ImageFlags),
    /// A single resized rendition
    Resize(ImageFlags),
    /// Manage directories declaratively
    #[command(subcommand)]
    Dir(DirCommand),
    /// Print a stock simple-srcset.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum DirCommand {
    /// Create the directory (no-op if it exists)
    Create(DirFlags),
    /// Show the directory's state
    Read(DirFlags),
    /// Bring the directory in line with the descriptor
    Update(DirFlags),
    /// Remove the directory (must be empty)
    Destroy(DirFlags),
    /// Show what create/update would change
    Plan(DirFlags),
    /// Check a JSON descriptor, listing every problem
    Validate {
        /// Descriptor JSON, e.g. '{"path": "photos"}'
        descriptor: String,
    },
    /// Print the descriptor's JSON Schema
    Schema,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    report::init_logging(cli.verbose);

    match cli.command {
        Command::Fluid(flags) => {
            let (pipeline, cache) = build_pipeline(&cli.config, &flags)?;
            let overrides = flags.overrides()?;
            if let Some(rendered) = pipeline
                .fluid(&flags.image, &flags.args(), overrides.as_ref())
                .await?
            {
                rendered.finished().await?;
                emit(cli.json, &rendered.image, output::print_fluid_output)?;
            }
            finish(cache).await?;
        }
        Command::Fixed(flags) => {
            let (pipeline, cache) = build_pipeline(&cli.config, &flags)?;
            let overrides = flags.overrides()?;
            if let Some(rendered) = pipeline
                .fixed(&flags.image, &flags.args(), overrides.as_ref())
                .await?
            {
                rendered.finished().await?;
                emit(cli.json, &rendered.image, output::print_fixed_output)?;
            }
            finish(cache).await?;
        }
        Command::Resize(flags) => {
            let (pipeline, cache) = build_pipeline(&cli.config, &flags)?;
            let overrides = flags.overrides()?;
            if let Some(rendered) = pipeline
                .resize(&flags.image, &flags.args(), overrides.as_ref())
                .await?
            {
                rendered.finished().await?;
                emit(cli.json, &rendered.image, output::print_resize_output)?;
            }
            finish(cache).await?;
        }
        Command::Dir(command) => run_dir(command, cli.json).await?,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

async fn run_dir(command: DirCommand, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        DirCommand::Create(flags) => {
            let (ctx, descriptor) = flags.split();
            let resource = directory::create(&ctx, &descriptor).await?;
            emit(json, &resource, |r| {
                output::print_directory_state(&descriptor.path, Some(r))
            })?;
        }
        DirCommand::Update(flags) => {
            let (ctx, descriptor) = flags.split();
            let resource = directory::update(&ctx, &descriptor).await?;
            emit(json, &resource, |r| {
                output::print_directory_state(&descriptor.path, Some(r))
            })?;
        }
        DirCommand::Read(flags) => {
            let (ctx, descriptor) = flags.split();
            let state = directory::read(&ctx, &descriptor).await?;
            emit(json, &state, |s| {
                output::print_directory_state(&descriptor.path, s.as_ref())
            })?;
        }
        DirCommand::Destroy(flags) => {
            let (ctx, descriptor) = flags.split();
            directory::destroy(&ctx, &descriptor).await?;
            if !json {
                println!("Removed {}", descriptor.path);
            }
        }
        DirCommand::Plan(flags) => {
            let (ctx, descriptor) = flags.split();
            let plan = directory::plan(&ctx, &descriptor).await?;
            emit(json, &plan, output::print_directory_plan)?;
        }
        DirCommand::Validate { descriptor } => {
            let value: serde_json::Value = serde_json::from_str(&descriptor)?;
            let result = directory::validate(&value).map(|_| ());
            if json {
                let violations = match &result {
                    Err(directory::DirectoryError::Invalid(v)) => v.clone(),
                    Err(e) => vec![e.to_string()],
                    Ok(()) => Vec::new(),
                };
                println!("{}", serde_json::to_string_pretty(&violations)?);
            } else {
                output::print_validation(&result);
            }
            if result.is_err() {
                std::process::exit(1);
            }
        }
        DirCommand::Schema => {
            println!("{}", serde_json::to_string_pretty(&directory::schema())?);
        }
    }
    Ok(())
}

/// Load config and wire the pipeline to the real backend, a dispatcher and
/// the on-disk placeholder cache.
fn build_pipeline(
    config_path: &Path,
    flags: &ImageFlags,
) -> Result<(ImagePipeline, Arc<DiskCache>), Box<dyn std::error::Error>> {
    let config = config::load_config_file(config_path)?;
    init_thread_pool(&config.processing);

    let backend: Arc<dyn ImageBackend> = Arc::new(RustBackend::new());
    let dispatcher: Arc<dyn RenderDispatcher> = if flags.no_render {
        Arc::new(DryRunDispatcher)
    } else {
        Arc::new(LocalDispatcher::new(Arc::clone(&backend)))
    };
    let public_dir = PathBuf::from(&config.public_dir);
    let cache = Arc::new(if flags.no_cache {
        DiskCache::empty(&public_dir)
    } else {
        DiskCache::load(&public_dir)
    });

    let pipeline = ImagePipeline::new(config, backend, dispatcher)
        .with_cache(cache.clone())
        .with_reporter(Arc::new(report::TracingReporter));
    Ok((pipeline, cache))
}

/// Persist the placeholder cache and log how it did.
async fn finish(cache: Arc<DiskCache>) -> Result<(), Box<dyn std::error::Error>> {
    cache.save().await?;
    tracing::info!(path = %cache.path().display(), "placeholder cache: {}", cache.stats());
    Ok(())
}

/// Print `value` as JSON or through its human formatter.
fn emit<T: Serialize>(
    json: bool,
    value: &T,
    print: impl FnOnce(&T),
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print(value);
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

use clap::error::ErrorKind;
use clap::{ArgGroup, CommandFactory, Parser, Subcommand};
use pagecodec::imaging::{
    DimensionProber, EncodedImage, HeaderProber, ImageConverter, OutputFormat, ResizeConstraint,
    registry,
};
use pagecodec::{batch, config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pagecodec")]
#[command(about = "Image conversion and no-upscale resizing for page servers")]
#[command(long_about = "\
Image conversion and no-upscale resizing for page servers

Converts between raster formats and shrinks images to fit a bounding box,
a width or a height. Images that already fit are passed through untouched.
Alpha is flattened onto white when the target format cannot carry it.

Codec providers are fixed at startup. When two providers claim the same
media type, the one named under [registry.preferred] in config.toml wins.

Run 'pagecodec gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Path to config.toml (stock defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Exactly one resize constraint.
#[derive(clap::Args, Clone)]
#[command(group(ArgGroup::new("constraint").required(true).args(["max_edge", "width", "height"])))]
struct ConstraintArgs {
    /// Fit the longest edge within this many pixels
    #[arg(long)]
    max_edge: Option<u32>,
    /// Fit the width within this many pixels
    #[arg(long)]
    width: Option<u32>,
    /// Fit the height within this many pixels
    #[arg(long)]
    height: Option<u32>,
}

impl ConstraintArgs {
    fn constraint(&self) -> Option<ResizeConstraint> {
        self.width
            .map(ResizeConstraint::Width)
            .or(self.height.map(ResizeConstraint::Height))
            .or(self.max_edge.map(ResizeConstraint::BoundingBox))
    }
}

#[derive(Subcommand)]
enum Command {
    /// List readable and writable formats and the active providers
    Formats {
        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether one media type can be converted into another
    CanConvert { from: String, to: String },
    /// Convert an image into another format
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Target format (defaults to the output file extension)
        #[arg(long)]
        format: Option<OutputFormat>,
    },
    /// Shrink an image to a constraint, never upscaling
    Resize {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        constraint: ConstraintArgs,
        /// Target format (defaults to the output file extension)
        #[arg(long)]
        format: Option<OutputFormat>,
    },
    /// Print media type and dimensions read from the headers
    Probe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Generate bounding-box thumbnails for every image under a directory
    Thumbnails {
        source: PathBuf,
        output: PathBuf,
        /// Longest edge of the thumbnails
        #[arg(long, default_value_t = 400)]
        max_edge: u32,
        #[arg(long, default_value = "jpeg")]
        format: OutputFormat,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let engine_config = config::load_config(cli.config.as_deref())?;
    let codecs = registry::init_global(&engine_config.registry)?;
    let converter = ImageConverter::from_config(codecs, &engine_config);

    match cli.command {
        Command::Formats { json } => {
            if json {
                println!("{}", output::inventory_json(codecs)?);
            } else {
                output::print_inventory(codecs);
            }
        }
        Command::CanConvert { from, to } => {
            let possible = converter.can_convert(&from, &to);
            println!("{}", output::format_can_convert(&from, &to, possible));
        }
        Command::Convert {
            input,
            output: target,
            format,
        } => {
            let format = target_format(format, &target)?;
            let image = read_image(&input)?;
            let converted = converter.convert(&image, format)?;
            std::fs::write(&target, converted.bytes())?;
            println!(
                "{}",
                output::format_written(&target.display().to_string(), &converted, false)
            );
        }
        Command::Resize {
            input,
            output: target,
            constraint,
            format,
        } => {
            let Some(constraint) = constraint.constraint() else {
                Cli::command()
                    .error(
                        ErrorKind::MissingRequiredArgument,
                        "one of --max-edge, --width or --height is required",
                    )
                    .exit()
            };
            let format = target_format(format, &target)?;
            let image = read_image(&input)?;
            let outcome = converter.resize(image, format, constraint)?;
            let unchanged = outcome.is_unchanged();
            let written = outcome.into_image();
            std::fs::write(&target, written.bytes())?;
            println!(
                "{}",
                output::format_written(&target.display().to_string(), &written, unchanged)
            );
        }
        Command::Probe { files } => {
            let prober = HeaderProber::new();
            for file in files {
                let image = read_image(&file)?;
                let dims = prober.probe(image.bytes());
                for line in
                    output::format_probe(&file.display().to_string(), image.media_type(), dims)
                {
                    println!("{}", line);
                }
            }
        }
        Command::Thumbnails {
            source,
            output: out_dir,
            max_edge,
            format,
        } => {
            init_thread_pool(&engine_config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let summary =
                batch::generate_thumbnails(&converter, &source, &out_dir, format, max_edge, Some(tx));
            printer.join().ok();
            println!("{}", output::format_batch_summary(&summary?));
        }
        // Printed before config loading.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Send diagnostics to stderr. `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "pagecodec=debug"
    } else {
        "pagecodec=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
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

fn read_image(path: &Path) -> std::io::Result<EncodedImage> {
    Ok(EncodedImage::sniffed(std::fs::read(path)?))
}

fn target_format(
    explicit: Option<OutputFormat>,
    target: &Path,
) -> Result<OutputFormat, Box<dyn std::error::Error>> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    target
        .extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_codec_id)
        .ok_or_else(|| {
            format!(
                "cannot infer a format from {}, pass --format",
                target.display()
            )
            .into()
        })
}

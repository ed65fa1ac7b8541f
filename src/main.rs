use batch_resize::archive::ZipPackageWriter;
use batch_resize::config::{self, PolicyOverrides};
use batch_resize::imaging::{OutputFormat, Rotation, RustBackend};
use batch_resize::naming::sanitize_folder_name;
use batch_resize::session::Session;
use batch_resize::{ingest, output};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "batch-resize")]
#[command(about = "Resize a batch of images and package them into a zip")]
#[command(long_about = "\
Resize a batch of images and package them into a zip

Every image is sized against one shared policy: a target box, an aspect-ratio
lock, an output format and a quality. With the lock on, the width is honoured
and the height follows the source's proportions. With it off, every image is
stretched to the exact box.

Presets:  Instagram 1080×1080, Story 1080×1920, Facebook 820×312,
          YouTube 1280×720, HD 1280×720, Full HD 1920×1080, Custom
Ratios:   1:1 4:3 3:4 16:9 9:16 21:9 3:2 2:3

Accepted inputs: .jpg .jpeg .png .gif .webp (directories are walked).

Run 'batch-resize gen-config' to generate a documented resize.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./resize.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resize images and write them into a zip archive
    Resize(ResizeArgs),
    /// List size presets and aspect-ratio shortcuts
    Presets,
    /// Print a stock resize.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ResizeArgs {
    /// Image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Size preset (see `batch-resize presets`)
    #[arg(long)]
    preset: Option<String>,

    /// Aspect-ratio shortcut, e.g. 16:9 (turns the ratio lock on)
    #[arg(long)]
    aspect: Option<String>,

    /// Target width in pixels
    #[arg(long, allow_negative_numbers = true)]
    width: Option<i64>,

    /// Target height in pixels
    #[arg(long, allow_negative_numbers = true)]
    height: Option<i64>,

    /// Stretch to the exact box instead of keeping proportions
    #[arg(long)]
    free_ratio: bool,

    /// Encoder quality as a fraction between 0 and 1
    #[arg(long)]
    quality: Option<f32>,

    /// Output format: jpeg, png or webp
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Rotate every image clockwise: 0, 90, 180 or 270
    #[arg(long, value_parser = parse_rotation)]
    rotate: Option<Rotation>,

    /// Archive name (zip file and top-level folder)
    #[arg(long)]
    name: Option<String>,

    /// Directory the zip is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write a JSON report of every item
    #[arg(long)]
    report: Option<PathBuf>,
}

fn parse_rotation(s: &str) -> Result<Rotation, String> {
    let degrees: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a number of degrees"))?;
    Rotation::try_from(degrees)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Resize(args) => {
            let resize_config = match &cli.config {
                Some(path) => config::load_config(path, true)?,
                None => config::load_config(Path::new(config::CONFIG_FILE), false)?,
            };
            run_resize(&resize_config, args)?;
        }
        Command::Presets => output::print_presets(),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_resize(
    resize_config: &config::ResizeConfig,
    args: ResizeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let overrides = PolicyOverrides {
        preset: args.preset,
        aspect_ratio: args.aspect,
        width: args.width,
        height: args.height,
        free_ratio: args.free_ratio,
        quality: args.quality,
        format: args.format,
    };
    let controls = resize_config.sizing_controls(&overrides)?;
    output::print_settings(&controls);
    let session = Session::new(controls);

    init_thread_pool(&resize_config.processing);
    let backend = RustBackend::new();
    let report = ingest::load_sources(&backend, &args.inputs);
    output::print_rejections(&report.rejected);
    for source in report.accepted {
        let id = session.ingest(source);
        if let Some(rotation) = args.rotate {
            session.set_item_rotation(id, rotation)?;
        }
    }
    if session.snapshot().is_empty() {
        return Err("no images to process".into());
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_batch_event(&event) {
                println!("{}", line);
            }
        }
    });
    let summary = session.process_all(&backend, Some(&tx));
    drop(tx);
    printer.join().ok();
    let summary = summary?;

    let archive_name =
        sanitize_folder_name(args.name.as_deref().unwrap_or(&resize_config.archive.name));
    if session.completed_count() == 0 {
        warn!("no image was encoded, not writing an archive");
    } else {
        let bytes = session.build_archive(&archive_name, &ZipPackageWriter)?;
        std::fs::create_dir_all(&args.out_dir)?;
        let zip_path = args.out_dir.join(format!("{archive_name}.zip"));
        std::fs::write(&zip_path, &bytes)?;
        info!(path = %zip_path.display(), bytes = bytes.len(), "archive written");
        println!("==> Wrote {}", zip_path.display());
    }

    println!();
    output::print_report(&session.snapshot(), &session.stats());

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&session.snapshot())?;
        std::fs::write(report_path, json)?;
    }

    if summary.failed > 0 {
        return Err(format!("{} of {} images failed", summary.failed, summary.total).into());
    }
    Ok(())
}

/// Logs go to stderr; stdout carries the report.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

//! memfits binary
//!
//! Serves a JSON image manifest as `inMemFITS.fits` inside a passthrough
//! directory, and exercises the callback dispatcher from the command line.
//!
//! ## Usage
//!
//! ```bash
//! # Section sizes of the synthetic file
//! memfits info image.json
//!
//! # Directory listing as the mount shows it
//! memfits ls image.json /
//!
//! # Stream a path to stdout through open/read/release
//! memfits cat image.json /inMemFITS.fits > out.fits
//!
//! # Same, straight to a file
//! memfits --config mount.ron export image.json out.fits
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use memfits_kernel::{FitsDispatcher, MountConfig};
use memfits_server::{commands, manifest};

/// Synthetic FITS files over a passthrough directory.
#[derive(Parser, Debug)]
#[command(name = "memfits")]
#[command(about = "Serve an in-memory FITS image alongside a real directory")]
struct Args {
    /// RON mount configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backing directory for every non-synthetic path
    #[arg(long, global = true)]
    backing_root: Option<PathBuf>,

    /// Name the synthetic file is listed under
    #[arg(long, global = true)]
    name: Option<String>,

    /// Trace every filesystem callback
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print card count and section sizes
    Info {
        /// JSON image manifest
        manifest: PathBuf,
    },
    /// List a directory of the mount
    Ls {
        manifest: PathBuf,
        #[arg(default_value = "/")]
        path: String,
    },
    /// Copy a path of the mount to stdout
    Cat {
        manifest: PathBuf,
        /// Defaults to the synthetic file
        path: Option<String>,
        #[arg(long, default_value_t = commands::DEFAULT_CHUNK)]
        chunk: u32,
    },
    /// Write the synthetic file to disk
    Export {
        manifest: PathBuf,
        output: PathBuf,
        #[arg(long, default_value_t = commands::DEFAULT_CHUNK)]
        chunk: u32,
    },
}

impl Command {
    fn manifest(&self) -> &PathBuf {
        match self {
            Command::Info { manifest }
            | Command::Ls { manifest, .. }
            | Command::Cat { manifest, .. }
            | Command::Export { manifest, .. } => manifest,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// File settings first, then command-line overrides.
fn mount_config(args: &Args) -> Result<MountConfig> {
    let mut config = match &args.config {
        Some(path) => MountConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MountConfig::default(),
    };
    if let Some(root) = &args.backing_root {
        config.backing_root = root.clone();
    }
    if let Some(name) = &args.name {
        config.synthetic_name = name.clone();
    }
    config.debug_trace |= args.debug;
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let context = mount_config(&args)?.into_context()?;
    let image = manifest::load(args.command.manifest())
        .with_context(|| format!("loading manifest {}", args.command.manifest().display()))?;

    tracing::info!(
        backing_root = %context.backing_root().display(),
        name = context.synthetic_name(),
        size = image.projected_size().unwrap_or(0),
        "mount ready"
    );
    let fs = FitsDispatcher::new(context, image);

    match args.command {
        Command::Info { .. } => print!("{}", commands::info(&fs)?),
        Command::Ls { path, .. } => print!("{}", commands::ls(&fs, &path).await?),
        Command::Cat { path, chunk, .. } => {
            let path = path.unwrap_or_else(|| format!("/{}", fs.context().synthetic_name()));
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            commands::cat(&fs, &path, chunk, &mut out).await?;
        }
        Command::Export { output, chunk, .. } => {
            let written = commands::export(&fs, &output, chunk).await?;
            println!("{written} bytes -> {}", output.display());
        }
    }
    Ok(())
}

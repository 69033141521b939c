use clap::{Parser, Subcommand};
use imgnorm::config::{self, AppConfig, CONFIG_FILE_NAME};
use imgnorm::imaging::Quality;
use imgnorm::normalize::{Normalizer, NormalizerConfig};
use imgnorm::output;
use imgnorm::upload::LocalFileUpload;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Settings that override `imgnorm.toml`.
#[derive(clap::Args, Clone)]
struct OverrideArgs {
    /// WebP quality, 0-100
    #[arg(long, global = true)]
    quality: Option<u32>,

    /// Upper bound on the longer edge, in pixels
    #[arg(long, global = true)]
    max_dimension: Option<u32>,

    /// Do not copy sources into originals/ before normalizing
    #[arg(long, global = true)]
    no_backup: bool,
}

#[derive(Parser)]
#[command(name = "imgnorm")]
#[command(about = "Normalize images into size-bounded, opaque WebP derivatives")]
#[command(long_about = "\
Normalize images into size-bounded, opaque WebP derivatives

Every image is decoded, rotated according to its EXIF orientation,
flattened onto white, shrunk so its longer edge fits --max-dimension,
and written as lossy WebP next to the source (or to --output).

Before the first normalization, the raw source is copied to a sibling
originals/ directory. Existing backups are never overwritten.

Run 'imgnorm gen-config' to generate a documented imgnorm.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./imgnorm.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize a single image
    File {
        source: PathBuf,
        /// Output path (defaults to the source with a .webp extension)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Normalize every matching image under a directory
    Dir {
        root: PathBuf,
        /// Extension to include; repeat for several (defaults to config)
        #[arg(long = "ext")]
        extensions: Vec<String>,
        /// Print the batch report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Stage a file as an upload into a folder and normalize it there
    Upload {
        file: PathBuf,
        folder: PathBuf,
        /// Save under this fixed stem instead of a timestamped name
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a stock imgnorm.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let app_config = load_app_config(cli.config.as_deref())?;
    let normalizer = Normalizer::new(apply_overrides(
        app_config.normalizer_config(),
        &cli.overrides,
    ));

    match cli.command {
        Command::GenConfig => {}
        Command::File {
            source,
            output: destination,
        } => {
            let outcome = normalizer.normalize(&source, destination.as_deref());
            output::print_normalize_outcome(&source, &outcome);
            if !outcome.ok {
                std::process::exit(1);
            }
        }
        Command::Dir {
            root,
            extensions,
            json,
        } => {
            let extensions = if extensions.is_empty() {
                app_config.batch.extensions.clone()
            } else {
                extensions
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            // With --json, dropping the sender ends the printer right away.
            let events = (!json).then_some(tx);
            let report =
                normalizer.normalize_directory(&root, Some(extensions.as_slice()), events);
            if printer.join().is_err() {
                tracing::warn!("progress printer panicked");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_batch_report(&report);
            }
            if report.failed > 0 {
                std::process::exit(1);
            }
        }
        Command::Upload { file, folder, name } => {
            let upload = LocalFileUpload::new(file);
            let outcome = match name {
                Some(stem) => normalizer.normalize_upload_as(&upload, &folder, &stem),
                None => normalizer.normalize_upload(&upload, &folder),
            };
            output::print_upload_outcome(&outcome);
            if !outcome.ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Log to stderr so stdout carries only command output (and `--json`).
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("imgnorm=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// An explicit `--config` must exist; the implicit `./imgnorm.toml` is optional.
fn load_app_config(explicit: Option<&Path>) -> Result<AppConfig, config::ConfigError> {
    match explicit {
        Some(path) if !path.exists() => Err(config::ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("config file not found: {}", path.display()),
        ))),
        Some(path) => config::load_config(path),
        None => config::load_config(Path::new(CONFIG_FILE_NAME)),
    }
}

fn apply_overrides(mut config: NormalizerConfig, overrides: &OverrideArgs) -> NormalizerConfig {
    if let Some(q) = overrides.quality {
        config.quality = Quality::new(q);
    }
    if let Some(max) = overrides.max_dimension {
        config.max_dimension = max.max(1);
    }
    if overrides.no_backup {
        config.backup_enabled = false;
    }
    config
}

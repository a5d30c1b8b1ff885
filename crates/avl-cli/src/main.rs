mod config;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::info;

use avl_catalog::{
    CatalogError, enumerate, load_catalogue, render_markdown, save_catalogue,
};
use avl_core::write_bytes_atomic;
use avl_sample::{SampleError, write_samples};
use avl_verify::{IssueSeverity, Report, VerifyError, verify_location};
use avl_zarr::{Location, S3Store, Store, WriteOptions, ZarrError};
use config::{AvlConfig, ConfigError, load_config};

const DEFAULT_CATALOGUE_FILE: &str = "catalogue.json";

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging error: {0}")]
    Logging(std::io::Error),
    #[error(transparent)]
    Core(#[from] avl_core::Error),
    #[error(transparent)]
    Zarr(#[from] ZarrError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "avl", version, about = "Command-line tool for the ESA AVL project")]
struct Cli {
    /// Configuration file; `avl.toml` is used when present.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Append JSON log lines to this file.
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify that a dataset conforms to the AVL convention.
    #[command(visible_alias = "ver")]
    Verify(VerifyArgs),
    /// Write the AVL sample datasets.
    New(NewArgs),
    /// Render a catalogue of the datasets in a bucket.
    Cat(CatArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Level {
    Error,
    Warning,
}

impl From<Level> for IssueSeverity {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => IssueSeverity::Error,
            Level::Warning => IssueSeverity::Warning,
        }
    }
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Local path or s3:// URL of a Zarr dataset.
    #[arg(value_name = "DATASET")]
    dataset: String,
    /// Lowest severity to report.
    #[arg(long, value_enum, ignore_case = true, default_value_t = Level::Error)]
    level: Level,
}

#[derive(Args, Debug)]
struct NewArgs {
    /// Directory receiving the datasets.
    #[arg(long, value_name = "DIR", default_value = ".")]
    output: PathBuf,
    /// Write scaled-down grids.
    #[arg(long, default_value_t = false)]
    small: bool,
    /// Write `*.zarr` directories instead of `*.zarr.zip` archives.
    #[arg(long, default_value_t = false)]
    directory: bool,
}

#[derive(Args, Debug)]
struct CatArgs {
    /// JSON cache; read when it exists unless --json is given.
    #[arg(long, value_name = "JSON_FILE")]
    file: Option<PathBuf>,
    /// Enumerate the bucket and write the JSON cache.
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Write the Markdown listing here instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Bucket to enumerate; overrides the config file.
    #[arg(long)]
    bucket: Option<String>,
    /// Key prefix to start from; overrides the config file.
    #[arg(long)]
    prefix: Option<String>,
    /// Listing depth; overrides the config file.
    #[arg(long)]
    max_depth: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    start_logging(cli.log_file.as_deref())?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Verify(args) => run_verify(args, &config).await,
        Command::New(args) => run_new(args),
        Command::Cat(args) => run_cat(args, &config).await,
    }
}

fn start_logging(log_file: Option<&Path>) -> Result<(), CliError> {
    logging::init_logging(log_file).map_err(CliError::Logging)
}

async fn run_verify(args: VerifyArgs, config: &AvlConfig) -> Result<ExitCode, CliError> {
    let location = Location::parse(&args.dataset)?;
    let issues = verify_location(
        &location,
        args.level.into(),
        &config.catalogue.s3_options(),
    )
    .await?;

    let report = Report::new(issues);
    println!("{}", report.render_text());
    if report.is_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("error: dataset is not compliant");
        Ok(ExitCode::FAILURE)
    }
}

fn run_new(args: NewArgs) -> Result<ExitCode, CliError> {
    let summaries = write_samples(
        &args.output,
        args.small,
        !args.directory,
        &WriteOptions::default(),
    )?;
    for summary in summaries {
        println!(
            "Wrote {} ({} arrays, {} chunks)",
            summary.path.display(),
            summary.arrays,
            summary.chunks
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_cat(args: CatArgs, config: &AvlConfig) -> Result<ExitCode, CliError> {
    let cached = args.file.as_ref().filter(|path| !args.json && path.exists());
    let catalogue = match cached {
        Some(path) => load_catalogue(path)?,
        None => {
            let settings = &config.catalogue;
            let bucket = args
                .bucket
                .or_else(|| settings.bucket.clone())
                .ok_or_else(|| {
                    CliError::InvalidConfig(
                        "no bucket given; use --bucket or set [catalogue] bucket in avl.toml"
                            .to_string(),
                    )
                })?;
            let prefix = args.prefix.unwrap_or_else(|| settings.prefix.clone());
            let store: Arc<dyn Store> =
                Arc::new(S3Store::connect(bucket, prefix, &settings.s3_options()).await);
            let catalogue =
                enumerate(store, args.max_depth.unwrap_or(settings.max_depth)).await?;

            if args.json {
                let path = args
                    .file
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOGUE_FILE));
                save_catalogue(&path, &catalogue)?;
            }
            catalogue
        }
    };

    let markdown = render_markdown(&catalogue);
    match &args.output {
        Some(path) => {
            write_bytes_atomic(path, markdown.as_bytes())?;
            info!(event = "catalogue_rendered", path = %path.display());
        }
        None => println!("{markdown}"),
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_file_is_a_logging_error() {
        let dir = std::env::temp_dir().join(format!("avl_cli_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let err = start_logging(Some(dir.as_path())).unwrap_err();
        assert!(matches!(err, CliError::Logging(_)));
        assert!(err.to_string().starts_with("logging error:"));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn io_errors_elsewhere_keep_their_own_label() {
        let missing = std::env::temp_dir().join(format!("avl_cli_{}.toml", uuid::Uuid::new_v4()));
        let err = CliError::from(load_config(Some(missing.as_path())).unwrap_err());
        assert!(err.to_string().starts_with("config error:"));
    }

    #[test]
    fn cli_parses_verify_level_case_insensitively() {
        let cli = Cli::try_parse_from(["avl", "ver", "data.zarr", "--level", "warning"]).unwrap();
        let Command::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert_eq!(args.level, Level::Warning);
        assert_eq!(IssueSeverity::from(args.level), IssueSeverity::Warning);
    }

    #[test]
    fn new_writes_zip_archives_unless_directories_are_requested() {
        let cli = Cli::try_parse_from(["avl", "new", "--small"]).unwrap();
        let Command::New(args) = cli.command else {
            panic!("expected new");
        };
        assert!(args.small && !args.directory);

        let cli = Cli::try_parse_from(["avl", "new", "--directory"]).unwrap();
        let Command::New(args) = cli.command else {
            panic!("expected new");
        };
        assert!(args.directory);
    }
}

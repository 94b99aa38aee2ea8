use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use trailer::client::TestRailClient;
use trailer::config::{Config, ConfigError};
use trailer::constants::{EXIT_SUCCESS, TRAILER_LOG_ENV};
use trailer::download::{run_download, DownloadOptions, DownloadOutcome};
use trailer::upload::{run_upload, UploadOptions, UploadOutcome};

#[derive(Debug, Parser)]
#[command(
    version = std::env!("CARGO_PKG_VERSION"),
    name = "trailer",
    about = "TestRail command line utility"
)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    #[arg(short, long, global = true, help = "Turn on debug logs.")]
    verbose: bool,
}

#[derive(Args, Clone, Debug)]
struct UploadArgs {
    #[arg(short, long, help = "TestRail run ID to target for the update.")]
    run_id: u64,
    #[arg(
        short,
        long,
        default_value = "",
        help = "Prefix to use when commenting on TestRail updates."
    )]
    comment: String,
    #[arg(
        short = 'i',
        long = "ignore-failures",
        default_value_t = 1,
        help = "Number of upload attempts, dropping cases TestRail does not know between attempts."
    )]
    attempts: usize,
    #[arg(
        short,
        long,
        help = "Print readable results without updating the TestRail run."
    )]
    dry: bool,
    #[arg(required = true, help = "Input JUnit XML files.")]
    files: Vec<PathBuf>,
}

#[derive(Args, Clone, Debug)]
struct DownloadArgs {
    #[arg(short, long, help = "TestRail project ID to download cases from.")]
    project_id: u64,
    #[arg(short, long, help = "TestRail suite ID to download cases from.")]
    suite_id: u64,
    #[arg(short, long, help = "File to write downloaded cases to.")]
    file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload JUnit XML reports to TestRail
    #[command(visible_alias = "u")]
    Upload(UploadArgs),
    /// Download case titles from TestRail
    #[command(visible_alias = "d")]
    Download(DownloadArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logger(cli.verbose)?;
    match run(cli).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            log::error!("Error: {:?}", e);
            std::process::exit(exit_code_for(&e));
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = Config::from_env()?;
    let client = TestRailClient::new(&config)?;
    log::debug!("Using TestRail at {}", config.api_address);

    match cli.command {
        Commands::Upload(upload_args) => run_upload_command(&client, upload_args).await,
        Commands::Download(download_args) => run_download_command(&client, download_args).await,
    }
}

async fn run_upload_command(client: &TestRailClient, upload_args: UploadArgs) -> anyhow::Result<i32> {
    let UploadArgs {
        run_id,
        comment,
        attempts,
        dry,
        files,
    } = upload_args;
    let options = UploadOptions {
        run_id,
        comment,
        max_attempts: attempts,
        dry_run: dry,
        files,
    };

    match run_upload(client, &options).await? {
        UploadOutcome::Succeeded { attempts, results } => {
            for result in &results {
                println!("{:?}", result);
            }
            log::info!(
                "Uploaded {} result(s) to run {} after {} attempt(s)",
                results.len(),
                run_id,
                attempts
            );
        }
        UploadOutcome::Exhausted { attempts } => {
            log::warn!(
                "Gave up after {} attempt(s) without TestRail accepting any results",
                attempts
            );
        }
        UploadOutcome::NothingToUpload => log::info!("Nothing to upload"),
        UploadOutcome::DryRun(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            log::info!("{} result(s) would be uploaded to run {}", payload.len(), run_id);
        }
    }
    Ok(EXIT_SUCCESS)
}

async fn run_download_command(
    client: &TestRailClient,
    download_args: DownloadArgs,
) -> anyhow::Result<i32> {
    let DownloadArgs {
        project_id,
        suite_id,
        file,
    } = download_args;
    let options = DownloadOptions {
        project_id,
        suite_id,
        file,
    };

    match run_download(client, &options).await? {
        DownloadOutcome::Unchanged => log::info!("No case changes to download"),
        DownloadOutcome::Written { path, updated } => {
            log::info!("Updated {} case(s) in {}", updated, path.display())
        }
        DownloadOutcome::Printed { yaml, updated } => {
            print!("{}", yaml);
            log::info!("Downloaded {} updated case(s)", updated);
        }
    }
    Ok(EXIT_SUCCESS)
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<ConfigError>() {
        Some(ConfigError::MissingCredentials(..)) => exitcode::CONFIG,
        Some(_) => exitcode::USAGE,
        None => exitcode::SOFTWARE,
    }
}

fn setup_logger(verbose: bool) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(
            None,
            if verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            },
        );
    if let Ok(log) = std::env::var(TRAILER_LOG_ENV) {
        builder.parse_filters(&log);
    }
    builder.init();
    Ok(())
}

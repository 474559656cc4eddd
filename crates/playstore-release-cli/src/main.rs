use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use commands::{config, release};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "playstore-release")]
#[command(about = "Promote the draft release of a Google Play internal testing track")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Config file (defaults to the per-user config directory)
    #[arg(long, global = true, env = "PLAYSTORE_RELEASE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write logs to this file (rotated daily)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Account, target and browser settings shared by `release` and `login`
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Google account email
    #[arg(long, global = true, env = "GOOGLE_EMAIL")]
    pub email: Option<String>,

    /// Google account password
    #[arg(long, global = true, env = "GOOGLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Play Console developer account id
    #[arg(long, global = true, env = "PLAY_CONSOLE_DEVELOPER_ID")]
    pub developer_id: Option<String>,

    /// Play Console app id
    #[arg(long, global = true, env = "PLAY_CONSOLE_APP_ID")]
    pub app_id: Option<String>,

    /// Run the browser without a window
    #[arg(
        long,
        global = true,
        env = "HEADLESS",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub headless: Option<bool>,

    /// Seconds each locator may take to become clickable
    #[arg(long, global = true, env = "WAIT_TIME", value_name = "SECONDS")]
    pub wait_time: Option<u64>,

    /// Save screenshots, page sources and a run summary
    #[arg(
        long,
        global = true,
        env = "DEBUG",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub debug: Option<bool>,

    /// Where diagnostics are written
    #[arg(long, global = true, env = "BROWSER_DEBUG_DIR", value_name = "DIR")]
    pub debug_dir: Option<PathBuf>,

    /// Browser automation backend
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// chromedriver endpoint for the webdriver backend
    #[arg(long, global = true, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Chromium,
    Webdriver,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and promote the draft release (default)
    #[command(long_about = "Sign in to Google, open the internal testing track of the app and promote its draft release: edit draft, next, save and release, confirm.")]
    Release,
    /// Only sign in to Google, to check credentials and selectors
    Login,
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (masks credentials)
    Show,
    /// Write a configuration file with all defaults
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Save the Google account to the credentials file (prompts for missing values)
    Credentials,
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging_with_file(cli.verbose, cli.quiet, cli.log_file.clone())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl-C, shutting down");
            trigger.cancel();
        }
    });

    match cli.command.unwrap_or(Commands::Release) {
        Commands::Release => release::run_release(&cli.run, cli.config.as_deref(), &output, cancel, false).await,
        Commands::Login => release::run_release(&cli.run, cli.config.as_deref(), &output, cancel, true).await,
        Commands::Config { cmd } => {
            config::run_config(cmd, &cli.run, cli.config.as_deref(), &output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

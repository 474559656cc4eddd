use super::prompts;
use crate::output::Output;
use crate::RunArgs;
use browser_debug::DiagnosticCapture;
use color_eyre::Result;
use futures::FutureExt;
use release_automation::{
    run_scoped, AutomationError, BrowserSession, ChromiumSession, PageDriver, ReleaseOutcome, ReleaseWorkflow,
    WebDriverSession,
};
use release_config::{Backend, Config, CredentialStore, Credentials, PathManager, ReleaseTarget};
use serde_json::json;
use std::future::Future;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

/// What one browser session is used for
struct Job {
    workflow: ReleaseWorkflow,
    credentials: Credentials,
    /// `None` for a sign-in check
    target: Option<ReleaseTarget>,
}

impl Job {
    async fn run<P>(&self, page: &P) -> ReleaseOutcome
    where
        P: PageDriver + ?Sized,
    {
        match &self.target {
            Some(target) => self.workflow.run(page, &self.credentials, target).await,
            None => self.workflow.login(page, &self.credentials).await,
        }
    }
}

pub async fn run_release(
    args: &RunArgs,
    config_path: Option<&Path>,
    output: &Output,
    cancel: CancellationToken,
    login_only: bool,
) -> Result<ExitCode> {
    let config_file = super::config_path(config_path)?;
    let config = match super::load_effective_config(&config_file, args) {
        Ok(config) => config,
        Err(e) => {
            output.error(format!("{}", e));
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    };

    let credentials = match resolve_credentials(args, output) {
        Ok(credentials) => credentials,
        Err(e) => {
            output.error(format!("{}", e));
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    };

    let target = if login_only {
        None
    } else {
        match config.release_target() {
            Ok(target) => Some(target),
            Err(e) => {
                output.error(e.to_string());
                return Ok(ExitCode::from(EXIT_FAILURE));
            }
        }
    };

    print_banner(output, &config, &credentials, target.as_ref());

    let capture = DiagnosticCapture::new(config.browser_debug.clone())
        .map_err(|e| color_eyre::eyre::eyre!("{:#}", e))?;
    let job = Job {
        workflow: ReleaseWorkflow::new(&config, capture),
        credentials,
        target,
    };

    let poll_interval = config.settings().poll_interval;
    let result = match config.browser.backend {
        Backend::Chromium => {
            output.info("Launching Chromium...");
            let session = until_cancelled(ChromiumSession::launch(&config.browser, poll_interval), &cancel).await;
            drive(session, job, cancel).await
        }
        Backend::WebDriver => {
            output.info(format!("Connecting to WebDriver at {}...", config.browser.webdriver_url));
            let session = until_cancelled(WebDriverSession::connect(&config.browser, poll_interval), &cancel).await;
            drive(session, job, cancel).await
        }
    };

    let code = match result {
        Ok(outcome) => report(output, &outcome, login_only),
        Err(e) if e.is_interrupt() => {
            output.error("Interrupted by user");
            EXIT_INTERRUPTED
        }
        Err(e) => {
            output.error(e.to_string());
            EXIT_FAILURE
        }
    };
    Ok(ExitCode::from(code))
}

/// Password falls back to an interactive prompt when nothing else supplies it
fn resolve_credentials(args: &RunArgs, output: &Output) -> Result<Credentials> {
    let paths = PathManager::new().map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    let mut store = CredentialStore::new(paths.credentials_file());
    store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials: {}", e))?;

    let password = match args.password.clone().or_else(|| store.google_password().cloned()) {
        Some(password) => Some(password),
        None if output.is_human() && std::io::stdin().is_terminal() => {
            Some(prompts::prompt_password("Google password")?)
        }
        None => None,
    };

    Ok(Credentials::resolve(args.email.as_deref(), password.as_deref(), &store)?)
}

async fn until_cancelled<T, F>(connect: F, cancel: &CancellationToken) -> Result<T, AutomationError>
where
    F: Future<Output = Result<T, AutomationError>>,
{
    tokio::select! {
        result = connect => result,
        _ = cancel.cancelled() => Err(AutomationError::Interrupted),
    }
}

async fn drive<S>(
    session: Result<S, AutomationError>,
    job: Job,
    cancel: CancellationToken,
) -> Result<ReleaseOutcome, AutomationError>
where
    S: BrowserSession,
{
    let session = session?;
    debug!("Browser session ready");
    run_scoped(session, cancel, move |page| async move { Ok(job.run(page).await) }.boxed()).await
}

fn print_banner(output: &Output, config: &Config, credentials: &Credentials, target: Option<&ReleaseTarget>) {
    let title = match target {
        Some(_) => "Google Play Console release",
        None => "Google sign-in check",
    };
    output.heading(title);
    output.info(format!("Account:      {}", credentials.masked_email()));
    output.info("Password:     ********");
    if let Some(target) = target {
        output.info(format!("Developer ID: {}", target.developer_id));
        output.info(format!("App ID:       {}", target.app_id));
    }
    let backend = match config.browser.backend {
        Backend::Chromium => "chromium",
        Backend::WebDriver => "webdriver",
    };
    let mode = if config.browser.headless { "headless" } else { "windowed" };
    output.info(format!("Browser:      {} ({})", backend, mode));
    output.info(format!("Wait time:    {}s", config.timeouts.wait_time_secs));
    if config.browser_debug.enabled {
        output.info(format!("Diagnostics:  {}", config.browser_debug.output_dir.display()));
    }
    info!(
        backend,
        headless = config.browser.headless,
        wait_time_secs = config.timeouts.wait_time_secs,
        "Starting {}",
        title
    );
}

fn report(output: &Output, outcome: &ReleaseOutcome, login_only: bool) -> u8 {
    if output.is_human() {
        output.steps(outcome.recorder.steps());
        match &outcome.result {
            Ok(()) if login_only => output.success("Signed in to Google"),
            Ok(()) => output.success("Draft release promoted"),
            Err(e) => output.error(e.to_string()),
        }
        if let Some(path) = &outcome.summary_path {
            output.info(format!("Run summary: {}", path.display()));
        }
    } else {
        let mut summary = outcome.recorder.summary();
        summary["success"] = json!(outcome.succeeded());
        if let Err(e) = &outcome.result {
            summary["error"] = json!(e.to_string());
        }
        if let Some(path) = &outcome.summary_path {
            summary["summary_path"] = json!(path.display().to_string());
        }
        output.json(&summary);
    }
    exit_status(&outcome.result)
}

fn exit_status(result: &Result<(), AutomationError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) if e.is_interrupt() => EXIT_INTERRUPTED,
        Err(_) => EXIT_FAILURE,
    }
}

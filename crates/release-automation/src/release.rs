use browser_debug::{CaptureKind, DiagnosticCapture, StepRecorder};
use release_config::{AutomationSettings, Config, ConsoleConfig, ConsoleSelectors, Credentials, ReleaseTarget};
use std::path::PathBuf;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::auth::LoginFlow;
use crate::driver::PageDriver;
use crate::error::AutomationError;
use crate::interactor::{ActionLabel, ResilientInteractor};
use crate::locator::LocatorSpec;

const NO_DRAFT_HINT: &str = "no draft release may exist on the internal testing track";

/// Result of a release run: the per-stage record is kept even when a stage fails
pub struct ReleaseOutcome {
    pub recorder: StepRecorder,
    pub result: Result<(), AutomationError>,
    /// `summary.json`, written when diagnostics are enabled
    pub summary_path: Option<PathBuf>,
}

impl ReleaseOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Signs in and promotes the draft release of the internal testing track
pub struct ReleaseWorkflow {
    interactor: ResilientInteractor,
    console: ConsoleConfig,
    selectors: ConsoleSelectors,
    settings: AutomationSettings,
}

impl ReleaseWorkflow {
    pub fn new(config: &Config, capture: DiagnosticCapture) -> Self {
        let settings = config.settings();
        Self {
            interactor: ResilientInteractor::new(&settings, capture),
            console: config.console.clone(),
            selectors: config.selectors.clone(),
            settings,
        }
    }

    pub fn login_flow(&self) -> LoginFlow<'_> {
        LoginFlow::new(&self.interactor, &self.console, &self.selectors, &self.settings)
    }

    /// Sign in only
    pub async fn login<P>(&self, page: &P, credentials: &Credentials) -> ReleaseOutcome
    where
        P: PageDriver + ?Sized,
    {
        let mut recorder = StepRecorder::new("login");
        recorder.start_step("google login");
        let result = self.login_flow().login(page, credentials).await;
        record(&mut recorder, &result);
        self.finish(recorder, result)
    }

    /// Sign in, then run the five release stages in order, stopping at the
    /// first failure
    pub async fn run<P>(&self, page: &P, credentials: &Credentials, target: &ReleaseTarget) -> ReleaseOutcome
    where
        P: PageDriver + ?Sized,
    {
        let mut recorder = StepRecorder::new("release");
        let result = self.run_stages(page, credentials, target, &mut recorder).await;
        match &result {
            Ok(()) => info!("Draft release promoted for app {}", target.app_id),
            Err(e) => error!("Release failed: {}", e),
        }
        self.finish(recorder, result)
    }

    async fn run_stages<P>(
        &self,
        page: &P,
        credentials: &Credentials,
        target: &ReleaseTarget,
        recorder: &mut StepRecorder,
    ) -> Result<(), AutomationError>
    where
        P: PageDriver + ?Sized,
    {
        recorder.start_step("google login");
        let result = self.login_flow().login(page, credentials).await;
        record(recorder, &result);
        result?;

        recorder.start_step("open internal testing track");
        let result = self.open_release_page(page, target).await;
        record(recorder, &result);
        result?;

        let stages: [(&str, &[String], Option<&str>, &str); 3] = [
            ("edit draft", &self.selectors.edit_draft, Some(NO_DRAFT_HINT), "11_prepare_page"),
            ("next", &self.selectors.next, None, "12_review_page"),
            ("save and release", &self.selectors.save_and_release, None, "13_popup_appeared"),
        ];
        for (name, selectors, hint, checkpoint) in stages {
            recorder.start_step(name);
            let result = self.click_stage(page, name, selectors, hint, checkpoint).await;
            record(recorder, &result);
            result?;
        }

        recorder.start_step("confirm release");
        let result = self.confirm_release(page).await;
        record(recorder, &result);
        result
    }

    async fn open_release_page<P>(&self, page: &P, target: &ReleaseTarget) -> Result<(), AutomationError>
    where
        P: PageDriver + ?Sized,
    {
        let url = self.console.release_url(target);
        info!("Opening {}", url);
        page.navigate(&url)
            .await
            .map_err(|source| AutomationError::Navigation { url, source })?;

        self.interactor
            .waiter()
            .await_stable(page, self.interactor.page_load_timeout())
            .await;
        sleep(self.settings.step_delay).await;
        self.interactor
            .capture()
            .capture(page, CaptureKind::Step, "10_internal_testing_page")
            .await;
        Ok(())
    }

    async fn click_stage<P>(
        &self,
        page: &P,
        name: &str,
        selectors: &[String],
        hint: Option<&str>,
        checkpoint: &str,
    ) -> Result<(), AutomationError>
    where
        P: PageDriver + ?Sized,
    {
        let label = ActionLabel::new(name);
        self.interactor
            .click(&LocatorSpec::new(selectors)?, page, &label)
            .await
            .require(&label, hint)?;

        sleep(self.settings.step_delay).await;
        self.interactor.capture().capture(page, CaptureKind::Step, checkpoint).await;
        Ok(())
    }

    async fn confirm_release<P>(&self, page: &P) -> Result<(), AutomationError>
    where
        P: PageDriver + ?Sized,
    {
        // The header only confirms we are looking at the right dialog; its
        // absence is not fatal, the yes-button lookup decides
        let header = LocatorSpec::new(&self.selectors.publish_dialog_header)?;
        let mut dialog_seen = false;
        for locator in header.locators() {
            if page
                .wait_for_present(locator, self.interactor.per_locator_timeout())
                .await
                .is_ok()
            {
                dialog_seen = true;
                break;
            }
        }
        if dialog_seen {
            info!("Publish confirmation dialog detected");
        } else {
            warn!("Publish confirmation dialog header not found, trying the confirm button anyway");
        }

        let label = ActionLabel::new("confirm release");
        self.interactor
            .click(&LocatorSpec::new(&self.selectors.confirm_release)?, page, &label)
            .await
            .require(&label, None)?;

        sleep(self.settings.step_delay).await;
        self.interactor
            .waiter()
            .await_stable(page, self.interactor.page_load_timeout())
            .await;
        self.interactor
            .capture()
            .capture(page, CaptureKind::Step, "14_release_complete")
            .await;
        Ok(())
    }

    fn finish(&self, recorder: StepRecorder, result: Result<(), AutomationError>) -> ReleaseOutcome {
        let capture = self.interactor.capture();
        let summary_path = if capture.is_enabled() {
            match recorder.write_summary(capture.config().output_dir()) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("{:#}", e);
                    None
                }
            }
        } else {
            None
        };

        ReleaseOutcome {
            recorder,
            result,
            summary_path,
        }
    }
}

fn record(recorder: &mut StepRecorder, result: &Result<(), AutomationError>) {
    match result {
        Ok(()) => recorder.end_step(true, None),
        Err(e) => recorder.end_step(false, Some(e.to_string())),
    }
}

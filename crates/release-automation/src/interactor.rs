use browser_debug::{CaptureKind, DiagnosticArtifact, DiagnosticCapture};
use release_config::AutomationSettings;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::driver::PageDriver;
use crate::error::{AutomationError, DriverError};
use crate::locator::{Locator, LocatorSpec};
use crate::stability::PageStabilityWaiter;

/// Human-readable name of a UI action, used in logs and diagnostic file names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLabel(String);

impl ActionLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl fmt::Display for ActionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a single locator did not produce an interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorMiss {
    /// Nothing matched within the per-locator budget
    Timeout,
    /// Matched, but never visible, enabled and uncovered
    NotActionable(String),
    /// Native click and the scripted fallback both failed
    ClickFailed(String),
    Driver(String),
}

impl fmt::Display for LocatorMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorMiss::Timeout => f.write_str("timed out"),
            LocatorMiss::NotActionable(reason) => write!(f, "not actionable ({})", reason),
            LocatorMiss::ClickFailed(reason) => write!(f, "click failed ({})", reason),
            LocatorMiss::Driver(reason) => write!(f, "driver error ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorAttempt {
    pub index: usize,
    pub locator: Locator,
    pub miss: LocatorMiss,
}

impl fmt::Display for LocatorAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.index, self.locator, self.miss)
    }
}

/// Outcome of one interactor call
#[derive(Debug, Clone)]
pub struct InteractionResult {
    pub succeeded: bool,
    pub matched_locator_index: Option<usize>,
    pub diagnostic: Option<DiagnosticArtifact>,
    /// Locators tried before the match (or all of them on failure)
    pub attempts: Vec<LocatorAttempt>,
}

impl InteractionResult {
    fn matched(index: usize, attempts: Vec<LocatorAttempt>) -> Self {
        Self {
            succeeded: true,
            matched_locator_index: Some(index),
            diagnostic: None,
            attempts,
        }
    }

    fn exhausted(diagnostic: Option<DiagnosticArtifact>, attempts: Vec<LocatorAttempt>) -> Self {
        Self {
            succeeded: false,
            matched_locator_index: None,
            diagnostic,
            attempts,
        }
    }

    /// Turn a failed interaction into [`AutomationError::LocatorsExhausted`],
    /// optionally explaining what the failure usually means
    pub fn require(self, label: &ActionLabel, hint: Option<&str>) -> Result<usize, AutomationError> {
        match self.matched_locator_index {
            Some(index) if self.succeeded => Ok(index),
            _ => Err(AutomationError::LocatorsExhausted {
                label: label.to_string(),
                attempts: self.attempts,
                hint: hint.map(str::to_string),
            }),
        }
    }
}

fn wait_miss(e: DriverError) -> LocatorMiss {
    match e {
        DriverError::Timeout(_) | DriverError::NoSuchElement(_) => LocatorMiss::Timeout,
        DriverError::NotInteractable(reason) | DriverError::StaleElement(reason) => LocatorMiss::NotActionable(reason),
        other => LocatorMiss::Driver(other.to_string()),
    }
}

fn session_lost(e: &DriverError) -> bool {
    matches!(e, DriverError::Session(_))
}

/// Tries each locator of a [`LocatorSpec`] in order and acts on the first
/// one that resolves. Failures of individual locators are folded into the
/// returned [`InteractionResult`]; nothing is raised.
pub struct ResilientInteractor {
    capture: DiagnosticCapture,
    waiter: PageStabilityWaiter,
    per_locator_timeout: Duration,
    page_load_timeout: Duration,
}

impl ResilientInteractor {
    pub fn new(settings: &AutomationSettings, capture: DiagnosticCapture) -> Self {
        Self {
            capture,
            waiter: PageStabilityWaiter::new(settings.poll_interval, settings.settle_delay),
            per_locator_timeout: settings.per_locator_timeout,
            page_load_timeout: settings.page_load_timeout,
        }
    }

    pub fn capture(&self) -> &DiagnosticCapture {
        &self.capture
    }

    pub fn waiter(&self) -> &PageStabilityWaiter {
        &self.waiter
    }

    pub fn per_locator_timeout(&self) -> Duration {
        self.per_locator_timeout
    }

    pub fn page_load_timeout(&self) -> Duration {
        self.page_load_timeout
    }

    /// [`attempt`](Self::attempt) with the configured per-locator timeout
    pub async fn click<P>(&self, spec: &LocatorSpec, page: &P, label: &ActionLabel) -> InteractionResult
    where
        P: PageDriver + ?Sized,
    {
        self.attempt(spec, page, self.per_locator_timeout, label).await
    }

    pub async fn attempt<P>(
        &self,
        spec: &LocatorSpec,
        page: &P,
        timeout_per_locator: Duration,
        label: &ActionLabel,
    ) -> InteractionResult
    where
        P: PageDriver + ?Sized,
    {
        let mut attempts = Vec::new();

        for (index, locator) in spec.locators().iter().enumerate() {
            let element = match page.wait_for_actionable(locator, timeout_per_locator).await {
                Ok(element) => element,
                Err(e) => {
                    debug!("'{}': locator #{} {} unavailable: {}", label, index, locator, e);
                    let lost = session_lost(&e);
                    attempts.push(LocatorAttempt {
                        index,
                        locator: locator.clone(),
                        miss: wait_miss(e),
                    });
                    if lost {
                        warn!("'{}': browser session lost, skipping remaining locators", label);
                        break;
                    }
                    continue;
                }
            };

            self.capture.capture(page, CaptureKind::BeforeClick, label.as_str()).await;

            if let Err(click_err) = page.click(&element).await {
                debug!("'{}': click on {} failed ({}), dispatching script click", label, locator, click_err);
                if let Err(force_err) = page.force_click(&element).await {
                    debug!("'{}': script click on {} failed: {}", label, locator, force_err);
                    let lost = session_lost(&force_err);
                    attempts.push(LocatorAttempt {
                        index,
                        locator: locator.clone(),
                        miss: LocatorMiss::ClickFailed(format!("{}; {}", click_err, force_err)),
                    });
                    if lost {
                        warn!("'{}': browser session lost, skipping remaining locators", label);
                        break;
                    }
                    continue;
                }
            }

            info!("Clicked '{}' using {}", label, locator);
            self.capture.capture(page, CaptureKind::AfterClick, label.as_str()).await;
            self.waiter.await_stable(page, self.page_load_timeout).await;
            return InteractionResult::matched(index, attempts);
        }

        self.fail(page, label, attempts).await
    }

    /// Type `text` into the first locator that is present on the page.
    /// Inputs are resolved by presence only; sign-in fields are often
    /// overlaid by animated labels that defeat hit-testing.
    pub async fn fill<P>(
        &self,
        spec: &LocatorSpec,
        page: &P,
        text: &str,
        submit: bool,
        label: &ActionLabel,
    ) -> InteractionResult
    where
        P: PageDriver + ?Sized,
    {
        let mut attempts = Vec::new();

        for (index, locator) in spec.locators().iter().enumerate() {
            let element = match page.wait_for_present(locator, self.per_locator_timeout).await {
                Ok(element) => element,
                Err(e) => {
                    debug!("'{}': locator #{} {} unavailable: {}", label, index, locator, e);
                    let lost = session_lost(&e);
                    attempts.push(LocatorAttempt {
                        index,
                        locator: locator.clone(),
                        miss: wait_miss(e),
                    });
                    if lost {
                        warn!("'{}': browser session lost, skipping remaining locators", label);
                        break;
                    }
                    continue;
                }
            };

            match page.fill(&element, text, submit).await {
                Ok(()) => {
                    info!("Filled '{}' using {}", label, locator);
                    return InteractionResult::matched(index, attempts);
                }
                Err(e) => {
                    debug!("'{}': typing into {} failed: {}", label, locator, e);
                    attempts.push(LocatorAttempt {
                        index,
                        locator: locator.clone(),
                        miss: LocatorMiss::NotActionable(e.to_string()),
                    });
                }
            }
        }

        self.fail(page, label, attempts).await
    }

    async fn fail<P>(&self, page: &P, label: &ActionLabel, attempts: Vec<LocatorAttempt>) -> InteractionResult
    where
        P: PageDriver + ?Sized,
    {
        warn!("All {} locators failed for '{}'", attempts.len(), label);
        let diagnostic = self.capture.capture(page, CaptureKind::Failure, label.as_str()).await;
        InteractionResult::exhausted(diagnostic, attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Behavior, FakePage};
    use browser_debug::DebugConfig;
    use tempfile::TempDir;
    use tokio::time::Instant;

    fn settings() -> AutomationSettings {
        AutomationSettings {
            per_locator_timeout: Duration::from_secs(5),
            page_load_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(200),
            step_delay: Duration::from_millis(0),
            login_delay: Duration::from_millis(0),
            poll_interval: Duration::from_millis(100),
        }
    }

    fn interactor(dir: &TempDir) -> ResilientInteractor {
        let config = DebugConfig::new(true, dir.path()).unwrap();
        ResilientInteractor::new(&settings(), DiagnosticCapture::new(config).unwrap())
    }

    fn files_in(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_actionable_locator_wins_and_later_ones_are_untouched() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new()
            .with("button.second", Behavior::Clickable)
            .with("button.third", Behavior::Clickable);
        let spec = LocatorSpec::new(["button.first", "button.second", "button.third"]).unwrap();

        let result = interactor(&dir).click(&spec, &page, &"next".into()).await;

        assert!(result.succeeded);
        assert_eq!(result.matched_locator_index, Some(1));
        assert_eq!(page.waited(), vec!["button.first", "button.second"]);
        assert_eq!(page.clicks(), vec!["button.second"]);
        assert_eq!(result.attempts.len(), 1);
        assert_eq!(result.attempts[0].miss, LocatorMiss::Timeout);
        assert_eq!(files_in(&dir), vec!["after_click_next.png", "before_click_next.png"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_css_miss_then_xpath_hit() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new().with("//button[.//span[text()='Next']]", Behavior::Clickable);
        let spec = LocatorSpec::new(["button#identifierNext", "//button[.//span[text()='Next']]"]).unwrap();

        let result = interactor(&dir).click(&spec, &page, &"email next".into()).await;

        assert!(result.succeeded);
        assert_eq!(result.matched_locator_index, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_leaves_exactly_one_failure_diagnostic() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new();
        let spec = LocatorSpec::new(["a", "b", "//c"]).unwrap();

        let start = Instant::now();
        let result = interactor(&dir).click(&spec, &page, &"edit draft".into()).await;

        assert!(!result.succeeded);
        assert_eq!(result.matched_locator_index, None);
        assert_eq!(result.attempts.len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(15));

        let artifact = result.diagnostic.unwrap();
        assert_eq!(artifact.screenshot, Some(dir.path().join("error_edit_draft.png")));
        assert_eq!(artifact.page_source, Some(dir.path().join("error_edit_draft.html")));
        assert_eq!(page.screenshot_count(), 1);
        assert_eq!(page.source_count(), 1);
        assert!(page.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_overwrites_own_diagnostic_only() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new();
        let spec = LocatorSpec::new(["a"]).unwrap();
        let interactor = interactor(&dir);

        interactor.click(&spec, &page, &"save and release".into()).await;
        interactor.click(&spec, &page, &"save and release".into()).await;
        interactor.click(&spec, &page, &"confirm".into()).await;

        assert_eq!(
            files_in(&dir),
            vec![
                "error_confirm.html",
                "error_confirm.png",
                "error_save_and_release.html",
                "error_save_and_release.png",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_intercepted_click_falls_back_to_script_click_on_same_index() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new()
            .with("button.overlaid", Behavior::Intercepted)
            .with("button.backup", Behavior::Clickable);
        let spec = LocatorSpec::new(["button.overlaid", "button.backup"]).unwrap();

        let result = interactor(&dir).click(&spec, &page, &"next".into()).await;

        assert_eq!(result.matched_locator_index, Some(0));
        assert_eq!(page.clicks(), vec!["button.overlaid"]);
        assert_eq!(page.force_clicks(), vec!["button.overlaid"]);
        assert!(result.attempts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unclickable_locator_moves_on() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new()
            .with("button.dead", Behavior::Unclickable)
            .with("button.live", Behavior::Clickable);
        let spec = LocatorSpec::new(["button.dead", "button.live"]).unwrap();

        let result = interactor(&dir).click(&spec, &page, &"next".into()).await;

        assert_eq!(result.matched_locator_index, Some(1));
        assert!(matches!(result.attempts[0].miss, LocatorMiss::ClickFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_covered_locator_is_reported_not_actionable() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new().with("button.covered", Behavior::Covered);
        let spec = LocatorSpec::new(["button.covered"]).unwrap();

        let result = interactor(&dir).click(&spec, &page, &"next".into()).await;

        assert!(!result.succeeded);
        assert!(matches!(result.attempts[0].miss, LocatorMiss::NotActionable(_)));
        assert!(page.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_diagnostics_write_nothing() {
        let page = FakePage::new();
        let spec = LocatorSpec::new(["a"]).unwrap();
        let interactor = ResilientInteractor::new(&settings(), DiagnosticCapture::disabled());

        let result = interactor.click(&spec, &page, &"next".into()).await;

        assert!(!result.succeeded);
        assert!(result.diagnostic.is_none());
        assert_eq!(page.screenshot_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_uses_first_present_input() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new()
            .with("input#identifierId", Behavior::Covered)
            .with("input[name='identifier']", Behavior::Clickable);
        let spec = LocatorSpec::new(["input[type='email']", "input#identifierId", "input[name='identifier']"]).unwrap();

        let result = interactor(&dir)
            .fill(&spec, &page, "release@example.com", false, &"email".into())
            .await;

        assert_eq!(result.matched_locator_index, Some(1));
        assert_eq!(
            page.fills(),
            vec![("input#identifierId".to_string(), "release@example.com".to_string(), false)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_replaces_prefilled_text_without_clicking() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new()
            .with("input[type='email']", Behavior::Covered)
            .prefill("input[type='email']", "old@example.com");
        let spec = LocatorSpec::new(["input[type='email']"]).unwrap();

        let result = interactor(&dir)
            .fill(&spec, &page, "release@example.com", false, &"email".into())
            .await;

        assert_eq!(result.matched_locator_index, Some(0));
        assert_eq!(page.value("input[type='email']").as_deref(), Some("release@example.com"));
        assert!(page.clicks().is_empty());
        assert!(page.force_clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_session_skips_remaining_locators() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new()
            .with("button.first", Behavior::Disconnected)
            .with("button.third", Behavior::Clickable);
        let spec = LocatorSpec::new(["button.first", "button.second", "button.third"]).unwrap();

        let start = Instant::now();
        let result = interactor(&dir).click(&spec, &page, &"next".into()).await;

        assert!(!result.succeeded);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(page.waited(), vec!["button.first"]);
        assert_eq!(result.attempts.len(), 1);
        assert!(matches!(result.attempts[0].miss, LocatorMiss::Driver(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_session_ends_fill_early() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new().with("input#identifierId", Behavior::Disconnected);
        let spec = LocatorSpec::new(["input#identifierId", "input[name='identifier']"]).unwrap();

        let start = Instant::now();
        let result = interactor(&dir)
            .fill(&spec, &page, "release@example.com", false, &"email".into())
            .await;

        assert!(!result.succeeded);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(page.waited(), vec!["input#identifierId"]);
        assert!(page.fills().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_maps_failure_to_error_with_hint() {
        let dir = TempDir::new().unwrap();
        let page = FakePage::new();
        let spec = LocatorSpec::new(["a", "b"]).unwrap();
        let label = ActionLabel::new("edit draft");

        let err = interactor(&dir)
            .click(&spec, &page, &label)
            .await
            .require(&label, Some("no draft release may exist"))
            .unwrap_err();

        match err {
            AutomationError::LocatorsExhausted { label, attempts, hint } => {
                assert_eq!(label, "edit draft");
                assert_eq!(attempts.len(), 2);
                assert_eq!(hint.as_deref(), Some("no draft release may exist"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

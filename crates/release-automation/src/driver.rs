use async_trait::async_trait;
use browser_debug::SnapshotSource;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

use crate::error::DriverError;
use crate::locator::Locator;

/// Browser capabilities the interactor and the flows need.
///
/// Adapters translate every driver-specific failure into [`DriverError`];
/// callers never see chromiumoxide or fantoccini types.
#[async_trait]
pub trait PageDriver: SnapshotSource {
    type Element: Send + Sync;

    /// Wait until the locator resolves to a visible, enabled, uncovered element
    async fn wait_for_actionable(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Self::Element, DriverError>;

    /// Wait until the locator resolves to any element
    async fn wait_for_present(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Self::Element, DriverError>;

    async fn click(&self, element: &Self::Element) -> Result<(), DriverError>;

    /// Dispatch `element.click()` from page script, bypassing hit-testing
    async fn force_click(&self, element: &Self::Element) -> Result<(), DriverError>;

    /// Replace the element's value with `text`, pressing Enter afterwards
    /// when `submit` is set. Must not hit-test: inputs resolved by presence
    /// may sit under a floating label.
    async fn fill(&self, element: &Self::Element, text: &str, submit: bool) -> Result<(), DriverError>;

    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError>;
}

/// Page-script function run against a candidate element with `this` bound
/// to it. Returns `ok`, `hidden`, `disabled` or `covered`.
pub(crate) const ACTIONABILITY_FN: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    if (rect.width === 0 || rect.height === 0 || style.visibility === 'hidden' || style.display === 'none') {
        return 'hidden';
    }
    if (this.disabled || this.getAttribute('aria-disabled') === 'true') {
        return 'disabled';
    }
    this.scrollIntoView({ block: 'center', inline: 'center' });
    const box = this.getBoundingClientRect();
    const top = document.elementFromPoint(box.left + box.width / 2, box.top + box.height / 2);
    if (top && top !== this && !this.contains(top)) {
        return 'covered';
    }
    return 'ok';
}"#;

/// Hides the automation flag some sign-in pages check
pub(crate) const STEALTH_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// Focus an input and drop any prefilled value, without a pointer event
pub(crate) const FOCUS_AND_CLEAR_FN: &str = r#"function() {
    this.focus();
    if ('value' in this) {
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
    }
}"#;

/// Interpret the result of [`ACTIONABILITY_FN`]
pub(crate) fn actionability_verdict(locator: &Locator, verdict: &serde_json::Value) -> Result<(), DriverError> {
    match verdict.as_str() {
        Some("ok") => Ok(()),
        Some(reason) => Err(DriverError::NotInteractable(format!("{} is {}", locator, reason))),
        None => Err(DriverError::Script(format!(
            "unexpected actionability result for {}: {}",
            locator, verdict
        ))),
    }
}

/// Repeatedly run `probe` until it yields a value or `limit` elapses.
///
/// `Ok(None)` means "not yet"; a recoverable error is remembered and
/// returned when the deadline passes instead of a bare timeout, so callers
/// can tell "never appeared" from "appeared but never became clickable".
/// `DriverError::Session` aborts immediately.
pub async fn poll_until<T, F, Fut>(limit: Duration, interval: Duration, mut probe: F) -> Result<T, DriverError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, DriverError>>,
{
    let deadline = Instant::now() + limit;
    let mut last_error = None;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, probe()).await {
            Ok(Ok(Some(value))) => return Ok(value),
            Ok(Ok(None)) => {}
            Ok(Err(e @ DriverError::Session(_))) => return Err(e),
            Ok(Err(e)) => last_error = Some(e),
            Err(_) => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(last_error.unwrap_or(DriverError::Timeout(limit)));
        }
        sleep(interval.min(deadline - now)).await;
    }
}

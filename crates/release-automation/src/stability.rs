use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::driver::PageDriver;

const READY_STATE_SCRIPT: &str = "document.readyState === 'complete'";

/// True when the page has no Angular testability hook or every registered
/// testability reports stable
const ANGULAR_STABLE_SCRIPT: &str = "typeof window.getAllAngularTestabilities === 'undefined' \
    || window.getAllAngularTestabilities().findIndex(t => !t.isStable()) === -1";

/// Waits for a page to finish loading after a navigation-causing action.
///
/// Never fails: a page that does not settle within the budget is logged and
/// the caller carries on.
#[derive(Debug, Clone)]
pub struct PageStabilityWaiter {
    poll_interval: Duration,
    settle_delay: Duration,
}

impl PageStabilityWaiter {
    pub fn new(poll_interval: Duration, settle_delay: Duration) -> Self {
        Self {
            poll_interval,
            settle_delay,
        }
    }

    /// Load-complete first, then the SPA hook, both against one deadline,
    /// followed by the settle delay
    pub async fn await_stable<P>(&self, page: &P, limit: Duration)
    where
        P: PageDriver + ?Sized,
    {
        let deadline = Instant::now() + limit;

        if !self.poll_script(page, READY_STATE_SCRIPT, deadline).await {
            warn!("Page did not reach readyState 'complete' within {:?}, continuing anyway", limit);
        } else if !self.poll_script(page, ANGULAR_STABLE_SCRIPT, deadline).await {
            warn!("Angular testabilities not stable within {:?}, continuing anyway", limit);
        }

        sleep(self.settle_delay).await;
    }

    /// Poll until `script` evaluates to `true`; false on deadline
    async fn poll_script<P>(&self, page: &P, script: &str, deadline: Instant) -> bool
    where
        P: PageDriver + ?Sized,
    {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            match timeout(remaining, page.evaluate(script)).await {
                Ok(Ok(value)) if value.as_bool() == Some(true) => return true,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => debug!("Stability probe failed: {}", e),
                Err(_) => return false,
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            sleep(self.poll_interval.min(remaining)).await;
        }
    }
}

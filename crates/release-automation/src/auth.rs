use browser_debug::CaptureKind;
use release_config::{AutomationSettings, ConsoleConfig, ConsoleSelectors, Credentials};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use crate::driver::PageDriver;
use crate::error::AutomationError;
use crate::interactor::{ActionLabel, ResilientInteractor};
use crate::locator::LocatorSpec;

/// Google account sign-in: email, next, password, next, then a check that
/// the browser actually left the sign-in pages
pub struct LoginFlow<'a> {
    interactor: &'a ResilientInteractor,
    console: &'a ConsoleConfig,
    selectors: &'a ConsoleSelectors,
    step_delay: Duration,
    login_delay: Duration,
}

impl<'a> LoginFlow<'a> {
    pub fn new(
        interactor: &'a ResilientInteractor,
        console: &'a ConsoleConfig,
        selectors: &'a ConsoleSelectors,
        settings: &AutomationSettings,
    ) -> Self {
        Self {
            interactor,
            console,
            selectors,
            step_delay: settings.step_delay,
            login_delay: settings.login_delay,
        }
    }

    pub async fn login<P>(&self, page: &P, credentials: &Credentials) -> Result<(), AutomationError>
    where
        P: PageDriver + ?Sized,
    {
        let capture = self.interactor.capture();
        info!("Signing in as {}", credentials.masked_email());

        page.navigate(&self.console.login_url)
            .await
            .map_err(|source| AutomationError::Navigation {
                url: self.console.login_url.clone(),
                source,
            })?;
        self.interactor
            .waiter()
            .await_stable(page, self.interactor.page_load_timeout())
            .await;
        capture.capture(page, CaptureKind::Step, "01_login_page").await;

        let label = ActionLabel::new("email input");
        self.interactor
            .fill(&LocatorSpec::new(&self.selectors.email_input)?, page, &credentials.email, false, &label)
            .await
            .require(&label, None)?;
        capture.capture(page, CaptureKind::Step, "02_email_entered").await;

        let label = ActionLabel::new("email next");
        self.interactor
            .click(&LocatorSpec::new(&self.selectors.email_next)?, page, &label)
            .await
            .require(&label, None)?;
        sleep(self.step_delay).await;
        capture.capture(page, CaptureKind::Step, "03_after_email_next").await;

        let label = ActionLabel::new("password input");
        self.interactor
            .fill(
                &LocatorSpec::new(&self.selectors.password_input)?,
                page,
                &credentials.password,
                false,
                &label,
            )
            .await
            .require(&label, Some("two-factor authentication may be enabled or the sign-in page changed"))?;
        capture.capture(page, CaptureKind::Step, "04_password_entered").await;

        let label = ActionLabel::new("password next");
        self.interactor
            .click(&LocatorSpec::new(&self.selectors.password_next)?, page, &label)
            .await
            .require(&label, None)?;

        sleep(self.login_delay).await;
        self.interactor
            .waiter()
            .await_stable(page, self.interactor.page_load_timeout())
            .await;
        capture.capture(page, CaptureKind::Step, "05_login_complete").await;

        self.check_signed_in(page).await
    }

    async fn check_signed_in<P>(&self, page: &P) -> Result<(), AutomationError>
    where
        P: PageDriver + ?Sized,
    {
        let url = page.current_url().await?;

        if self.console.is_two_factor_url(&url) {
            error!("Two-factor challenge at {}", url);
            return Err(AutomationError::TwoFactorRequired { url });
        }
        // An empty or blank URL never counts as having left the sign-in pages
        if url.trim().is_empty() || url.starts_with("about:") || url.starts_with(&self.console.login_url) {
            error!("Still on the sign-in pages: {:?}", url);
            return Err(AutomationError::LoginNotCompleted { url });
        }

        info!("Google sign-in complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Behavior, FakePage};
    use browser_debug::DiagnosticCapture;
    use release_config::TimeoutConfig;

    fn credentials() -> Credentials {
        Credentials {
            email: "release@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn login_page() -> FakePage {
        FakePage::new()
            .with("input[type='email']", Behavior::Clickable)
            .with("button#identifierNext", Behavior::Clickable)
            .with("input[name='Passwd']", Behavior::Clickable)
            .with("button#passwordNext", Behavior::Clickable)
    }

    async fn run(page: &FakePage) -> Result<(), AutomationError> {
        let settings = TimeoutConfig::default().settings();
        let interactor = ResilientInteractor::new(&settings, DiagnosticCapture::disabled());
        let console = ConsoleConfig::default();
        let selectors = ConsoleSelectors::default();
        LoginFlow::new(&interactor, &console, &selectors, &settings)
            .login(page, &credentials())
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_login() {
        let page = login_page().url_after_click("button#passwordNext", "https://myaccount.google.com/");

        run(&page).await.unwrap();

        assert_eq!(page.navigations(), vec!["https://accounts.google.com"]);
        assert_eq!(
            page.fills(),
            vec![
                ("input[type='email']".to_string(), "release@example.com".to_string(), false),
                ("input[name='Passwd']".to_string(), "hunter2".to_string(), false),
            ]
        );
        assert_eq!(page.clicks(), vec!["button#identifierNext", "button#passwordNext"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_factor_challenge_aborts() {
        let page = login_page().url_after_click(
            "button#passwordNext",
            "https://accounts.google.com/signin/v2/challenge/totp?TL=abc",
        );

        let err = run(&page).await.unwrap_err();

        match err {
            AutomationError::TwoFactorRequired { url } => assert!(url.contains("signin/v2/challenge")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_on_sign_in_page_is_not_completed() {
        let page = login_page().url_after_click(
            "button#passwordNext",
            "https://accounts.google.com/v3/signin/identifier",
        );

        let err = run(&page).await.unwrap_err();

        assert!(matches!(err, AutomationError::LoginNotCompleted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_url_is_not_signed_in() {
        for url in ["", "about:blank"] {
            let page = login_page().url_after_click("button#passwordNext", url);

            let err = run(&page).await.unwrap_err();

            assert!(matches!(err, AutomationError::LoginNotCompleted { .. }), "url {:?}", url);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_password_field_carries_hint() {
        let page = FakePage::new()
            .with("input[type='email']", Behavior::Clickable)
            .with("button#identifierNext", Behavior::Clickable);

        let err = run(&page).await.unwrap_err();

        assert!(err.to_string().contains("password input"));
        assert!(err.to_string().contains("two-factor"));
    }
}

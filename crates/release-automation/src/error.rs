use thiserror::Error;

use crate::interactor::LocatorAttempt;

/// Failures reported by a browser driver adapter.
///
/// Everything except `Session` is recoverable at the interactor level:
/// the next locator is tried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("no element matches {0}")]
    NoSuchElement(String),

    #[error("element not interactable: {0}")]
    NotInteractable(String),

    #[error("stale element reference: {0}")]
    StaleElement(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser session error: {0}")]
    Session(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("a locator list needs at least one entry")]
    EmptyLocatorSpec,

    #[error(
        "no locator succeeded for '{label}' ({} tried){}",
        .attempts.len(),
        hint_suffix(.hint)
    )]
    LocatorsExhausted {
        label: String,
        attempts: Vec<LocatorAttempt>,
        hint: Option<String>,
    },

    #[error("two-factor authentication required at {url}; complete sign-in manually and retry")]
    TwoFactorRequired { url: String },

    #[error("login did not complete, still on {url}")]
    LoginNotCompleted { url: String },

    #[error("browser setup failed: {0}")]
    Setup(String),

    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: DriverError,
    },

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Driver(#[from] DriverError),
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(": {}", hint),
        None => String::new(),
    }
}

impl AutomationError {
    /// Only an interrupt maps to its own exit status
    pub fn is_interrupt(&self) -> bool {
        matches!(self, AutomationError::Interrupted)
    }
}

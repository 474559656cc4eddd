pub mod auth;
pub mod chromium;
pub mod driver;
pub mod error;
pub mod interactor;
pub mod locator;
pub mod release;
pub mod session;
pub mod stability;
pub mod webdriver;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::LoginFlow;
pub use chromium::{ChromiumPage, ChromiumSession};
pub use driver::PageDriver;
pub use error::{AutomationError, DriverError};
pub use interactor::{ActionLabel, InteractionResult, LocatorAttempt, LocatorMiss, ResilientInteractor};
pub use locator::{Locator, LocatorSpec};
pub use release::{ReleaseOutcome, ReleaseWorkflow};
pub use session::{run_scoped, BrowserSession};
pub use stability::PageStabilityWaiter;
pub use webdriver::{WebDriverPage, WebDriverSession};

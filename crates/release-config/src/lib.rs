pub mod config;
pub mod credentials;
pub mod paths;
pub mod selectors;

pub use config::{AutomationSettings, Backend, BrowserOptions, Config, ConfigError, ConsoleConfig, ReleaseTarget, TimeoutConfig};
pub use credentials::{CredentialStore, Credentials};
pub use paths::{base_path_override, PathManager};
pub use selectors::ConsoleSelectors;

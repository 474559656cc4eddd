pub mod config;
pub mod prompts;
pub mod release;

use crate::{BackendArg, RunArgs};
use color_eyre::Result;
use release_config::{Backend, Config, PathManager};
use std::path::{Path, PathBuf};

/// Config file location: `--config` wins, then the per-user directory
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(PathManager::new()
            .map_err(|e| color_eyre::eyre::eyre!("{}", e))?
            .config_file()),
    }
}

/// Load the config file (defaults when absent) and layer the command line on top
pub fn load_effective_config(path: &Path, args: &RunArgs) -> Result<Config> {
    let mut config = Config::load_or_default(path)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", path.display(), e))?;
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(id) = &args.developer_id {
        config.console.developer_id = Some(id.clone());
    }
    if let Some(id) = &args.app_id {
        config.console.app_id = Some(id.clone());
    }
    if let Some(secs) = args.wait_time {
        config.timeouts.wait_time_secs = secs;
    }
    if let Some(headless) = args.headless {
        config.browser.headless = headless;
    }
    if let Some(backend) = args.backend {
        config.browser.backend = match backend {
            BackendArg::Chromium => Backend::Chromium,
            BackendArg::Webdriver => Backend::WebDriver,
        };
    }
    if let Some(url) = &args.webdriver_url {
        config.browser.webdriver_url = url.clone();
    }
    if let Some(enabled) = args.debug {
        config.browser_debug.enabled = enabled;
    }
    if let Some(dir) = &args.debug_dir {
        config.browser_debug.output_dir = dir.clone();
    }
}

use super::prompts;
use crate::output::{Output, OutputFormat};
use crate::{ConfigCommands, RunArgs};
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use release_config::{Backend, Config, CredentialStore, Credentials, PathManager};
use serde_json::json;
use std::path::Path;

pub fn run_config(cmd: ConfigCommands, args: &RunArgs, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config_file = super::config_path(config_path)?;
    match cmd {
        ConfigCommands::Show => show_config(&config_file, args, output),
        ConfigCommands::Init { force } => init_config(&config_file, force, output),
        ConfigCommands::Credentials => {
            let paths = PathManager::new().map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
            let email = match &args.email {
                Some(email) => email.clone(),
                None => prompts::prompt_string("Google email")?,
            };
            let password = match &args.password {
                Some(password) => password.clone(),
                None => prompts::prompt_password("Google password")?,
            };
            store_credentials(&paths.credentials_file(), &email, &password, output)
        }
    }
}

fn show_config(config_file: &Path, args: &RunArgs, output: &Output) -> Result<()> {
    let config = super::load_effective_config(config_file, args)?;

    let paths = PathManager::new().map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    let mut store = CredentialStore::new(paths.credentials_file());
    store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials: {}", e))?;
    let email = args.email.clone().or_else(|| store.google_email().cloned()).unwrap_or_default();
    let password_set = args.password.is_some() || store.google_password().is_some();

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }

            println!("\n{}", "╔════════════════════════════════════════════════════════════╗".bright_white());
            println!("{} {}", "║".bright_white(), "Configuration".bright_cyan().bold());
            println!("{}", "╚════════════════════════════════════════════════════════════╝".bright_white());
            println!();

            if !config_file.exists() {
                output.warn(format!(
                    "Configuration file not found at {}, showing defaults. Run 'playstore-release config init' to create it.",
                    config_file.display()
                ));
            }
            print_table("Config File", vec![("Path", config_file.display().to_string())]);

            print_table(
                "Play Console",
                vec![
                    ("Developer ID", config.console.developer_id.clone().unwrap_or_else(|| "<not set>".to_string())),
                    ("App ID", config.console.app_id.clone().unwrap_or_else(|| "<not set>".to_string())),
                    ("Login URL", config.console.login_url.clone()),
                    ("Release URL", config.console.release_url_template.clone()),
                ],
            );

            print_table(
                "Google Account",
                vec![
                    ("Email", mask_string(&email)),
                    ("Password", if password_set { "********".to_string() } else { "<not set>".to_string() }),
                ],
            );

            let timeouts = &config.timeouts;
            print_table(
                "Timeouts",
                vec![
                    ("Wait time", format!("{}s", timeouts.wait_time_secs)),
                    ("Page load", format!("{}s", timeouts.page_load_secs)),
                    ("Settle delay", format!("{}ms", timeouts.settle_delay_ms)),
                    ("Step delay", format!("{}ms", timeouts.step_delay_ms)),
                    ("Login delay", format!("{}ms", timeouts.login_delay_ms)),
                    ("Poll interval", format!("{}ms", timeouts.poll_interval_ms)),
                ],
            );

            let browser = &config.browser;
            let mut rows = vec![
                (
                    "Backend",
                    match browser.backend {
                        Backend::Chromium => "chromium".to_string(),
                        Backend::WebDriver => "webdriver".to_string(),
                    },
                ),
                ("Headless", browser.headless.to_string()),
                ("Window", format!("{}x{}", browser.window_width, browser.window_height)),
            ];
            if browser.backend == Backend::WebDriver {
                rows.push(("WebDriver URL", browser.webdriver_url.clone()));
            }
            if let Some(path) = &browser.chrome_executable {
                rows.push(("Chrome", path.display().to_string()));
            }
            print_table("Browser", rows);

            print_table(
                "Diagnostics",
                vec![
                    ("Enabled", config.browser_debug.enabled.to_string()),
                    ("Output dir", config.browser_debug.output_dir.display().to_string()),
                ],
            );
        }
        _ => {
            let mut value = serde_json::to_value(&config)?;
            value["config_file"] = json!(config_file.display().to_string());
            value["account"] = json!({
                "email": mask_string(&email),
                "password_set": password_set,
            });
            output.json(&value);
        }
    }

    Ok(())
}

fn init_config(config_file: &Path, force: bool, output: &Output) -> Result<()> {
    if config_file.exists() && !force {
        return Err(color_eyre::eyre::eyre!(
            "Configuration file already exists at {} (use --force to overwrite)",
            config_file.display()
        ));
    }

    Config::default()
        .save_to_file(config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save config to {}: {}", config_file.display(), e))?;

    output.success(format!("Configuration written to {}", config_file.display()));
    output.info("Set console.developer_id and console.app_id, or pass --developer-id/--app-id.");
    Ok(())
}

fn store_credentials(credentials_file: &Path, email: &str, password: &str, output: &Output) -> Result<()> {
    let mut store = CredentialStore::new(credentials_file.to_path_buf());
    store.load().map_err(|e| {
        color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e)
    })?;

    let credentials = Credentials::resolve(Some(email), Some(password), &store)?;
    store.set_google_email(credentials.email.clone());
    store.set_google_password(credentials.password);
    store.save().map_err(|e| {
        color_eyre::eyre::eyre!("Failed to save credentials to {}: {}", credentials_file.display(), e)
    })?;

    output.success(format!(
        "Saved credentials for {} to {}",
        mask_string(&credentials.email),
        credentials_file.display()
    ));
    Ok(())
}

fn print_table(title: &str, rows: Vec<(&str, String)>) {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new(title)
            .fg(comfy_table::Color::Cyan)
            .add_attribute(comfy_table::Attribute::Bold),
        Cell::new(""),
    ]);
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);
    println!();
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

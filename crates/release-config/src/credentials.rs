use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigError;

const EMAIL_KEY: &str = "google_email";
const PASSWORD_KEY: &str = "google_password";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Flat key/value TOML file kept next to the config, outside version control
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.credentials.insert(key.to_string(), value);
    }

    pub fn google_email(&self) -> Option<&String> {
        self.get(EMAIL_KEY)
    }

    pub fn set_google_email(&mut self, email: String) {
        self.set(EMAIL_KEY, email);
    }

    pub fn google_password(&self) -> Option<&String> {
        self.get(PASSWORD_KEY)
    }

    pub fn set_google_password(&mut self, password: String) {
        self.set(PASSWORD_KEY, password);
    }
}

/// Google account used for the console sign-in
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.masked_email())
            .field("password", &"********")
            .finish()
    }
}

impl Credentials {
    /// Flag/env values first, then the credential store
    pub fn resolve(
        email: Option<&str>,
        password: Option<&str>,
        store: &CredentialStore,
    ) -> Result<Self, ConfigError> {
        let email = email
            .map(str::to_string)
            .or_else(|| store.google_email().cloned())
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("Google email"))?;
        let password = password
            .map(str::to_string)
            .or_else(|| store.google_password().cloned())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("Google password"))?;

        if !email.contains('@') {
            return Err(ConfigError::Invalid {
                field: "email",
                reason: "not an email address".to_string(),
            });
        }

        Ok(Self { email, password })
    }

    /// Safe for logs: first three characters followed by `***`
    pub fn masked_email(&self) -> String {
        let prefix: String = self.email.chars().take(3).collect();
        format!("{}***", prefix)
    }
}

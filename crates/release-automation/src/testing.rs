//! Scripted in-memory browser used by the unit tests

use async_trait::async_trait;
use browser_debug::SnapshotSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::driver::PageDriver;
use crate::error::DriverError;
use crate::locator::Locator;
use crate::session::BrowserSession;

/// How a locator behaves when the fake page is asked for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Present, actionable, clicks fine
    Clickable,
    /// Present and actionable but the native click is rejected
    /// (overlay); the scripted click works
    Intercepted,
    /// Both native and scripted click fail
    Unclickable,
    /// Present but never actionable
    Covered,
    /// The browser is gone: every lookup fails with a session error at once
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeElement {
    pub locator: String,
}

#[derive(Default)]
struct State {
    behaviors: HashMap<String, Behavior>,
    url: String,
    url_after_click: HashMap<String, String>,
    script_results: HashMap<String, serde_json::Value>,
    hanging_scripts: Vec<String>,
    evaluations: HashMap<String, usize>,
    waited: Vec<String>,
    clicks: Vec<String>,
    force_clicks: Vec<String>,
    fills: Vec<(String, String, bool)>,
    values: HashMap<String, String>,
    navigations: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<State>>,
    screenshots: Arc<AtomicUsize>,
    sources: Arc<AtomicUsize>,
}

impl FakePage {
    /// A loaded page where every unknown locator is missing
    pub fn new() -> Self {
        let page = Self::default();
        page.set_script_result("document.readyState === 'complete'", serde_json::json!(true));
        page
    }

    pub fn with(self, locator: &str, behavior: Behavior) -> Self {
        self.state.lock().unwrap().behaviors.insert(locator.to_string(), behavior);
        self
    }

    /// Text already in an input before the flow types into it
    pub fn prefill(self, locator: &str, text: &str) -> Self {
        self.state.lock().unwrap().values.insert(locator.to_string(), text.to_string());
        self
    }

    pub fn value(&self, locator: &str) -> Option<String> {
        self.state.lock().unwrap().values.get(locator).cloned()
    }

    pub fn url_after_click(self, locator: &str, url: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .url_after_click
            .insert(locator.to_string(), url.to_string());
        self
    }

    pub fn set_script_result(&self, script: &str, value: serde_json::Value) {
        self.state.lock().unwrap().script_results.insert(script.to_string(), value);
    }

    pub fn hang_script(&self, script: &str) {
        self.state.lock().unwrap().hanging_scripts.push(script.to_string());
    }

    pub fn evaluations(&self, script: &str) -> usize {
        self.state.lock().unwrap().evaluations.get(script).copied().unwrap_or(0)
    }

    /// Every locator the page was asked to resolve, in order
    pub fn waited(&self) -> Vec<String> {
        self.state.lock().unwrap().waited.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn force_clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().force_clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String, bool)> {
        self.state.lock().unwrap().fills.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn screenshot_count(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }

    pub fn source_count(&self) -> usize {
        self.sources.load(Ordering::SeqCst)
    }

    fn behavior(&self, locator: &Locator) -> Option<Behavior> {
        let mut state = self.state.lock().unwrap();
        state.waited.push(locator.as_str().to_string());
        state.behaviors.get(locator.as_str()).copied()
    }

    fn after_click(&self, element: &FakeElement) {
        let mut state = self.state.lock().unwrap();
        if let Some(url) = state.url_after_click.get(&element.locator).cloned() {
            state.url = url;
        }
    }
}

#[async_trait]
impl SnapshotSource for FakePage {
    async fn screenshot_png(&self, _full_page: bool) -> anyhow::Result<Vec<u8>> {
        self.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn page_source(&self) -> anyhow::Result<String> {
        self.sources.fetch_add(1, Ordering::SeqCst);
        Ok("<html></html>".to_string())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    type Element = FakeElement;

    async fn wait_for_actionable(&self, locator: &Locator, timeout: Duration) -> Result<FakeElement, DriverError> {
        match self.behavior(locator) {
            Some(Behavior::Disconnected) => Err(DriverError::Session("browser connection closed".to_string())),
            Some(Behavior::Covered) => {
                tokio::time::sleep(timeout).await;
                Err(DriverError::NotInteractable(format!("{} is covered", locator)))
            }
            Some(_) => Ok(FakeElement {
                locator: locator.as_str().to_string(),
            }),
            None => {
                tokio::time::sleep(timeout).await;
                Err(DriverError::Timeout(timeout))
            }
        }
    }

    async fn wait_for_present(&self, locator: &Locator, timeout: Duration) -> Result<FakeElement, DriverError> {
        match self.behavior(locator) {
            Some(Behavior::Disconnected) => Err(DriverError::Session("browser connection closed".to_string())),
            Some(_) => Ok(FakeElement {
                locator: locator.as_str().to_string(),
            }),
            None => {
                tokio::time::sleep(timeout).await;
                Err(DriverError::Timeout(timeout))
            }
        }
    }

    async fn click(&self, element: &FakeElement) -> Result<(), DriverError> {
        let behavior = {
            let mut state = self.state.lock().unwrap();
            state.clicks.push(element.locator.clone());
            state.behaviors.get(&element.locator).copied()
        };
        match behavior {
            Some(Behavior::Clickable) => {
                self.after_click(element);
                Ok(())
            }
            _ => Err(DriverError::NotInteractable(format!(
                "element click intercepted: {}",
                element.locator
            ))),
        }
    }

    async fn force_click(&self, element: &FakeElement) -> Result<(), DriverError> {
        let behavior = {
            let mut state = self.state.lock().unwrap();
            state.force_clicks.push(element.locator.clone());
            state.behaviors.get(&element.locator).copied()
        };
        match behavior {
            Some(Behavior::Clickable) | Some(Behavior::Intercepted) => {
                self.after_click(element);
                Ok(())
            }
            _ => Err(DriverError::Script("click() threw".to_string())),
        }
    }

    /// Replaces the value, like a cleared input; never counts as a click
    async fn fill(&self, element: &FakeElement, text: &str, submit: bool) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.fills.push((element.locator.clone(), text.to_string(), submit));
        state.values.insert(element.locator.clone(), text.to_string());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let (hang, result) = {
            let mut state = self.state.lock().unwrap();
            *state.evaluations.entry(script.to_string()).or_insert(0) += 1;
            (
                state.hanging_scripts.iter().any(|s| s == script),
                state.script_results.get(script).cloned(),
            )
        };
        if hang {
            futures::future::pending::<()>().await;
        }
        Ok(result.unwrap_or(serde_json::Value::Bool(true)))
    }
}

pub struct FakeSession {
    page: FakePage,
    closes: Arc<AtomicUsize>,
}

impl FakeSession {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn close_count(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Page = FakePage;

    fn page(&self) -> &FakePage {
        &self.page
    }

    async fn close(self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

use std::fmt;

use crate::error::AutomationError;

/// A single way of finding an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    /// `//` prefix selects XPath, everything else is a CSS selector
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("//") {
            Locator::XPath(raw.to_string())
        } else {
            Locator::Css(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }

    pub fn is_xpath(&self) -> bool {
        matches!(self, Locator::XPath(_))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Ordered, non-empty list of locators for one logical UI action.
/// Earlier entries are preferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorSpec {
    locators: Vec<Locator>,
}

impl LocatorSpec {
    pub fn new<I, S>(raw: I) -> Result<Self, AutomationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let locators: Vec<Locator> = raw
            .into_iter()
            .filter(|s| !s.as_ref().trim().is_empty())
            .map(|s| Locator::parse(s.as_ref()))
            .collect();

        if locators.is_empty() {
            return Err(AutomationError::EmptyLocatorSpec);
        }
        Ok(Self { locators })
    }

    pub fn locators(&self) -> &[Locator] {
        &self.locators
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    // Never true, kept for clippy's len_without_is_empty
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

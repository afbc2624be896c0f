//! Browser capability used to drive the procurement portal.
//!
//! The harvest workflows only talk to [`PortalDriver`]; the production
//! implementation is [`webdriver::WebDriverSession`], tests substitute fakes.

pub mod navigation;
pub mod webdriver;

use std::fmt::{self, Debug};
use std::time::Duration;

pub use navigation::PlanPortal;
pub use webdriver::WebDriverSession;

/// Opaque reference to an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

/// XPath expression locating one or more elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator(String);

impl Locator {
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    pub fn expression(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// Attached to the document.
    Present,
    /// Displayed and enabled.
    Clickable,
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("timed out after {waited:?} waiting for {locator}")]
    Timeout { locator: String, waited: Duration },
    #[error("webdriver command '{command}' failed ({error}): {message}")]
    Command {
        command: String,
        error: String,
        message: String,
    },
    #[error("webdriver transport error: {0}")]
    Transport(String),
    #[error("webdriver runtime unavailable: {0}")]
    Runtime(String),
    #[error("unexpected webdriver response: {0}")]
    Protocol(String),
}

pub trait PortalDriver: Debug {
    fn navigate(&self, url: &str) -> Result<(), DriverError>;
    /// First element matching `locator` that satisfies `condition`.
    fn wait_for(
        &self,
        locator: &Locator,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError>;
    /// All present elements; empty when none appear within `timeout`.
    fn find_all(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Vec<ElementHandle>, DriverError>;
    fn click(&self, element: &ElementHandle) -> Result<(), DriverError>;
    /// Click dispatched from script, for elements hidden behind overlays.
    fn force_click(&self, element: &ElementHandle) -> Result<(), DriverError>;
    fn clear(&self, element: &ElementHandle) -> Result<(), DriverError>;
    fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError>;
    fn read_text(&self, element: &ElementHandle) -> Result<String, DriverError>;
    fn dismiss_alert(&self, timeout: Duration) -> Result<(), DriverError>;
    fn close(&self) -> Result<(), DriverError>;
}

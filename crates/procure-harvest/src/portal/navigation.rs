use std::time::Duration;

use tracing::debug;

use super::{DriverError, ElementHandle, Locator, PortalDriver, WaitCondition};
use crate::config::PortalConfig;
use crate::workflows::documents::DocumentLink;
use crate::workflows::plan::{DurationType, PurchaseId};

const REGISTER_LINK: &str = r#"//a[@jhitranslate="layouts.register"]"#;
const LOGIN_WITHOUT_EDS: &str = r#"//a/span[@jhitranslate="global.menu.account.loginWithoutEds"]"#;
const USERNAME_INPUT: &str = r#"//sk-textbox[@name="username"]//input"#;
const PASSWORD_INPUT: &str = r#"//sk-passwordbox[@name="password"]//input"#;
const LOGIN_BUTTON: &str = r#"//button[@jhitranslate="login.form.button"]"#;
const REPORTS_MENU: &str = r#"//a/span[@jhitranslate="reports.reports"]"#;
const PLAN_EXECUTION_REPORT: &str = r#"//a/span[@jhitranslate="layouts.planExecutionReport"]"#;
const PLAN_YEAR_INPUT: &str = r#"//sk-numberbox[@name="planYear"]//input"#;
const MAIN_PLAN_OPTION: &str =
    r#"//sk-linear[@name="planType"]//select/option[text()=" Основной план "]"#;
const REPORT_DOWNLOAD_BUTTON: &str = r#"//button/span[@jhitranslate="planExecutionReport.download"]"#;
const ADVERT_MENU: &str = r#"//a/span[@jhitranslate="layouts.advert"]"#;
const ADVERT_LIST: &str = r#"//a/span[@jhitranslate="layouts.advertList"]"#;
const ADVERT_NUMBER_INPUT: &str = r#"//sk-textbox[@name="advertNumber"]//input"#;
const ADVERT_SEARCH_BUTTON: &str =
    r#"//button/span[@jhitranslate="eProcGatewayApp.advert.searchParam.search"]"#;
const DOCUMENT_LINKS: &str = "//sk-file-link//a";

/// Page-level steps on the procurement portal, expressed over a [`PortalDriver`].
#[derive(Debug)]
pub struct PlanPortal<'a, D: PortalDriver + ?Sized> {
    driver: &'a D,
    element_timeout: Duration,
}

impl<'a, D: PortalDriver + ?Sized> PlanPortal<'a, D> {
    pub fn new(driver: &'a D, element_timeout: Duration) -> Self {
        Self {
            driver,
            element_timeout,
        }
    }

    pub fn sign_in(&self, portal: &PortalConfig) -> Result<(), DriverError> {
        self.driver.navigate(&portal.host)?;
        self.click_when_ready(REGISTER_LINK)?;
        self.driver.dismiss_alert(self.element_timeout)?;

        self.click_when_ready(LOGIN_WITHOUT_EDS)?;
        self.fill(USERNAME_INPUT, &portal.login)?;
        self.fill(PASSWORD_INPUT, &portal.password)?;
        self.click_when_ready(LOGIN_BUTTON)?;
        debug!(host = %portal.host, "signed in to portal");
        Ok(())
    }

    /// Opens the plan execution report form filtered on the main plan of `year`.
    pub fn open_plan_execution_report(&self, year: i32) -> Result<(), DriverError> {
        self.click_when_ready(REPORTS_MENU)?;
        self.click_when_ready(PLAN_EXECUTION_REPORT)?;
        self.fill(PLAN_YEAR_INPUT, &year.to_string())?;
        self.click_when_ready(MAIN_PLAN_OPTION)?;
        Ok(())
    }

    /// Selects the duration type and asks the portal to generate the report.
    pub fn request_report(&self, duration: DurationType) -> Result<(), DriverError> {
        let option = format!(
            r#"//sk-linear[@name="durationType"]//select/option[text()=" {} "]"#,
            duration.portal_label()
        );
        self.click_when_ready(&option)?;
        self.click_when_ready(REPORT_DOWNLOAD_BUTTON)
    }

    /// The download button turns clickable again once the report is generated.
    pub fn await_report_ready(&self, timeout: Duration) -> Result<(), DriverError> {
        self.driver
            .wait_for(
                &Locator::xpath(REPORT_DOWNLOAD_BUTTON),
                WaitCondition::Clickable,
                timeout,
            )
            .map(|_| ())
    }

    pub fn open_purchase(&self, purchase: &PurchaseId) -> Result<(), DriverError> {
        self.click_when_ready(ADVERT_MENU)?;
        self.click_when_ready(ADVERT_LIST)?;
        self.fill(ADVERT_NUMBER_INPUT, purchase.as_str())?;
        self.click_when_ready(ADVERT_SEARCH_BUTTON)?;

        let row = format!("//tr[@data-index={}]", xpath_literal(purchase.as_str()));
        let actions = self.ready(&format!(
            r#"{row}//button[@jhitranslate="eProcGatewayApp.advert.actions"]"#
        ))?;
        // The actions toggle sits under a sticky table header.
        self.driver.force_click(&actions)?;
        self.click_when_ready(&format!(
            r#"{row}//a[@jhitranslate="eProcGatewayApp.advert.goAdvert"]"#
        ))
    }

    /// Document links of the open purchase page; empty when the page lists none.
    pub fn document_links(&self) -> Result<Vec<DocumentLink>, DriverError> {
        let elements = self
            .driver
            .find_all(&Locator::xpath(DOCUMENT_LINKS), self.element_timeout)?;

        elements
            .into_iter()
            .map(|element| {
                let label = self.driver.read_text(&element)?;
                Ok(DocumentLink {
                    element,
                    label: label.trim().to_string(),
                })
            })
            .collect()
    }

    fn ready(&self, xpath: &str) -> Result<ElementHandle, DriverError> {
        self.driver.wait_for(
            &Locator::xpath(xpath),
            WaitCondition::Clickable,
            self.element_timeout,
        )
    }

    fn click_when_ready(&self, xpath: &str) -> Result<(), DriverError> {
        let element = self.ready(xpath)?;
        self.driver.click(&element)
    }

    fn fill(&self, xpath: &str, text: &str) -> Result<(), DriverError> {
        let element = self.ready(xpath)?;
        self.driver.clear(&element)?;
        self.driver.type_text(&element, text)
    }
}

/// Quotes `value` as an XPath 1.0 string literal.
fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }

    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

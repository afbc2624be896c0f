use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::{Client, Method};
use serde_json::{json, Value};
use tokio::runtime::Runtime;
use tracing::debug;

use super::{DriverError, ElementHandle, Locator, PortalDriver, WaitCondition};

/// W3C key under which element references are exchanged.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const WAIT_STEP: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub webdriver_url: String,
    /// Directory the browser saves downloads into without prompting.
    pub download_dir: PathBuf,
    pub headless: bool,
}

/// Chrome session behind a running `chromedriver`, exposed through the
/// synchronous [`PortalDriver`] API.
pub struct WebDriverSession {
    client: Client,
    runtime: Runtime,
    session_url: String,
}

impl WebDriverSession {
    pub fn start(options: &SessionOptions) -> Result<Self, DriverError> {
        let runtime = Runtime::new().map_err(|err| DriverError::Runtime(err.to_string()))?;
        let client = Client::new();
        let base = options.webdriver_url.trim_end_matches('/').to_string();

        let value = runtime.block_on(send(
            &client,
            Method::POST,
            &format!("{base}/session"),
            Some(capabilities(options)),
            "new session",
        ))?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol("new session response lacks sessionId".into()))?;

        debug!(session = session_id, "webdriver session started");
        Ok(Self {
            session_url: format!("{base}/session/{session_id}"),
            client,
            runtime,
        })
    }

    fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        command: &str,
    ) -> Result<Value, DriverError> {
        let url = format!("{}{}", self.session_url, path);
        self.runtime
            .block_on(send(&self.client, method, &url, body, command))
    }

    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError> {
        let value = self.command(
            Method::POST,
            "/elements",
            Some(json!({ "using": "xpath", "value": locator.expression() })),
            "find elements",
        )?;

        let items = value
            .as_array()
            .ok_or_else(|| DriverError::Protocol("find elements did not return a list".into()))?;
        items
            .iter()
            .map(|item| {
                item.get(ELEMENT_KEY)
                    .and_then(Value::as_str)
                    .map(|id| ElementHandle(id.to_string()))
                    .ok_or_else(|| DriverError::Protocol("element reference without id".into()))
            })
            .collect()
    }

    fn element_flag(&self, element: &ElementHandle, property: &str) -> Result<bool, DriverError> {
        let value = self.command(
            Method::GET,
            &format!("/element/{}/{property}", element.0),
            None,
            property,
        )?;
        value
            .as_bool()
            .ok_or_else(|| DriverError::Protocol(format!("{property} is not a boolean")))
    }

    fn is_clickable(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        let clickable = self.element_flag(element, "displayed").and_then(|displayed| {
            if displayed {
                self.element_flag(element, "enabled")
            } else {
                Ok(false)
            }
        });
        match clickable {
            Ok(flag) => Ok(flag),
            // The page re-rendered between lookup and check.
            Err(err) if is_error_code(&err, "stale element reference") => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn element_command(
        &self,
        element: &ElementHandle,
        action: &str,
        body: Value,
    ) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            &format!("/element/{}/{action}", element.0),
            Some(body),
            action,
        )
        .map(|_| ())
    }
}

impl std::fmt::Debug for WebDriverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriverSession")
            .field("session_url", &self.session_url)
            .finish_non_exhaustive()
    }
}

impl PortalDriver for WebDriverSession {
    fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })), "navigate")
            .map(|_| ())
    }

    fn wait_for(
        &self,
        locator: &Locator,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError> {
        let started = Instant::now();
        loop {
            for element in self.find_elements(locator)? {
                let ready = match condition {
                    WaitCondition::Present => true,
                    WaitCondition::Clickable => self.is_clickable(&element)?,
                };
                if ready {
                    return Ok(element);
                }
            }

            if started.elapsed() >= timeout {
                return Err(DriverError::Timeout {
                    locator: locator.to_string(),
                    waited: started.elapsed(),
                });
            }
            thread::sleep(WAIT_STEP);
        }
    }

    fn find_all(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        let started = Instant::now();
        loop {
            let elements = self.find_elements(locator)?;
            if !elements.is_empty() || started.elapsed() >= timeout {
                return Ok(elements);
            }
            thread::sleep(WAIT_STEP);
        }
    }

    fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.element_command(element, "click", json!({}))
    }

    fn force_click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({
                "script": "arguments[0].click();",
                "args": [{ ELEMENT_KEY: element.0 }],
            })),
            "execute script",
        )
        .map(|_| ())
    }

    fn clear(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.element_command(element, "clear", json!({}))
    }

    fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.element_command(element, "value", json!({ "text": text }))
    }

    fn read_text(&self, element: &ElementHandle) -> Result<String, DriverError> {
        let value = self.command(
            Method::GET,
            &format!("/element/{}/text", element.0),
            None,
            "text",
        )?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::Protocol("element text is not a string".into()))
    }

    fn dismiss_alert(&self, timeout: Duration) -> Result<(), DriverError> {
        let started = Instant::now();
        loop {
            match self.command(Method::POST, "/alert/dismiss", Some(json!({})), "dismiss alert") {
                Ok(_) => return Ok(()),
                Err(err) if is_error_code(&err, "no such alert") => {
                    if started.elapsed() >= timeout {
                        return Err(DriverError::Timeout {
                            locator: "browser alert".to_string(),
                            waited: started.elapsed(),
                        });
                    }
                    thread::sleep(WAIT_STEP);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn close(&self) -> Result<(), DriverError> {
        self.command(Method::DELETE, "", None, "delete session")
            .map(|_| ())
    }
}

fn capabilities(options: &SessionOptions) -> Value {
    let mut args = vec!["--window-size=1920,1080".to_string()];
    if options.headless {
        args.push("--headless=new".to_string());
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": {
                    "args": args,
                    "prefs": {
                        "download.default_directory": options.download_dir.to_string_lossy(),
                        "download.prompt_for_download": false,
                        "download.directory_upgrade": true,
                        "safebrowsing_for_trusted_sources_enabled": false,
                        "safebrowsing.enabled": false,
                    },
                },
            },
        },
    })
}

async fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
    command: &str,
) -> Result<Value, DriverError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .map_err(|err| DriverError::Transport(err.to_string()))?;
    let status = response.status();
    let mut payload: Value = response
        .json()
        .await
        .map_err(|err| DriverError::Protocol(format!("{command}: {err}")))?;
    let value = payload.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Err(DriverError::Command {
        command: command.to_string(),
        error: field("error"),
        message: field("message"),
    })
}

fn is_error_code(err: &DriverError, code: &str) -> bool {
    matches!(err, DriverError::Command { error, .. } if error == code)
}

//! W3C WebDriver session over HTTP (chromedriver, geckodriver, Selenium).
//! Gated behind the "webdriver" feature flag.

use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use super::{Browser, DriverError, ElementRef, Selector, Viewport};

/// Key W3C uses for element references in JSON payloads.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Configuration for a WebDriver session.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// WebDriver server, e.g. `http://localhost:4444`.
    pub server_url: String,
    /// `chrome` or `firefox`.
    pub browser_name: String,
    pub headless: bool,
    /// Extra command-line arguments for the browser binary.
    pub args: Vec<String>,
    /// Window size as (width, height); `None` keeps the browser default.
    pub window: Option<(u32, u32)>,
    /// HTTP timeout per WebDriver command, in seconds.
    pub timeout_secs: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:4444".to_string(),
            browser_name: "chrome".to_string(),
            headless: false,
            args: Vec::new(),
            window: Some((1470, 854)),
            timeout_secs: 60,
        }
    }
}

impl WebDriverConfig {
    fn capabilities(&self) -> Value {
        let mut args = self.args.clone();
        match self.browser_name.as_str() {
            "firefox" => {
                if self.headless {
                    args.push("-headless".to_string());
                }
                json!({ "browserName": "firefox", "moz:firefoxOptions": { "args": args } })
            }
            name => {
                if self.headless {
                    args.push("--headless=new".to_string());
                }
                json!({ "browserName": name, "goog:chromeOptions": { "args": args } })
            }
        }
    }
}

/// A live WebDriver session. Deleted on drop.
pub struct WebDriverSession {
    client: Client,
    base_url: Url,
    session_id: String,
    config: WebDriverConfig,
    closed: bool,
}

impl WebDriverSession {
    pub fn start(config: WebDriverConfig) -> Result<Self, DriverError> {
        let base_url = Url::parse(config.server_url.trim_end_matches('/'))
            .map_err(|e| DriverError::Network(format!("invalid WebDriver URL: {e}")))?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DriverError::Network(e.to_string()))?;

        let mut session = Self {
            client,
            base_url,
            session_id: String::new(),
            config,
            closed: true,
        };
        session.open()?;
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn open(&mut self) -> Result<(), DriverError> {
        let body = json!({ "capabilities": { "alwaysMatch": self.config.capabilities() } });
        let url = self.url("session");
        let value = self.send(Method::POST, &url, Some(body))?;
        self.session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::InvalidResponse("missing sessionId".to_string()))?
            .to_string();
        self.closed = false;
        info!(session = %self.session_id, browser = %self.config.browser_name, "WebDriver session started");

        if let Some((width, height)) = self.config.window {
            self.command(Method::POST, "window/rect", Some(json!({ "width": width, "height": height })))?;
        }
        Ok(())
    }

    /// End the session explicitly.
    pub fn quit(mut self) -> Result<(), DriverError> {
        self.close()
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let url = self.url(&format!("session/{}", self.session_id));
        self.send(Method::DELETE, &url, None).map(|_| ())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DriverError> {
        let url = self.url(&format!("session/{}/{}", self.session_id, path));
        self.send(method, &url, body)
    }

    fn send(&self, method: Method, url: &str, body: Option<Value>) -> Result<Value, DriverError> {
        debug!(%method, url, "WebDriver command");
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(&body);
        } else if method == Method::POST {
            request = request.json(&json!({}));
        }
        let response = request
            .send()
            .map_err(|e| DriverError::Network(e.to_string()))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .map_err(|e| DriverError::InvalidResponse(e.to_string()))?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(protocol_error(&value, status.as_u16()));
        }
        Ok(value)
    }

    fn element_path(element: &ElementRef, suffix: &str) -> String {
        format!("element/{}/{}", element.id(), suffix)
    }
}

fn protocol_error(value: &Value, status: u16) -> DriverError {
    let code = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {status}"));
    match code.as_str() {
        "no such element" => DriverError::NoSuchElement(message),
        "stale element reference" => DriverError::StaleElement(message),
        _ => DriverError::Protocol { code, message },
    }
}

fn locator_body(selector: &Selector) -> Value {
    match selector {
        Selector::Css(css) => json!({ "using": "css selector", "value": css }),
        Selector::XPath(xpath) => json!({ "using": "xpath", "value": xpath }),
    }
}

fn element_refs(value: Value) -> Result<Vec<ElementRef>, DriverError> {
    let items = value
        .as_array()
        .ok_or_else(|| DriverError::InvalidResponse("expected element array".to_string()))?;
    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(ElementRef::new)
                .ok_or_else(|| DriverError::InvalidResponse("element reference missing".to_string()))
        })
        .collect()
}

impl Browser for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .map(|_| ())
    }

    fn refresh(&mut self) -> Result<(), DriverError> {
        self.command(Method::POST, "refresh", None).map(|_| ())
    }

    fn restart(&mut self) -> Result<(), DriverError> {
        let current = self
            .command(Method::GET, "url", None)?
            .as_str()
            .map(String::from);
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close WebDriver session before restart");
        }
        self.open()?;
        if let Some(url) = current {
            self.navigate(&url)?;
        }
        Ok(())
    }

    fn title(&mut self) -> Result<String, DriverError> {
        Ok(self
            .command(Method::GET, "title", None)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn viewport(&mut self) -> Result<Viewport, DriverError> {
        let value = self.execute("return [window.innerWidth, window.innerHeight];", Vec::new())?;
        let width = value.get(0).and_then(Value::as_f64);
        let height = value.get(1).and_then(Value::as_f64);
        match (width, height) {
            (Some(width), Some(height)) => Ok(Viewport { width, height }),
            _ => Err(DriverError::InvalidResponse(format!("viewport size: {value}"))),
        }
    }

    fn scroll_by(&mut self, dx: i64, dy: i64) -> Result<(), DriverError> {
        self.execute("window.scrollBy(arguments[0], arguments[1]);", vec![json!(dx), json!(dy)])
            .map(|_| ())
    }

    fn find_all(
        &mut self,
        scope: Option<&ElementRef>,
        selector: &Selector,
    ) -> Result<Vec<ElementRef>, DriverError> {
        let path = match scope {
            Some(element) => Self::element_path(element, "elements"),
            None => "elements".to_string(),
        };
        let value = self.command(Method::POST, &path, Some(locator_body(selector)))?;
        element_refs(value)
    }

    fn text(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        Ok(self
            .command(Method::GET, &Self::element_path(element, "text"), None)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let path = Self::element_path(element, &format!("attribute/{name}"));
        Ok(self
            .command(Method::GET, &path, None)?
            .as_str()
            .map(String::from))
    }

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, DriverError> {
        Ok(self
            .command(Method::GET, &Self::element_path(element, "displayed"), None)?
            .as_bool()
            .unwrap_or(false))
    }

    fn outer_html(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        let path = Self::element_path(element, "property/outerHTML");
        Ok(self
            .command(Method::GET, &path, None)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.command(Method::POST, &Self::element_path(element, "click"), None)
            .map(|_| ())
    }

    fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to delete WebDriver session");
        }
    }
}

//! Shared test doubles: a scriptable recording backend and a canned-HTML
//! HTTP fixture server.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tripcheck::config::{BackendKind, HttpOptions, ShimConfig, WebDriverOptions};
use tripcheck::error::{Result, ShimError};
use tripcheck::shim::{Browser, BrowserActor, SessionCookie, SessionData};

/// In-memory backend that records every call it receives. Failure behavior
/// is scripted per selector before the browser is handed to the actor.
pub struct RecordingBrowser {
    kind: BackendKind,
    calls: Arc<Mutex<Vec<String>>>,
    missing: HashSet<String>,
    poisoned: HashSet<String>,
    counts: HashMap<String, usize>,
    texts: HashMap<String, String>,
    stale_clicks: AtomicU32,
    cookies: Mutex<HashMap<String, String>>,
    url: Mutex<String>,
}

impl RecordingBrowser {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            calls: Arc::new(Mutex::new(Vec::new())),
            missing: HashSet::new(),
            poisoned: HashSet::new(),
            counts: HashMap::new(),
            texts: HashMap::new(),
            stale_clicks: AtomicU32::new(0),
            cookies: Mutex::new(HashMap::new()),
            url: Mutex::new("/".to_string()),
        }
    }

    /// `see_element` on this selector fails the assertion.
    pub fn missing(mut self, selector: &str) -> Self {
        self.missing.insert(selector.to_string());
        self
    }

    /// `see_element` on this selector fails with a selector error.
    pub fn poisoned(mut self, selector: &str) -> Self {
        self.poisoned.insert(selector.to_string());
        self
    }

    /// `count_elements` answer for this selector.
    pub fn counting(mut self, selector: &str, count: usize) -> Self {
        self.counts.insert(selector.to_string(), count);
        self
    }

    /// `grab_text_from` / `grab_value_from` answer for this selector.
    pub fn text_at(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    /// The next `n` clicks fail with a stale element reference.
    pub fn stale_clicks(mut self, n: u32) -> Self {
        self.stale_clicks = AtomicU32::new(n);
        self
    }

    /// Handle on the call log, kept by the test before the browser moves
    /// into the actor.
    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Browser for RecordingBrowser {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn am_on_page(&self, path: &str) -> Result<()> {
        self.record(format!("am_on_page({path})"));
        *self.url.lock().unwrap() = path.to_string();
        Ok(())
    }

    async fn am_on_subdomain(&self, subdomain: &str) -> Result<()> {
        self.record(format!("am_on_subdomain({subdomain})"));
        Ok(())
    }

    async fn am_on_url(&self, url: &str) -> Result<()> {
        self.record(format!("am_on_url({url})"));
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn attach_file(&self, field: &str, filename: &str) -> Result<()> {
        self.record(format!("attach_file({field}, {filename})"));
        Ok(())
    }

    async fn check_option(&self, option: &str) -> Result<()> {
        self.record(format!("check_option({option})"));
        Ok(())
    }

    async fn click(&self, target: &str, context: Option<&str>) -> Result<()> {
        match context {
            Some(ctx) => self.record(format!("click({target}, {ctx})")),
            None => self.record(format!("click({target})")),
        }
        let remaining = self.stale_clicks.load(Ordering::SeqCst);
        if remaining > 0 {
            self.stale_clicks.store(remaining - 1, Ordering::SeqCst);
            return Err(ShimError::StaleElement(
                "click target left the DOM".to_string(),
            ));
        }
        Ok(())
    }

    async fn fill_field(&self, field: &str, value: &str) -> Result<()> {
        self.record(format!("fill_field({field}, {value})"));
        Ok(())
    }

    async fn select_option(&self, select: &str, option: &str) -> Result<()> {
        self.record(format!("select_option({select}, {option})"));
        Ok(())
    }

    async fn uncheck_option(&self, option: &str) -> Result<()> {
        self.record(format!("uncheck_option({option})"));
        Ok(())
    }

    async fn see(&self, text: &str, selector: Option<&str>) -> Result<()> {
        self.record(format!("see({text}, {selector:?})"));
        Ok(())
    }

    async fn dont_see(&self, text: &str, selector: Option<&str>) -> Result<()> {
        self.record(format!("dont_see({text}, {selector:?})"));
        Ok(())
    }

    async fn see_element(&self, selector: &str) -> Result<()> {
        self.record(format!("see_element({selector})"));
        if self.poisoned.contains(selector) {
            return Err(ShimError::Selector(format!("'{selector}': unparseable")));
        }
        if self.missing.contains(selector) {
            return Err(ShimError::assertion(format!(
                "element '{selector}' not found"
            )));
        }
        Ok(())
    }

    async fn dont_see_element(&self, selector: &str) -> Result<()> {
        self.record(format!("dont_see_element({selector})"));
        Ok(())
    }

    async fn see_link(&self, text: &str, url: Option<&str>) -> Result<()> {
        self.record(format!("see_link({text}, {url:?})"));
        Ok(())
    }

    async fn dont_see_link(&self, text: &str, url: Option<&str>) -> Result<()> {
        self.record(format!("dont_see_link({text}, {url:?})"));
        Ok(())
    }

    async fn see_in_title(&self, title: &str) -> Result<()> {
        self.record(format!("see_in_title({title})"));
        Ok(())
    }

    async fn dont_see_in_title(&self, title: &str) -> Result<()> {
        self.record(format!("dont_see_in_title({title})"));
        Ok(())
    }

    async fn see_in_field(&self, field: &str, value: &str) -> Result<()> {
        self.record(format!("see_in_field({field}, {value})"));
        Ok(())
    }

    async fn dont_see_in_field(&self, field: &str, value: &str) -> Result<()> {
        self.record(format!("dont_see_in_field({field}, {value})"));
        Ok(())
    }

    async fn see_checkbox_is_checked(&self, checkbox: &str) -> Result<()> {
        self.record(format!("see_checkbox_is_checked({checkbox})"));
        Ok(())
    }

    async fn dont_see_checkbox_is_checked(&self, checkbox: &str) -> Result<()> {
        self.record(format!("dont_see_checkbox_is_checked({checkbox})"));
        Ok(())
    }

    async fn see_option_is_selected(&self, select: &str, text: &str) -> Result<()> {
        self.record(format!("see_option_is_selected({select}, {text})"));
        Ok(())
    }

    async fn dont_see_option_is_selected(&self, select: &str, text: &str) -> Result<()> {
        self.record(format!("dont_see_option_is_selected({select}, {text})"));
        Ok(())
    }

    async fn see_number_of_elements(&self, selector: &str, expected: usize) -> Result<()> {
        self.record(format!("see_number_of_elements({selector}, {expected})"));
        Ok(())
    }

    async fn see_in_current_url(&self, fragment: &str) -> Result<()> {
        self.record(format!("see_in_current_url({fragment})"));
        Ok(())
    }

    async fn dont_see_in_current_url(&self, fragment: &str) -> Result<()> {
        self.record(format!("dont_see_in_current_url({fragment})"));
        Ok(())
    }

    async fn see_current_url_equals(&self, uri: &str) -> Result<()> {
        self.record(format!("see_current_url_equals({uri})"));
        Ok(())
    }

    async fn dont_see_current_url_equals(&self, uri: &str) -> Result<()> {
        self.record(format!("dont_see_current_url_equals({uri})"));
        Ok(())
    }

    async fn see_current_url_matches(&self, pattern: &str) -> Result<()> {
        self.record(format!("see_current_url_matches({pattern})"));
        Ok(())
    }

    async fn dont_see_current_url_matches(&self, pattern: &str) -> Result<()> {
        self.record(format!("dont_see_current_url_matches({pattern})"));
        Ok(())
    }

    async fn grab_from_current_url(&self, pattern: Option<&str>) -> Result<String> {
        self.record(format!("grab_from_current_url({pattern:?})"));
        Ok(self.url.lock().unwrap().clone())
    }

    async fn grab_text_from(&self, selector: &str) -> Result<String> {
        self.record(format!("grab_text_from({selector})"));
        self.texts
            .get(selector)
            .cloned()
            .ok_or_else(|| ShimError::ElementNotFound(selector.to_string()))
    }

    async fn grab_value_from(&self, field: &str) -> Result<String> {
        self.record(format!("grab_value_from({field})"));
        self.texts
            .get(field)
            .cloned()
            .ok_or_else(|| ShimError::ElementNotFound(field.to_string()))
    }

    async fn grab_attribute_from(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>> {
        self.record(format!("grab_attribute_from({selector}, {attribute})"));
        Ok(None)
    }

    async fn set_cookie(&self, name: &str, value: &str) -> Result<()> {
        self.record(format!("set_cookie({name}, {value})"));
        self.cookies
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn grab_cookie(&self, name: &str) -> Result<Option<String>> {
        self.record(format!("grab_cookie({name})"));
        Ok(self.cookies.lock().unwrap().get(name).cloned())
    }

    async fn see_cookie(&self, name: &str) -> Result<()> {
        self.record(format!("see_cookie({name})"));
        if self.cookies.lock().unwrap().contains_key(name) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!("cookie '{name}' is not set")))
        }
    }

    async fn dont_see_cookie(&self, name: &str) -> Result<()> {
        self.record(format!("dont_see_cookie({name})"));
        if self.cookies.lock().unwrap().contains_key(name) {
            Err(ShimError::assertion(format!(
                "cookie '{name}' should not be set"
            )))
        } else {
            Ok(())
        }
    }

    async fn reset_cookie(&self, name: &str) -> Result<()> {
        self.record(format!("reset_cookie({name})"));
        self.cookies.lock().unwrap().remove(name);
        Ok(())
    }

    async fn wait(&self, seconds: u64) -> Result<()> {
        self.record(format!("wait({seconds})"));
        Ok(())
    }

    async fn get_url(&self) -> Result<String> {
        self.record("get_url".to_string());
        Ok(self.url.lock().unwrap().clone())
    }

    async fn initialize_session(&self) -> Result<()> {
        self.record("initialize_session".to_string());
        self.cookies.lock().unwrap().clear();
        *self.url.lock().unwrap() = "/".to_string();
        Ok(())
    }

    async fn load_session_data(&self, data: &SessionData) -> Result<()> {
        self.record("load_session_data".to_string());
        let mut cookies = self.cookies.lock().unwrap();
        cookies.clear();
        for cookie in &data.cookies {
            cookies.insert(cookie.name.clone(), cookie.value.clone());
        }
        if let Some(url) = &data.url {
            *self.url.lock().unwrap() = url.clone();
        }
        Ok(())
    }

    async fn backup_session_data(&self) -> Result<SessionData> {
        self.record("backup_session_data".to_string());
        Ok(SessionData {
            cookies: self
                .cookies
                .lock()
                .unwrap()
                .iter()
                .map(|(name, value)| SessionCookie {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            url: Some(self.url.lock().unwrap().clone()),
        })
    }

    async fn close_session(&self) -> Result<()> {
        self.record("close_session".to_string());
        Ok(())
    }

    // Restricted operations the tests exercise: these record so a gating
    // failure can be told apart from a dispatched call.

    async fn send_ajax_get_request(&self, uri: &str, _params: &[(String, String)]) -> Result<()> {
        self.record(format!("send_ajax_get_request({uri})"));
        Ok(())
    }

    async fn see_response_code_is(&self, code: u16) -> Result<()> {
        self.record(format!("see_response_code_is({code})"));
        Ok(())
    }

    async fn count_elements(&self, selector: &str) -> Result<usize> {
        self.record(format!("count_elements({selector})"));
        Ok(self.counts.get(selector).copied().unwrap_or(0))
    }

    async fn execute_js(&self, script: &str) -> Result<Value> {
        self.record(format!("execute_js({script})"));
        Ok(Value::Null)
    }

    async fn make_screenshot(&self, name: &str) -> Result<()> {
        self.record(format!("make_screenshot({name})"));
        Ok(())
    }

    // Lifecycle hooks record so forwarding is observable.

    async fn initialize(&self) -> Result<()> {
        self.record("initialize".to_string());
        Ok(())
    }

    async fn cleanup(&self) -> Result<()> {
        self.record("cleanup".to_string());
        Ok(())
    }

    async fn before_suite(&self) -> Result<()> {
        self.record("before_suite".to_string());
        Ok(())
    }

    async fn after_suite(&self) -> Result<()> {
        self.record("after_suite".to_string());
        Ok(())
    }

    async fn before_step(&self, step: &str) -> Result<()> {
        self.record(format!("before_step({step})"));
        Ok(())
    }

    async fn after_step(&self, step: &str) -> Result<()> {
        self.record(format!("after_step({step})"));
        Ok(())
    }

    async fn before_test(&self, test: &str) -> Result<()> {
        self.record(format!("before_test({test})"));
        Ok(())
    }

    async fn after_test(&self, test: &str) -> Result<()> {
        self.record(format!("after_test({test})"));
        Ok(())
    }

    async fn on_failure(&self, test: &str) -> Result<()> {
        self.record(format!("on_failure({test})"));
        Ok(())
    }
}

/// Hand-built configuration for actors wired to a test double.
pub fn test_config(kind: BackendKind) -> ShimConfig {
    ShimConfig {
        module: kind,
        url: "http://site.test".to_string(),
        http: HttpOptions {
            url: "http://site.test".to_string(),
            timeout: Duration::from_secs(5),
            data_dir: PathBuf::from("tests/data"),
        },
        webdriver: WebDriverOptions {
            url: "http://site.test".to_string(),
            server_url: "http://localhost:4444".to_string(),
            browser: "firefox".to_string(),
            window_size: None,
            headless: true,
            screenshots_dir: PathBuf::from("screenshots"),
            data_dir: PathBuf::from("tests/data"),
        },
    }
}

pub fn actor_over(browser: RecordingBrowser) -> BrowserActor {
    let config = test_config(browser.kind());
    BrowserActor::from_parts(config, Box::new(browser))
}

pub fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Canned response served by [`FixtureSite`].
pub struct StubResponse {
    status: u16,
    body: String,
    set_cookie: Option<String>,
    location: Option<String>,
}

impl StubResponse {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            set_cookie: None,
            location: None,
        }
    }

    pub fn not_found(body: impl Into<String>) -> Self {
        Self {
            status: 404,
            body: body.into(),
            set_cookie: None,
            location: None,
        }
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            status: 302,
            body: String::new(),
            set_cookie: None,
            location: Some(target.into()),
        }
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.set_cookie = Some(cookie.into());
        self
    }

    fn render(&self) -> String {
        let reason = match self.status {
            200 => "OK",
            302 => "Found",
            404 => "Not Found",
            _ => "OK",
        };
        let mut head = format!(
            "HTTP/1.1 {} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            self.body.len(),
        );
        if let Some(cookie) = &self.set_cookie {
            head.push_str(&format!("Set-Cookie: {cookie}\r\n"));
        }
        if let Some(location) = &self.location {
            head.push_str(&format!("Location: {location}\r\n"));
        }
        format!("{head}\r\n{}", self.body)
    }
}

/// Serves canned HTML over a real socket so the HTTP backend is exercised
/// end to end. Routes are (substring, response) pairs matched against the
/// raw request target in registration order; register the most specific
/// substring first.
pub struct FixtureSite {
    addr: std::net::SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl FixtureSite {
    pub async fn serve(routes: Vec<(&'static str, StubResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture");
        let addr = listener.local_addr().expect("fixture addr");
        let routes: Vec<(String, String)> = routes
            .into_iter()
            .map(|(needle, response)| (needle.to_string(), response.render()))
            .collect();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let Some(target) = read_request_target(&mut socket).await else {
                        return;
                    };
                    let reply = routes
                        .iter()
                        .find(|(needle, _)| target.contains(needle.as_str()))
                        .map(|(_, rendered)| rendered.clone())
                        .unwrap_or_else(|| StubResponse::not_found("no such fixture route").render());
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for FixtureSite {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Reads one request (headers plus any Content-Length body) and returns the
/// request target.
async fn read_request_target(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let mut remaining = content_length.saturating_sub(buf.len() - header_end);
    while remaining > 0 {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        remaining = remaining.saturating_sub(n);
    }

    head.lines()
        .next()?
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

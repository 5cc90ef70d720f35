//! Remote-browser automation over the WebDriver protocol.
//!
//! Drives a real browser through a Selenium-compatible server using
//! `thirtyfour`. Everything here talks to a live session, so elements can go
//! stale between lookup and use; callers run these operations through the
//! command runner, which retries on stale element references.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use thirtyfour::components::SelectElement;
use thirtyfour::prelude::*;
use thirtyfour::{Cookie, Key, WindowHandle};
use tokio::sync::Mutex;

use crate::config::{BackendKind, WebDriverOptions};
use crate::error::{Result, ShimError};
use crate::shim::backend::{
    Browser, ElementPredicate, SessionCookie, SessionData, WebDriverCall,
};
use crate::shim::{compile_pattern, grab_from_uri, relative_uri, rewrite_subdomain, scope_suffix};

/// How often wait-style operations re-check their condition.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Hard ceiling on `wait`; longer pauses are almost always a scenario bug.
const MAX_WAIT_SECS: u64 = 1000;

/// Automation Instance backed by a remote WebDriver session.
pub struct WebDriverBrowser {
    driver: WebDriver,
    options: WebDriverOptions,
    /// Base URL that relative navigation resolves against.
    base: Mutex<Url>,
    /// Handle of the window the session started in.
    original_window: WindowHandle,
}

/// Search root for element lookups: the whole page or one container element.
enum Scope<'a> {
    Page(&'a WebDriver),
    Within(WebElement),
}

impl Scope<'_> {
    async fn find(&self, by: By) -> WebDriverResult<WebElement> {
        match self {
            Scope::Page(driver) => driver.find(by).await,
            Scope::Within(element) => element.find(by).await,
        }
    }

    async fn find_all(&self, by: By) -> WebDriverResult<Vec<WebElement>> {
        match self {
            Scope::Page(driver) => driver.find_all(by).await,
            Scope::Within(element) => element.find_all(by).await,
        }
    }
}

impl WebDriverBrowser {
    /// Connects to the WebDriver server named in `options` and prepares the
    /// session window.
    pub async fn connect(options: WebDriverOptions) -> Result<Self> {
        let base = Url::parse(&options.url).map_err(|e| {
            ShimError::Configuration(format!("invalid url '{}': {e}", options.url))
        })?;

        let driver = match options.browser.as_str() {
            "firefox" => {
                let mut caps = DesiredCapabilities::firefox();
                if options.headless {
                    caps.set_headless()?;
                }
                WebDriver::new(&options.server_url, caps).await?
            }
            "chrome" => {
                let mut caps = DesiredCapabilities::chrome();
                if options.headless {
                    caps.set_headless()?;
                }
                WebDriver::new(&options.server_url, caps).await?
            }
            other => {
                return Err(ShimError::Configuration(format!(
                    "unknown browser '{other}': expected 'firefox' or 'chrome'"
                )))
            }
        };

        match options.window_size.as_deref() {
            Some("maximize") | Some("maximized") => driver.maximize_window().await?,
            Some(size) => {
                let (width, height) = parse_window_size(size)?;
                driver.set_window_rect(0, 0, width.into(), height.into()).await?;
            }
            None => {}
        }

        let original_window = driver.window().await?;
        tracing::info!(
            server = %options.server_url,
            browser = %options.browser,
            headless = options.headless,
            "webdriver session established"
        );

        Ok(Self {
            driver,
            options,
            base: Mutex::new(base),
            original_window,
        })
    }

    /// Locates a form control: CSS selector first, then `name`, then `id`.
    async fn find_field(&self, locator: &str) -> Result<WebElement> {
        if let Ok(element) = self.driver.find(By::Css(locator)).await {
            return Ok(element);
        }
        if let Ok(element) = self.driver.find(By::Name(locator)).await {
            return Ok(element);
        }
        self.driver
            .find(By::Id(locator))
            .await
            .map_err(|_| ShimError::ElementNotFound(format!("no field matching '{locator}'")))
    }

    /// Locates a click target: exact link text, then button label, then
    /// submit/button input value, then CSS selector.
    async fn find_clickable(&self, target: &str, context: Option<&str>) -> Result<WebElement> {
        let scope = match context {
            Some(ctx) => Scope::Within(self.driver.find(By::Css(ctx)).await?),
            None => Scope::Page(&self.driver),
        };
        if let Ok(element) = scope.find(By::LinkText(target)).await {
            return Ok(element);
        }
        for button in scope.find_all(By::Tag("button")).await? {
            if button.text().await?.trim() == target {
                return Ok(button);
            }
        }
        for input in scope
            .find_all(By::Css("input[type='submit'], input[type='button']"))
            .await?
        {
            if input.value().await?.as_deref().map(str::trim) == Some(target) {
                return Ok(input);
            }
        }
        scope.find(By::Css(target)).await.map_err(|_| {
            ShimError::ElementNotFound(format!(
                "no clickable '{target}'{}",
                scope_suffix(context)
            ))
        })
    }

    /// Visible text of the page body, or of all elements matching `selector`.
    async fn scoped_text(&self, selector: Option<&str>) -> Result<String> {
        match selector {
            None => {
                let body = self.driver.find(By::Tag("body")).await?;
                Ok(body.text().await?)
            }
            Some(sel) => {
                let mut chunks = Vec::new();
                for element in self.driver.find_all(By::Css(sel)).await? {
                    chunks.push(element.text().await?);
                }
                Ok(chunks.join(" "))
            }
        }
    }

    async fn current_relative_uri(&self) -> Result<String> {
        let url = self.driver.current_url().await?;
        Ok(relative_uri(&url))
    }

    /// Visible texts of the selected options of a select field.
    async fn selected_option_texts(&self, select: &str) -> Result<Vec<String>> {
        let field = self.find_field(select).await?;
        let mut texts = Vec::new();
        for option in field.find_all(By::Tag("option")).await? {
            if option.is_selected().await? {
                texts.push(option.text().await?.trim().to_string());
            }
        }
        Ok(texts)
    }

    /// Links whose text contains `text`, optionally filtered by href fragment.
    async fn count_links(&self, text: &str, url: Option<&str>) -> Result<usize> {
        let links = self.driver.find_all(By::PartialLinkText(text)).await?;
        match url {
            None => Ok(links.len()),
            Some(fragment) => {
                let mut matched = 0;
                for link in links {
                    let href = link.attr("href").await?.unwrap_or_default();
                    if href.contains(fragment) {
                        matched += 1;
                    }
                }
                Ok(matched)
            }
        }
    }

    /// Re-checks `check` every [`POLL_INTERVAL`] until it holds or
    /// `timeout_secs` elapse.
    async fn poll_until<F, Fut>(&self, timeout_secs: u64, what: &str, mut check: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<bool>>,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);
        loop {
            if check().await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ShimError::Timeout(format!("{what} after {timeout_secs}s")));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn capture_screenshot(&self, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.options.screenshots_dir)?;
        let path = self.options.screenshots_dir.join(format!("{name}.png"));
        let png = self.driver.screenshot_as_png().await?;
        std::fs::write(&path, png)?;
        tracing::info!(path = %path.display(), "screenshot saved");
        Ok(path)
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    fn kind(&self) -> BackendKind {
        BackendKind::RemoteDriver
    }

    async fn am_on_page(&self, path: &str) -> Result<()> {
        let url = {
            let base = self.base.lock().await;
            base.join(path).map_err(|e| {
                ShimError::Configuration(format!("cannot resolve page '{path}': {e}"))
            })?
        };
        self.driver.goto(url.as_str()).await?;
        Ok(())
    }

    async fn am_on_subdomain(&self, subdomain: &str) -> Result<()> {
        let mut base = self.base.lock().await;
        *base = rewrite_subdomain(&base, subdomain)?;
        Ok(())
    }

    async fn am_on_url(&self, url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|e| ShimError::Configuration(format!("invalid url '{url}': {e}")))?;
        let mut origin = parsed.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        {
            let mut base = self.base.lock().await;
            *base = origin;
        }
        self.driver.goto(parsed.as_str()).await?;
        Ok(())
    }

    async fn attach_file(&self, field: &str, filename: &str) -> Result<()> {
        let path = self.options.data_dir.join(filename);
        let path = path.canonicalize().map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("test data file '{}' does not exist", path.display()),
            )
        })?;
        let element = self.find_field(field).await?;
        element.send_keys(path.to_string_lossy().to_string()).await?;
        Ok(())
    }

    async fn check_option(&self, option: &str) -> Result<()> {
        let element = self.find_field(option).await?;
        if !element.is_selected().await? {
            element.click().await?;
        }
        Ok(())
    }

    async fn click(&self, target: &str, context: Option<&str>) -> Result<()> {
        let element = self.find_clickable(target, context).await?;
        element.click().await?;
        Ok(())
    }

    async fn fill_field(&self, field: &str, value: &str) -> Result<()> {
        let element = self.find_field(field).await?;
        element.clear().await?;
        element.send_keys(value).await?;
        Ok(())
    }

    async fn select_option(&self, select: &str, option: &str) -> Result<()> {
        let element = self.find_field(select).await?;
        let control = SelectElement::new(&element).await?;
        if control.select_by_exact_text(option).await.is_err() {
            control.select_by_value(option).await?;
        }
        Ok(())
    }

    async fn uncheck_option(&self, option: &str) -> Result<()> {
        let element = self.find_field(option).await?;
        if element.is_selected().await? {
            element.click().await?;
        }
        Ok(())
    }

    async fn see(&self, text: &str, selector: Option<&str>) -> Result<()> {
        let haystack = self.scoped_text(selector).await?;
        if haystack.contains(text) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "expected to see '{text}'{}",
                scope_suffix(selector)
            )))
        }
    }

    async fn dont_see(&self, text: &str, selector: Option<&str>) -> Result<()> {
        let haystack = self.scoped_text(selector).await?;
        if haystack.contains(text) {
            Err(ShimError::assertion(format!(
                "did not expect to see '{text}'{}",
                scope_suffix(selector)
            )))
        } else {
            Ok(())
        }
    }

    async fn see_element(&self, selector: &str) -> Result<()> {
        for element in self.driver.find_all(By::Css(selector)).await? {
            if element.is_displayed().await? {
                return Ok(());
            }
        }
        Err(ShimError::assertion(format!(
            "element '{selector}' not found"
        )))
    }

    async fn dont_see_element(&self, selector: &str) -> Result<()> {
        for element in self.driver.find_all(By::Css(selector)).await? {
            if element.is_displayed().await? {
                return Err(ShimError::assertion(format!(
                    "element '{selector}' should not be present"
                )));
            }
        }
        Ok(())
    }

    async fn see_link(&self, text: &str, url: Option<&str>) -> Result<()> {
        if self.count_links(text, url).await? > 0 {
            Ok(())
        } else {
            Err(ShimError::assertion(format!("link '{text}' not found")))
        }
    }

    async fn dont_see_link(&self, text: &str, url: Option<&str>) -> Result<()> {
        if self.count_links(text, url).await? > 0 {
            Err(ShimError::assertion(format!(
                "link '{text}' should not be present"
            )))
        } else {
            Ok(())
        }
    }

    async fn see_in_title(&self, title: &str) -> Result<()> {
        let current = self.driver.title().await?;
        if current.contains(title) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "expected '{title}' in title '{current}'"
            )))
        }
    }

    async fn dont_see_in_title(&self, title: &str) -> Result<()> {
        let current = self.driver.title().await?;
        if current.contains(title) {
            Err(ShimError::assertion(format!(
                "did not expect '{title}' in title '{current}'"
            )))
        } else {
            Ok(())
        }
    }

    async fn see_in_field(&self, field: &str, value: &str) -> Result<()> {
        let element = self.find_field(field).await?;
        let current = element.value().await?.unwrap_or_default();
        if current == value {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "field '{field}' holds '{current}', expected '{value}'"
            )))
        }
    }

    async fn dont_see_in_field(&self, field: &str, value: &str) -> Result<()> {
        let element = self.find_field(field).await?;
        let current = element.value().await?.unwrap_or_default();
        if current == value {
            Err(ShimError::assertion(format!(
                "field '{field}' should not hold '{value}'"
            )))
        } else {
            Ok(())
        }
    }

    async fn see_checkbox_is_checked(&self, checkbox: &str) -> Result<()> {
        let element = self.find_field(checkbox).await?;
        if element.is_selected().await? {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "checkbox '{checkbox}' is not checked"
            )))
        }
    }

    async fn dont_see_checkbox_is_checked(&self, checkbox: &str) -> Result<()> {
        let element = self.find_field(checkbox).await?;
        if element.is_selected().await? {
            Err(ShimError::assertion(format!(
                "checkbox '{checkbox}' should not be checked"
            )))
        } else {
            Ok(())
        }
    }

    async fn see_option_is_selected(&self, select: &str, text: &str) -> Result<()> {
        let selected = self.selected_option_texts(select).await?;
        if selected.iter().any(|t| t == text) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "option '{text}' is not selected in '{select}'"
            )))
        }
    }

    async fn dont_see_option_is_selected(&self, select: &str, text: &str) -> Result<()> {
        let selected = self.selected_option_texts(select).await?;
        if selected.iter().any(|t| t == text) {
            Err(ShimError::assertion(format!(
                "option '{text}' should not be selected in '{select}'"
            )))
        } else {
            Ok(())
        }
    }

    async fn see_number_of_elements(&self, selector: &str, expected: usize) -> Result<()> {
        let found = self.driver.find_all(By::Css(selector)).await?.len();
        if found == expected {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "expected {expected} elements for '{selector}', found {found}"
            )))
        }
    }

    async fn see_in_current_url(&self, fragment: &str) -> Result<()> {
        let uri = self.current_relative_uri().await?;
        if uri.contains(fragment) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "expected '{fragment}' in current uri '{uri}'"
            )))
        }
    }

    async fn dont_see_in_current_url(&self, fragment: &str) -> Result<()> {
        let uri = self.current_relative_uri().await?;
        if uri.contains(fragment) {
            Err(ShimError::assertion(format!(
                "did not expect '{fragment}' in current uri '{uri}'"
            )))
        } else {
            Ok(())
        }
    }

    async fn see_current_url_equals(&self, expected: &str) -> Result<()> {
        let uri = self.current_relative_uri().await?;
        if uri == expected {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "current uri is '{uri}', expected '{expected}'"
            )))
        }
    }

    async fn dont_see_current_url_equals(&self, unexpected: &str) -> Result<()> {
        let uri = self.current_relative_uri().await?;
        if uri == unexpected {
            Err(ShimError::assertion(format!(
                "current uri should not equal '{unexpected}'"
            )))
        } else {
            Ok(())
        }
    }

    async fn see_current_url_matches(&self, pattern: &str) -> Result<()> {
        let uri = self.current_relative_uri().await?;
        if compile_pattern(pattern)?.is_match(&uri) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "current uri '{uri}' does not match '{pattern}'"
            )))
        }
    }

    async fn dont_see_current_url_matches(&self, pattern: &str) -> Result<()> {
        let uri = self.current_relative_uri().await?;
        if compile_pattern(pattern)?.is_match(&uri) {
            Err(ShimError::assertion(format!(
                "current uri '{uri}' should not match '{pattern}'"
            )))
        } else {
            Ok(())
        }
    }

    async fn grab_from_current_url(&self, pattern: Option<&str>) -> Result<String> {
        let uri = self.current_relative_uri().await?;
        grab_from_uri(&uri, pattern)
    }

    async fn grab_text_from(&self, selector: &str) -> Result<String> {
        let element = self.driver.find(By::Css(selector)).await?;
        Ok(element.text().await?)
    }

    async fn grab_value_from(&self, field: &str) -> Result<String> {
        let element = self.find_field(field).await?;
        Ok(element.value().await?.unwrap_or_default())
    }

    async fn grab_attribute_from(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>> {
        let element = self.driver.find(By::Css(selector)).await?;
        Ok(element.attr(attribute).await?)
    }

    async fn set_cookie(&self, name: &str, value: &str) -> Result<()> {
        self.driver
            .add_cookie(Cookie::new(name.to_string(), value.to_string()))
            .await?;
        Ok(())
    }

    async fn grab_cookie(&self, name: &str) -> Result<Option<String>> {
        let cookies = self.driver.get_all_cookies().await?;
        Ok(cookies
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.value.to_string()))
    }

    async fn see_cookie(&self, name: &str) -> Result<()> {
        if self.grab_cookie(name).await?.is_some() {
            Ok(())
        } else {
            Err(ShimError::assertion(format!("cookie '{name}' is not set")))
        }
    }

    async fn dont_see_cookie(&self, name: &str) -> Result<()> {
        if self.grab_cookie(name).await?.is_some() {
            Err(ShimError::assertion(format!(
                "cookie '{name}' should not be set"
            )))
        } else {
            Ok(())
        }
    }

    async fn reset_cookie(&self, name: &str) -> Result<()> {
        if self.grab_cookie(name).await?.is_some() {
            self.driver.delete_cookie(name).await?;
        }
        Ok(())
    }

    async fn wait(&self, seconds: u64) -> Result<()> {
        if seconds >= MAX_WAIT_SECS {
            return Err(ShimError::Configuration(format!(
                "refusing to wait {seconds}s, use a waitFor operation instead"
            )));
        }
        if seconds > 0 {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
        }
        Ok(())
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.options.url.clone())
    }

    async fn initialize_session(&self) -> Result<()> {
        let base = self.base.lock().await.clone();
        self.driver.goto(base.as_str()).await?;
        self.driver.delete_all_cookies().await?;
        Ok(())
    }

    async fn load_session_data(&self, data: &SessionData) -> Result<()> {
        if let Some(url) = &data.url {
            self.driver.goto(url.as_str()).await?;
        }
        for cookie in &data.cookies {
            self.driver
                .add_cookie(Cookie::new(cookie.name.clone(), cookie.value.clone()))
                .await?;
        }
        Ok(())
    }

    async fn backup_session_data(&self) -> Result<SessionData> {
        let cookies = self
            .driver
            .get_all_cookies()
            .await?
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name.to_string(),
                value: c.value.to_string(),
            })
            .collect();
        let url = Some(self.driver.current_url().await?.to_string());
        Ok(SessionData { cookies, url })
    }

    async fn close_session(&self) -> Result<()> {
        self.driver.clone().quit().await?;
        Ok(())
    }

    async fn accept_popup(&self) -> Result<()> {
        self.driver.accept_alert().await?;
        Ok(())
    }

    async fn cancel_popup(&self) -> Result<()> {
        self.driver.dismiss_alert().await?;
        Ok(())
    }

    async fn see_in_popup(&self, text: &str) -> Result<()> {
        let current = self.driver.get_alert_text().await?;
        if current.contains(text) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "expected '{text}' in popup '{current}'"
            )))
        }
    }

    async fn type_in_popup(&self, keys: &str) -> Result<()> {
        self.driver.send_alert_text(keys).await?;
        Ok(())
    }

    async fn append_field(&self, field: &str, value: &str) -> Result<()> {
        let element = self.find_field(field).await?;
        element.send_keys(value).await?;
        Ok(())
    }

    async fn unselect_option(&self, select: &str, option: &str) -> Result<()> {
        let element = self.find_field(select).await?;
        let control = SelectElement::new(&element).await?;
        if control.deselect_by_exact_text(option).await.is_err() {
            control.deselect_by_value(option).await?;
        }
        Ok(())
    }

    async fn click_with_right_button(&self, selector: &str) -> Result<()> {
        let element = self.driver.find(By::Css(selector)).await?;
        self.driver
            .action_chain()
            .context_click_element(&element)
            .perform()
            .await?;
        Ok(())
    }

    async fn double_click(&self, selector: &str) -> Result<()> {
        let element = self.driver.find(By::Css(selector)).await?;
        self.driver
            .action_chain()
            .double_click_element(&element)
            .perform()
            .await?;
        Ok(())
    }

    async fn drag_and_drop(&self, source: &str, target: &str) -> Result<()> {
        let from = self.driver.find(By::Css(source)).await?;
        let to = self.driver.find(By::Css(target)).await?;
        self.driver
            .action_chain()
            .drag_and_drop_element(&from, &to)
            .perform()
            .await?;
        Ok(())
    }

    async fn move_mouse_over(&self, selector: &str, offset: Option<(i64, i64)>) -> Result<()> {
        let element = self.driver.find(By::Css(selector)).await?;
        let chain = self.driver.action_chain();
        match offset {
            Some((x, y)) => {
                chain
                    .move_to_element_with_offset(&element, x, y)
                    .perform()
                    .await?
            }
            None => chain.move_to_element_center(&element).perform().await?,
        }
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<()> {
        let element = self.find_field(selector).await?;
        element.send_keys(key_sequence(key)).await?;
        Ok(())
    }

    async fn count_elements(&self, selector: &str) -> Result<usize> {
        Ok(self.driver.find_all(By::Css(selector)).await?.len())
    }

    async fn see_element_in_dom(&self, selector: &str) -> Result<()> {
        if self.driver.find_all(By::Css(selector)).await?.is_empty() {
            Err(ShimError::assertion(format!(
                "element '{selector}' not in the DOM"
            )))
        } else {
            Ok(())
        }
    }

    async fn dont_see_element_in_dom(&self, selector: &str) -> Result<()> {
        if self.driver.find_all(By::Css(selector)).await?.is_empty() {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "element '{selector}' should not be in the DOM"
            )))
        }
    }

    async fn see_in_page_source(&self, text: &str) -> Result<()> {
        if self.driver.source().await?.contains(text) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "expected '{text}' in page source"
            )))
        }
    }

    async fn dont_see_in_page_source(&self, text: &str) -> Result<()> {
        if self.driver.source().await?.contains(text) {
            Err(ShimError::assertion(format!(
                "did not expect '{text}' in page source"
            )))
        } else {
            Ok(())
        }
    }

    async fn get_visible_text(&self) -> Result<String> {
        self.scoped_text(None).await
    }

    async fn execute_js(&self, script: &str) -> Result<Value> {
        let ret = self.driver.execute(script, Vec::new()).await?;
        Ok(ret.json().clone())
    }

    async fn execute_in_web_driver(&self, call: &WebDriverCall) -> Result<Value> {
        call(&self.driver).await
    }

    async fn make_screenshot(&self, name: &str) -> Result<()> {
        self.capture_screenshot(name).await?;
        Ok(())
    }

    async fn maximize_window(&self) -> Result<()> {
        self.driver.maximize_window().await?;
        Ok(())
    }

    async fn resize_window(&self, width: u32, height: u32) -> Result<()> {
        self.driver
            .set_window_rect(0, 0, width.into(), height.into())
            .await?;
        Ok(())
    }

    async fn move_back(&self) -> Result<()> {
        self.driver.back().await?;
        Ok(())
    }

    async fn move_forward(&self) -> Result<()> {
        self.driver.forward().await?;
        Ok(())
    }

    async fn reload_page(&self) -> Result<()> {
        self.driver.refresh().await?;
        Ok(())
    }

    async fn switch_to_iframe(&self, locator: Option<&str>) -> Result<()> {
        match locator {
            Some(sel) => {
                let frame = self.driver.find(By::Css(sel)).await?;
                frame.enter_frame().await?;
            }
            None => self.driver.enter_default_frame().await?,
        }
        Ok(())
    }

    async fn switch_to_window(&self, name: Option<&str>) -> Result<()> {
        match name {
            Some(window) => self.driver.switch_to_named_window(window).await?,
            None => {
                self.driver
                    .switch_to_window(self.original_window.clone())
                    .await?
            }
        }
        Ok(())
    }

    async fn pause_execution(&self) -> Result<()> {
        tracing::info!("execution paused, press enter to continue");
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| ())
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(())
    }

    async fn wait_for_element(&self, selector: &str, timeout_secs: u64) -> Result<()> {
        self.poll_until(
            timeout_secs,
            &format!("no element matching '{selector}'"),
            || async { Ok(!self.driver.find_all(By::Css(selector)).await?.is_empty()) },
        )
        .await
    }

    async fn wait_for_element_visible(&self, selector: &str, timeout_secs: u64) -> Result<()> {
        self.poll_until(
            timeout_secs,
            &format!("element '{selector}' still not visible"),
            || async {
                for element in self.driver.find_all(By::Css(selector)).await? {
                    if element.is_displayed().await? {
                        return Ok(true);
                    }
                }
                Ok(false)
            },
        )
        .await
    }

    async fn wait_for_element_not_visible(&self, selector: &str, timeout_secs: u64) -> Result<()> {
        self.poll_until(
            timeout_secs,
            &format!("element '{selector}' still visible"),
            || async {
                for element in self.driver.find_all(By::Css(selector)).await? {
                    if element.is_displayed().await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
        )
        .await
    }

    async fn wait_for_element_change(
        &self,
        selector: &str,
        check: &ElementPredicate,
        timeout_secs: u64,
    ) -> Result<()> {
        self.poll_until(
            timeout_secs,
            &format!("element '{selector}' did not change"),
            || async {
                let element = self.driver.find(By::Css(selector)).await?;
                check(&element).await
            },
        )
        .await
    }

    async fn wait_for_js(&self, script: &str, timeout_secs: u64) -> Result<()> {
        self.poll_until(
            timeout_secs,
            &format!("script '{script}' still not truthy"),
            || async {
                let value = self.execute_js(script).await?;
                Ok(js_truthy(&value))
            },
        )
        .await
    }

    async fn wait_for_text(
        &self,
        text: &str,
        timeout_secs: u64,
        selector: Option<&str>,
    ) -> Result<()> {
        self.poll_until(
            timeout_secs,
            &format!("text '{text}' did not appear{}", scope_suffix(selector)),
            || async {
                match self.scoped_text(selector).await {
                    Ok(haystack) => Ok(haystack.contains(text)),
                    Err(ShimError::ElementNotFound(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            },
        )
        .await
    }

    async fn cleanup(&self) -> Result<()> {
        if let Err(error) = self.driver.clone().quit().await {
            tracing::warn!(%error, "webdriver session did not quit cleanly");
        }
        Ok(())
    }

    async fn on_failure(&self, test: &str) -> Result<()> {
        let name = format!("{}.fail", artifact_name(test));
        if let Err(error) = self.capture_screenshot(&name).await {
            tracing::warn!(%error, "could not capture failure screenshot");
        }
        Ok(())
    }
}

/// Parses a `WIDTHxHEIGHT` window size string.
fn parse_window_size(size: &str) -> Result<(u32, u32)> {
    let invalid = || {
        ShimError::Configuration(format!(
            "invalid window size '{size}': expected WIDTHxHEIGHT or 'maximize'"
        ))
    };
    let (w, h) = size.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width = w.trim().parse().map_err(|_| invalid())?;
    let height = h.trim().parse().map_err(|_| invalid())?;
    Ok((width, height))
}

/// File-safe artifact name derived from a test name.
fn artifact_name(test: &str) -> String {
    let mut out = String::with_capacity(test.len());
    for ch in test.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// JavaScript truthiness of a script return value.
fn js_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Maps a named key to its WebDriver key code, passing plain text through.
fn key_sequence(key: &str) -> String {
    let special = match key {
        "Enter" => Some(Key::Enter),
        "Tab" => Some(Key::Tab),
        "Escape" => Some(Key::Escape),
        "Backspace" => Some(Key::Backspace),
        "Delete" => Some(Key::Delete),
        "Home" => Some(Key::Home),
        "End" => Some(Key::End),
        "PageUp" => Some(Key::PageUp),
        "PageDown" => Some(Key::PageDown),
        "Space" => Some(Key::Space),
        "ArrowUp" | "Up" => Some(Key::Up),
        "ArrowDown" | "Down" => Some(Key::Down),
        "ArrowLeft" | "Left" => Some(Key::Left),
        "ArrowRight" | "Right" => Some(Key::Right),
        _ => None,
    };
    match special {
        Some(k) => char::from(k).to_string(),
        None => key.to_string(),
    }
}

//! HTTP-level browser emulation.
//!
//! No JavaScript, no rendering: pages are fetched with `reqwest` and queried
//! with CSS selectors over the raw response body. Form interaction is
//! emulated by recording pending field values and serializing the enclosing
//! form when a submit control is clicked. Cookies are a plain name/value jar
//! replayed on every request.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::{Method, Url};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::{BackendKind, HttpOptions};
use crate::error::{Result, ShimError};
use crate::shim::backend::{Browser, HttpEngineCall, SessionCookie, SessionData};
use crate::shim::{compile_pattern, grab_from_uri, relative_uri, rewrite_subdomain, scope_suffix};

/// Pending value for a form control, keyed by the control's `name`.
#[derive(Debug, Clone)]
enum FieldValue {
    Text(String),
    Checked(bool),
    Selected(String),
    File(PathBuf),
}

#[derive(Debug, Default)]
struct PageState {
    /// Base override set by `am_on_url` / `am_on_subdomain`.
    base: Option<Url>,
    /// URL of the current page, after redirects.
    url: Option<Url>,
    status: Option<u16>,
    body: String,
    cookies: BTreeMap<String, String>,
    headers: Vec<(String, String)>,
    auth: Option<(String, String)>,
    fields: BTreeMap<String, FieldValue>,
}

enum Payload {
    None,
    Form(Vec<(String, String)>),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<(String, PathBuf)>,
    },
}

/// What a `click` resolved to before any request is made.
enum ClickPlan {
    Link(Url),
    Submit {
        method: Method,
        action: Url,
        payload: Payload,
    },
}

pub struct HttpBrowser {
    client: reqwest::Client,
    base: Url,
    options: HttpOptions,
    state: Mutex<PageState>,
}

impl HttpBrowser {
    pub fn new(options: HttpOptions) -> Result<Self> {
        let base = Url::parse(&options.url).map_err(|e| {
            ShimError::Configuration(format!("invalid base url '{}': {e}", options.url))
        })?;
        let client = reqwest::Client::builder().timeout(options.timeout).build()?;
        Ok(Self {
            client,
            base,
            options,
            state: Mutex::new(PageState::default()),
        })
    }

    fn effective_base(&self, state: &PageState) -> Url {
        state.base.clone().unwrap_or_else(|| self.base.clone())
    }

    /// Resolves `target` against the current page if one is open, otherwise
    /// against the base URL.
    fn resolve(&self, state: &PageState, target: &str) -> Result<Url> {
        let anchor = state
            .url
            .clone()
            .unwrap_or_else(|| self.effective_base(state));
        anchor
            .join(target)
            .map_err(|e| ShimError::Configuration(format!("cannot resolve url '{target}': {e}")))
    }

    async fn perform(
        &self,
        state: &mut PageState,
        method: Method,
        url: Url,
        payload: Payload,
        xhr: bool,
    ) -> Result<()> {
        let mut request = self.client.request(method, url);

        if !state.cookies.is_empty() {
            let jar = state
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(COOKIE, jar);
        }
        request = request.headers(extra_headers(&state.headers));
        if xhr {
            request = request.header("X-Requested-With", "XMLHttpRequest");
        }
        if let Some((username, password)) = &state.auth {
            request = request.basic_auth(username, Some(password));
        }

        request = match payload {
            Payload::None => request,
            Payload::Form(pairs) => request.form(&pairs),
            Payload::Multipart { fields, files } => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                for (name, path) in files {
                    let bytes = std::fs::read(&path)?;
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    form = form
                        .part(name, reqwest::multipart::Part::bytes(bytes).file_name(file_name));
                }
                request.multipart(form)
            }
        };

        let response = request.send().await?;

        for raw in response.headers().get_all(SET_COOKIE) {
            if let Ok(text) = raw.to_str() {
                if let Some((name, value)) = parse_set_cookie(text) {
                    if value.is_empty() {
                        state.cookies.remove(&name);
                    } else {
                        state.cookies.insert(name, value);
                    }
                }
            }
        }

        state.status = Some(response.status().as_u16());
        state.url = Some(response.url().clone());
        state.body = response.text().await?;
        state.fields.clear();

        tracing::debug!(
            url = %state.url.as_ref().map(Url::to_string).unwrap_or_default(),
            status = state.status.unwrap_or_default(),
            "page loaded"
        );
        Ok(())
    }

    /// Runs `f` over the parsed current page. The DOM handle never crosses an
    /// await point, keeping backend futures `Send`.
    async fn with_page<T>(&self, f: impl FnOnce(&Html, &PageState) -> Result<T>) -> Result<T> {
        let state = self.state.lock().await;
        let doc = Html::parse_document(&state.body);
        f(&doc, &state)
    }

    async fn current_uri(&self) -> Result<String> {
        let state = self.state.lock().await;
        let url = state
            .url
            .as_ref()
            .ok_or_else(|| ShimError::assertion("no page has been opened"))?;
        Ok(relative_uri(url))
    }

    fn record_field(&self, state: &mut PageState, locator: &str, value: FieldValue) -> Result<()> {
        let doc = Html::parse_document(&state.body);
        let field = find_field(&doc, locator)
            .ok_or_else(|| ShimError::ElementNotFound(format!("field '{locator}'")))?;
        let key = field_key(&field, locator);
        state.fields.insert(key, value);
        Ok(())
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    fn kind(&self) -> BackendKind {
        BackendKind::DirectHttp
    }

    async fn am_on_page(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let base = self.effective_base(&state);
        let url = base
            .join(path)
            .map_err(|e| ShimError::Configuration(format!("cannot resolve page '{path}': {e}")))?;
        self.perform(&mut state, Method::GET, url, Payload::None, false)
            .await
    }

    async fn am_on_subdomain(&self, subdomain: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let base = self.effective_base(&state);
        state.base = Some(rewrite_subdomain(&base, subdomain)?);
        Ok(())
    }

    async fn am_on_url(&self, url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|e| ShimError::Configuration(format!("invalid url '{url}': {e}")))?;
        let mut origin = parsed.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        let mut state = self.state.lock().await;
        state.base = Some(origin);
        self.perform(&mut state, Method::GET, parsed, Payload::None, false)
            .await
    }

    async fn attach_file(&self, field: &str, filename: &str) -> Result<()> {
        let path = self.options.data_dir.join(filename);
        if !path.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("attachment '{}' not found", path.display()),
            )
            .into());
        }
        let mut state = self.state.lock().await;
        self.record_field(&mut state, field, FieldValue::File(path))
    }

    async fn check_option(&self, option: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        self.record_field(&mut state, option, FieldValue::Checked(true))
    }

    async fn uncheck_option(&self, option: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        self.record_field(&mut state, option, FieldValue::Checked(false))
    }

    async fn fill_field(&self, field: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        self.record_field(&mut state, field, FieldValue::Text(value.to_string()))
    }

    async fn select_option(&self, select: &str, option: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        self.record_field(&mut state, select, FieldValue::Selected(option.to_string()))
    }

    async fn click(&self, target: &str, context: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        let plan = {
            let doc = Html::parse_document(&state.body);
            plan_click(self, &state, &doc, target, context)?
        };
        match plan {
            ClickPlan::Link(url) => {
                self.perform(&mut state, Method::GET, url, Payload::None, false)
                    .await
            }
            ClickPlan::Submit {
                method,
                action,
                payload,
            } => self.perform(&mut state, method, action, payload, false).await,
        }
    }

    async fn see(&self, text: &str, selector: Option<&str>) -> Result<()> {
        let expected = text.to_string();
        self.with_page(|doc, _| {
            let haystack = scoped_text(doc, selector)?;
            if haystack.contains(&expected) {
                Ok(())
            } else {
                Err(ShimError::assertion(format!(
                    "expected to see '{expected}'{}",
                    scope_suffix(selector)
                )))
            }
        })
        .await
    }

    async fn dont_see(&self, text: &str, selector: Option<&str>) -> Result<()> {
        let unexpected = text.to_string();
        self.with_page(|doc, _| {
            let haystack = scoped_text(doc, selector)?;
            if haystack.contains(&unexpected) {
                Err(ShimError::assertion(format!(
                    "did not expect to see '{unexpected}'{}",
                    scope_suffix(selector)
                )))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn see_element(&self, selector: &str) -> Result<()> {
        self.with_page(|doc, _| {
            if select_all(doc, selector)?.is_empty() {
                Err(ShimError::assertion(format!("element '{selector}' not found")))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn dont_see_element(&self, selector: &str) -> Result<()> {
        self.with_page(|doc, _| {
            if select_all(doc, selector)?.is_empty() {
                Ok(())
            } else {
                Err(ShimError::assertion(format!(
                    "element '{selector}' should not be present"
                )))
            }
        })
        .await
    }

    async fn see_link(&self, text: &str, url: Option<&str>) -> Result<()> {
        let text = text.to_string();
        let url = url.map(str::to_string);
        self.with_page(|doc, _| {
            if find_link(doc, &text, url.as_deref()).is_some() {
                Ok(())
            } else {
                Err(ShimError::assertion(format!("link '{text}' not found")))
            }
        })
        .await
    }

    async fn dont_see_link(&self, text: &str, url: Option<&str>) -> Result<()> {
        let text = text.to_string();
        let url = url.map(str::to_string);
        self.with_page(|doc, _| {
            if find_link(doc, &text, url.as_deref()).is_some() {
                Err(ShimError::assertion(format!(
                    "link '{text}' should not be present"
                )))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn see_in_title(&self, title: &str) -> Result<()> {
        let title = title.to_string();
        self.with_page(|doc, _| {
            let current = page_title(doc);
            if current.contains(&title) {
                Ok(())
            } else {
                Err(ShimError::assertion(format!(
                    "expected '{title}' in title '{current}'"
                )))
            }
        })
        .await
    }

    async fn dont_see_in_title(&self, title: &str) -> Result<()> {
        let title = title.to_string();
        self.with_page(|doc, _| {
            let current = page_title(doc);
            if current.contains(&title) {
                Err(ShimError::assertion(format!(
                    "did not expect '{title}' in title '{current}'"
                )))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn see_in_field(&self, field: &str, value: &str) -> Result<()> {
        let field = field.to_string();
        let value = value.to_string();
        self.with_page(|doc, state| {
            let current = field_value(doc, state, &field)?;
            if current.trim() == value.trim() {
                Ok(())
            } else {
                Err(ShimError::assertion(format!(
                    "field '{field}' holds '{current}', expected '{value}'"
                )))
            }
        })
        .await
    }

    async fn dont_see_in_field(&self, field: &str, value: &str) -> Result<()> {
        let field = field.to_string();
        let value = value.to_string();
        self.with_page(|doc, state| {
            let current = field_value(doc, state, &field)?;
            if current.trim() == value.trim() {
                Err(ShimError::assertion(format!(
                    "field '{field}' should not hold '{value}'"
                )))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn see_checkbox_is_checked(&self, checkbox: &str) -> Result<()> {
        let checkbox = checkbox.to_string();
        self.with_page(|doc, state| {
            if checkbox_checked(doc, state, &checkbox)? {
                Ok(())
            } else {
                Err(ShimError::assertion(format!(
                    "checkbox '{checkbox}' is not checked"
                )))
            }
        })
        .await
    }

    async fn dont_see_checkbox_is_checked(&self, checkbox: &str) -> Result<()> {
        let checkbox = checkbox.to_string();
        self.with_page(|doc, state| {
            if checkbox_checked(doc, state, &checkbox)? {
                Err(ShimError::assertion(format!(
                    "checkbox '{checkbox}' should not be checked"
                )))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn see_option_is_selected(&self, select: &str, text: &str) -> Result<()> {
        let select = select.to_string();
        let text = text.to_string();
        self.with_page(|doc, state| {
            let current = selected_option(doc, state, &select)?;
            if current.as_deref() == Some(text.trim()) {
                Ok(())
            } else {
                Err(ShimError::assertion(format!(
                    "option '{text}' is not selected in '{select}'"
                )))
            }
        })
        .await
    }

    async fn dont_see_option_is_selected(&self, select: &str, text: &str) -> Result<()> {
        let select = select.to_string();
        let text = text.to_string();
        self.with_page(|doc, state| {
            let current = selected_option(doc, state, &select)?;
            if current.as_deref() == Some(text.trim()) {
                Err(ShimError::assertion(format!(
                    "option '{text}' should not be selected in '{select}'"
                )))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn see_number_of_elements(&self, selector: &str, expected: usize) -> Result<()> {
        self.with_page(|doc, _| {
            let found = select_all(doc, selector)?.len();
            if found == expected {
                Ok(())
            } else {
                Err(ShimError::assertion(format!(
                    "expected {expected} elements for '{selector}', found {found}"
                )))
            }
        })
        .await
    }

    async fn see_in_current_url(&self, fragment: &str) -> Result<()> {
        let uri = self.current_uri().await?;
        if uri.contains(fragment) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "expected '{fragment}' in current uri '{uri}'"
            )))
        }
    }

    async fn dont_see_in_current_url(&self, fragment: &str) -> Result<()> {
        let uri = self.current_uri().await?;
        if uri.contains(fragment) {
            Err(ShimError::assertion(format!(
                "did not expect '{fragment}' in current uri '{uri}'"
            )))
        } else {
            Ok(())
        }
    }

    async fn see_current_url_equals(&self, expected: &str) -> Result<()> {
        let uri = self.current_uri().await?;
        if uri == expected {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "current uri is '{uri}', expected '{expected}'"
            )))
        }
    }

    async fn dont_see_current_url_equals(&self, unexpected: &str) -> Result<()> {
        let uri = self.current_uri().await?;
        if uri == unexpected {
            Err(ShimError::assertion(format!(
                "current uri should not equal '{unexpected}'"
            )))
        } else {
            Ok(())
        }
    }

    async fn see_current_url_matches(&self, pattern: &str) -> Result<()> {
        let uri = self.current_uri().await?;
        if compile_pattern(pattern)?.is_match(&uri) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!(
                "current uri '{uri}' does not match '{pattern}'"
            )))
        }
    }

    async fn dont_see_current_url_matches(&self, pattern: &str) -> Result<()> {
        let uri = self.current_uri().await?;
        if compile_pattern(pattern)?.is_match(&uri) {
            Err(ShimError::assertion(format!(
                "current uri '{uri}' should not match '{pattern}'"
            )))
        } else {
            Ok(())
        }
    }

    async fn grab_from_current_url(&self, pattern: Option<&str>) -> Result<String> {
        let uri = self.current_uri().await?;
        grab_from_uri(&uri, pattern)
    }

    async fn grab_text_from(&self, selector: &str) -> Result<String> {
        self.with_page(|doc, _| {
            let elements = select_all(doc, selector)?;
            elements
                .first()
                .map(|el| element_text(el))
                .ok_or_else(|| ShimError::ElementNotFound(selector.to_string()))
        })
        .await
    }

    async fn grab_value_from(&self, field: &str) -> Result<String> {
        let field = field.to_string();
        self.with_page(|doc, state| field_value(doc, state, &field)).await
    }

    async fn grab_attribute_from(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>> {
        self.with_page(|doc, _| {
            let elements = select_all(doc, selector)?;
            let element = elements
                .first()
                .ok_or_else(|| ShimError::ElementNotFound(selector.to_string()))?;
            Ok(element.value().attr(attribute).map(str::to_string))
        })
        .await
    }

    async fn set_cookie(&self, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.cookies.insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn grab_cookie(&self, name: &str) -> Result<Option<String>> {
        let state = self.state.lock().await;
        Ok(state.cookies.get(name).cloned())
    }

    async fn see_cookie(&self, name: &str) -> Result<()> {
        let state = self.state.lock().await;
        if state.cookies.contains_key(name) {
            Ok(())
        } else {
            Err(ShimError::assertion(format!("cookie '{name}' is not set")))
        }
    }

    async fn dont_see_cookie(&self, name: &str) -> Result<()> {
        let state = self.state.lock().await;
        if state.cookies.contains_key(name) {
            Err(ShimError::assertion(format!(
                "cookie '{name}' should not be set"
            )))
        } else {
            Ok(())
        }
    }

    async fn reset_cookie(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.cookies.remove(name);
        Ok(())
    }

    async fn wait(&self, seconds: u64) -> Result<()> {
        if seconds > 0 {
            tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;
        }
        Ok(())
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.options.url.clone())
    }

    async fn initialize_session(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = PageState::default();
        Ok(())
    }

    async fn load_session_data(&self, data: &SessionData) -> Result<()> {
        let mut state = self.state.lock().await;
        state.cookies = data
            .cookies
            .iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect();
        Ok(())
    }

    async fn backup_session_data(&self) -> Result<SessionData> {
        let state = self.state.lock().await;
        Ok(SessionData {
            cookies: state
                .cookies
                .iter()
                .map(|(name, value)| SessionCookie {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            url: state.url.as_ref().map(Url::to_string),
        })
    }

    async fn close_session(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = PageState::default();
        Ok(())
    }

    async fn am_http_authenticated(&self, username: &str, password: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.auth = Some((username.to_string(), password.to_string()));
        Ok(())
    }

    async fn execute_in_http_engine(&self, call: &HttpEngineCall) -> Result<Value> {
        call(&self.client, &self.base).await
    }

    async fn see_page_not_found(&self) -> Result<()> {
        self.see_response_code_is(404).await
    }

    async fn see_response_code_is(&self, code: u16) -> Result<()> {
        let state = self.state.lock().await;
        match state.status {
            Some(current) if current == code => Ok(()),
            Some(current) => Err(ShimError::assertion(format!(
                "response code is {current}, expected {code}"
            ))),
            None => Err(ShimError::assertion("no page has been opened")),
        }
    }

    async fn send_ajax_get_request(&self, uri: &str, params: &[(String, String)]) -> Result<()> {
        self.send_ajax_request("GET", uri, params).await
    }

    async fn send_ajax_post_request(&self, uri: &str, params: &[(String, String)]) -> Result<()> {
        self.send_ajax_request("POST", uri, params).await
    }

    async fn send_ajax_request(
        &self,
        method: &str,
        uri: &str,
        params: &[(String, String)],
    ) -> Result<()> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ShimError::Configuration(format!("invalid HTTP method '{method}'")))?;

        let mut state = self.state.lock().await;
        let mut url = self.resolve(&state, uri)?;

        let payload = if method == Method::GET {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            Payload::None
        } else {
            Payload::Form(params.to_vec())
        };
        self.perform(&mut state, method, url, payload, true).await
    }

    async fn set_header(&self, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.headers.retain(|(existing, _)| existing != name);
        state.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }
}

// --- DOM helpers; synchronous so the parsed page never crosses an await ---

fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ShimError::Selector(format!("'{selector}': {e}")))
}

fn select_all<'a>(doc: &'a Html, selector: &str) -> Result<Vec<ElementRef<'a>>> {
    let sel = compile_selector(selector)?;
    Ok(doc.select(&sel).collect())
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn page_text(doc: &Html) -> String {
    doc.root_element().text().collect::<Vec<_>>().join(" ")
}

fn scoped_text(doc: &Html, selector: Option<&str>) -> Result<String> {
    match selector {
        None => Ok(page_text(doc)),
        Some(sel) => {
            let elements = select_all(doc, sel)?;
            Ok(elements
                .iter()
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" "))
        }
    }
}

fn page_title(doc: &Html) -> String {
    match Selector::parse("title") {
        Ok(sel) => doc
            .select(&sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

fn extra_headers(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            map.insert(name, value);
        }
    }
    map
}

/// Finds a form control by CSS selector, falling back to `name`/`id` lookup
/// the way scenario authors commonly address fields.
fn find_field<'a>(doc: &'a Html, locator: &str) -> Option<ElementRef<'a>> {
    if let Ok(sel) = Selector::parse(locator) {
        if let Some(el) = doc.select(&sel).next() {
            return Some(el);
        }
    }
    if locator.contains('"') {
        return None;
    }
    for attr in ["name", "id"] {
        let shorthand = format!(
            "input[{attr}=\"{locator}\"], textarea[{attr}=\"{locator}\"], select[{attr}=\"{locator}\"]"
        );
        if let Ok(sel) = Selector::parse(&shorthand) {
            if let Some(el) = doc.select(&sel).next() {
                return Some(el);
            }
        };
    }
    None
}

fn field_key(element: &ElementRef<'_>, locator: &str) -> String {
    element
        .value()
        .attr("name")
        .map(str::to_string)
        .unwrap_or_else(|| locator.to_string())
}

/// Current value of a form control, pending writes taking precedence over
/// the document.
fn field_value(doc: &Html, state: &PageState, locator: &str) -> Result<String> {
    let element =
        find_field(doc, locator).ok_or_else(|| ShimError::ElementNotFound(locator.to_string()))?;
    let key = field_key(&element, locator);

    if let Some(pending) = state.fields.get(&key) {
        return Ok(match pending {
            FieldValue::Text(value) => value.clone(),
            FieldValue::Selected(value) => value.clone(),
            FieldValue::Checked(true) => element.value().attr("value").unwrap_or("on").to_string(),
            FieldValue::Checked(false) => String::new(),
            FieldValue::File(path) => path.display().to_string(),
        });
    }

    Ok(match element.value().name() {
        "textarea" => element_text(&element),
        "select" => dom_selected_option(&element)
            .map(|(value, _)| value)
            .unwrap_or_default(),
        _ => element.value().attr("value").unwrap_or_default().to_string(),
    })
}

fn checkbox_checked(doc: &Html, state: &PageState, locator: &str) -> Result<bool> {
    let element =
        find_field(doc, locator).ok_or_else(|| ShimError::ElementNotFound(locator.to_string()))?;
    let key = field_key(&element, locator);
    if let Some(FieldValue::Checked(checked)) = state.fields.get(&key) {
        return Ok(*checked);
    }
    Ok(element.value().attr("checked").is_some())
}

/// Visible text of the selected option, pending selection taking precedence.
fn selected_option(doc: &Html, state: &PageState, locator: &str) -> Result<Option<String>> {
    let element =
        find_field(doc, locator).ok_or_else(|| ShimError::ElementNotFound(locator.to_string()))?;
    let key = field_key(&element, locator);
    if let Some(FieldValue::Selected(value)) = state.fields.get(&key) {
        return Ok(Some(value.trim().to_string()));
    }
    Ok(dom_selected_option(&element).map(|(_, text)| text))
}

/// (value, visible text) of the option currently marked selected.
fn dom_selected_option(select: &ElementRef<'_>) -> Option<(String, String)> {
    let option_sel = Selector::parse("option").ok()?;
    let mut first = None;
    for option in select.select(&option_sel) {
        let text = element_text(&option);
        let value = option
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| text.clone());
        if option.value().attr("selected").is_some() {
            return Some((value, text));
        }
        if first.is_none() {
            first = Some((value, text));
        }
    }
    first
}

fn find_link<'a>(doc: &'a Html, text: &str, url: Option<&str>) -> Option<ElementRef<'a>> {
    let sel = Selector::parse("a").ok()?;
    doc.select(&sel).find(|a| {
        let label = element_text(a);
        let href = a.value().attr("href").unwrap_or_default();
        label.contains(text) && url.map_or(true, |u| href.contains(u))
    })
}

fn enclosing_form<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut node = element.parent();
    while let Some(n) = node {
        if let Some(el) = ElementRef::wrap(n) {
            if el.value().name() == "form" {
                return Some(el);
            }
        }
        node = n.parent();
    }
    None
}

fn is_submit_control(element: &ElementRef<'_>) -> bool {
    match element.value().name() {
        "button" => element
            .value()
            .attr("type")
            .map_or(true, |t| t.eq_ignore_ascii_case("submit")),
        "input" => element
            .value()
            .attr("type")
            .map_or(false, |t| t.eq_ignore_ascii_case("submit")),
        _ => false,
    }
}

fn plan_click(
    browser: &HttpBrowser,
    state: &PageState,
    doc: &Html,
    target: &str,
    context: Option<&str>,
) -> Result<ClickPlan> {
    let scope: Vec<ElementRef<'_>> = match context {
        Some(ctx) => select_all(doc, ctx)?,
        None => vec![doc.root_element()],
    };

    // Exact link text wins, the way scenarios click 'Next'.
    let link_sel = compile_selector("a")?;
    for root in &scope {
        for a in root.select(&link_sel) {
            if element_text(&a) == target.trim() {
                let href = a.value().attr("href").unwrap_or_default();
                return Ok(ClickPlan::Link(browser.resolve(state, href)?));
            }
        }
    }

    // Buttons by visible text or value.
    let button_sel = compile_selector("button, input[type=\"submit\"]")?;
    for root in &scope {
        for control in root.select(&button_sel) {
            let label = element_text(&control);
            let value = control.value().attr("value").unwrap_or_default();
            if label == target.trim() || value == target.trim() {
                return plan_submit(browser, state, doc, &control);
            }
        }
    }

    // Finally a CSS selector naming the control directly.
    if let Ok(sel) = Selector::parse(target) {
        for root in &scope {
            if let Some(element) = root.select(&sel).next() {
                if element.value().name() == "a" {
                    let href = element.value().attr("href").unwrap_or_default();
                    return Ok(ClickPlan::Link(browser.resolve(state, href)?));
                }
                if is_submit_control(&element) {
                    return plan_submit(browser, state, doc, &element);
                }
            }
        }
    }

    Err(ShimError::ElementNotFound(format!(
        "clickable '{target}'{}",
        scope_suffix(context)
    )))
}

fn plan_submit(
    browser: &HttpBrowser,
    state: &PageState,
    _doc: &Html,
    control: &ElementRef<'_>,
) -> Result<ClickPlan> {
    let form = enclosing_form(control).ok_or_else(|| {
        ShimError::assertion("submit control is not inside a form".to_string())
    })?;

    let method = match form.value().attr("method") {
        Some(m) if m.eq_ignore_ascii_case("post") => Method::POST,
        _ => Method::GET,
    };
    let action = match form.value().attr("action").filter(|a| !a.is_empty()) {
        Some(action) => browser.resolve(state, action)?,
        None => state
            .url
            .clone()
            .unwrap_or_else(|| browser.effective_base(state)),
    };

    let (mut fields, files) = serialize_form(&form, &state.fields);

    // Named submit controls travel with the submission.
    if let Some(name) = control.value().attr("name") {
        let value = control.value().attr("value").unwrap_or_default();
        fields.push((name.to_string(), value.to_string()));
    }

    if files.is_empty() && method == Method::GET {
        let mut action = action;
        action
            .query_pairs_mut()
            .extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        return Ok(ClickPlan::Submit {
            method,
            action,
            payload: Payload::None,
        });
    }

    let payload = if files.is_empty() {
        Payload::Form(fields)
    } else {
        Payload::Multipart { fields, files }
    };

    Ok(ClickPlan::Submit {
        method,
        action,
        payload,
    })
}

/// Serializes every named control in the form, pending values taking
/// precedence over document defaults.
fn serialize_form(
    form: &ElementRef<'_>,
    pending: &BTreeMap<String, FieldValue>,
) -> (Vec<(String, String)>, Vec<(String, PathBuf)>) {
    let mut fields = Vec::new();
    let mut files = Vec::new();

    let control_sel = match Selector::parse("input, textarea, select") {
        Ok(sel) => sel,
        Err(_) => return (fields, files),
    };

    for control in form.select(&control_sel) {
        let Some(name) = control.value().attr("name") else {
            continue;
        };
        let kind = control
            .value()
            .attr("type")
            .unwrap_or("text")
            .to_ascii_lowercase();
        let tag = control.value().name();

        match (tag, kind.as_str()) {
            ("input", "checkbox") | ("input", "radio") => {
                let checked = match pending.get(name) {
                    Some(FieldValue::Checked(c)) => *c,
                    _ => control.value().attr("checked").is_some(),
                };
                if checked {
                    let value = control.value().attr("value").unwrap_or("on");
                    fields.push((name.to_string(), value.to_string()));
                }
            }
            ("input", "file") => {
                if let Some(FieldValue::File(path)) = pending.get(name) {
                    files.push((name.to_string(), path.clone()));
                }
            }
            ("input", "submit") | ("input", "button") | ("input", "image") => {}
            ("input", _) => {
                let value = match pending.get(name) {
                    Some(FieldValue::Text(v)) => v.clone(),
                    _ => control.value().attr("value").unwrap_or_default().to_string(),
                };
                fields.push((name.to_string(), value));
            }
            ("textarea", _) => {
                let value = match pending.get(name) {
                    Some(FieldValue::Text(v)) => v.clone(),
                    _ => element_text(&control),
                };
                fields.push((name.to_string(), value));
            }
            ("select", _) => {
                let value = match pending.get(name) {
                    Some(FieldValue::Selected(wanted)) => {
                        resolve_option_value(&control, wanted)
                    }
                    _ => dom_selected_option(&control).map(|(value, _)| value),
                };
                if let Some(value) = value {
                    fields.push((name.to_string(), value));
                }
            }
            _ => {}
        }
    }

    (fields, files)
}

/// Maps a `select_option` argument to the option's submit value, matching the
/// visible text first and the value attribute second.
fn resolve_option_value(select: &ElementRef<'_>, wanted: &str) -> Option<String> {
    let option_sel = Selector::parse("option").ok()?;
    let wanted = wanted.trim();
    let mut by_value = None;
    for option in select.select(&option_sel) {
        let text = element_text(&option);
        let value = option
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| text.clone());
        if text == wanted {
            return Some(value);
        }
        if value == wanted && by_value.is_none() {
            by_value = Some(value);
        }
    }
    by_value
}

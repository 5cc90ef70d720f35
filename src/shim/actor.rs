//! The Backend Multiplexer.
//!
//! `BrowserActor` resolves configuration into one backend kind, owns that
//! single Automation Instance for its whole lifetime, and forwards every
//! operation through the command runner. Each public method gates on the
//! capability table first, so a call the active kind cannot honor fails with
//! a typed error before the backend sees it.

use serde_json::Value;

use crate::config::{BackendKind, EnvVars, Settings, ShimConfig};
use crate::error::{Result, ShimError};
use crate::shim::backend::{
    Browser, ElementPredicate, HttpEngineCall, SessionData, WebDriverCall,
};
use crate::shim::capability::Operation;
use crate::shim::http::HttpBrowser;
use crate::shim::runner::CommandRunner;
use crate::shim::webdriver::WebDriverBrowser;

pub struct BrowserActor {
    config: ShimConfig,
    runner: CommandRunner,
}

impl BrowserActor {
    /// Resolves the effective configuration and connects the backend it
    /// selects.
    pub async fn new(supplied: Settings, env: &EnvVars) -> Result<Self> {
        let config = ShimConfig::resolve(supplied, env)?;
        let browser: Box<dyn Browser> = match config.module {
            BackendKind::DirectHttp => Box::new(HttpBrowser::new(config.http.clone())?),
            BackendKind::RemoteDriver => {
                Box::new(WebDriverBrowser::connect(config.webdriver.clone()).await?)
            }
        };
        tracing::info!(module = %config.module, url = %config.url, "backend ready");
        Ok(Self::from_parts(config, browser))
    }

    /// Wires an already-built backend to a resolved configuration.
    pub fn from_parts(config: ShimConfig, browser: Box<dyn Browser>) -> Self {
        Self {
            config,
            runner: CommandRunner::new(browser),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.config.module
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    pub fn is_direct_http(&self) -> bool {
        self.kind() == BackendKind::DirectHttp
    }

    pub fn is_remote_driver(&self) -> bool {
        self.kind() == BackendKind::RemoteDriver
    }

    /// Rejects operations the active backend kind does not implement, before
    /// anything reaches the backend.
    fn gate(&self, operation: Operation) -> Result<()> {
        if operation.supported_by(self.kind()) {
            Ok(())
        } else {
            Err(ShimError::unsupported(operation.name(), self.kind()))
        }
    }

    // --- navigation ---

    pub async fn am_on_page(&self, path: &str) -> Result<()> {
        self.gate(Operation::AmOnPage)?;
        let r = &self.runner;
        r.invoke(Operation::AmOnPage, || r.browser().am_on_page(path))
            .await
    }

    pub async fn am_on_subdomain(&self, subdomain: &str) -> Result<()> {
        self.gate(Operation::AmOnSubdomain)?;
        let r = &self.runner;
        r.invoke(Operation::AmOnSubdomain, || {
            r.browser().am_on_subdomain(subdomain)
        })
        .await
    }

    pub async fn am_on_url(&self, url: &str) -> Result<()> {
        self.gate(Operation::AmOnUrl)?;
        let r = &self.runner;
        r.invoke(Operation::AmOnUrl, || r.browser().am_on_url(url))
            .await
    }

    // --- page interaction ---

    pub async fn attach_file(&self, field: &str, filename: &str) -> Result<()> {
        self.gate(Operation::AttachFile)?;
        let r = &self.runner;
        r.invoke(Operation::AttachFile, || {
            r.browser().attach_file(field, filename)
        })
        .await
    }

    pub async fn check_option(&self, option: &str) -> Result<()> {
        self.gate(Operation::CheckOption)?;
        let r = &self.runner;
        r.invoke(Operation::CheckOption, || r.browser().check_option(option))
            .await
    }

    pub async fn click(&self, target: &str, context: Option<&str>) -> Result<()> {
        self.gate(Operation::Click)?;
        let r = &self.runner;
        r.invoke(Operation::Click, || r.browser().click(target, context))
            .await
    }

    pub async fn fill_field(&self, field: &str, value: &str) -> Result<()> {
        self.gate(Operation::FillField)?;
        let r = &self.runner;
        r.invoke(Operation::FillField, || {
            r.browser().fill_field(field, value)
        })
        .await
    }

    pub async fn select_option(&self, select: &str, option: &str) -> Result<()> {
        self.gate(Operation::SelectOption)?;
        let r = &self.runner;
        r.invoke(Operation::SelectOption, || {
            r.browser().select_option(select, option)
        })
        .await
    }

    pub async fn uncheck_option(&self, option: &str) -> Result<()> {
        self.gate(Operation::UncheckOption)?;
        let r = &self.runner;
        r.invoke(Operation::UncheckOption, || {
            r.browser().uncheck_option(option)
        })
        .await
    }

    // --- assertions ---

    pub async fn see(&self, text: &str, selector: Option<&str>) -> Result<()> {
        self.gate(Operation::See)?;
        let r = &self.runner;
        r.invoke(Operation::See, || r.browser().see(text, selector))
            .await
    }

    pub async fn dont_see(&self, text: &str, selector: Option<&str>) -> Result<()> {
        self.gate(Operation::DontSee)?;
        let r = &self.runner;
        r.invoke(Operation::DontSee, || r.browser().dont_see(text, selector))
            .await
    }

    pub async fn see_element(&self, selector: &str) -> Result<()> {
        self.gate(Operation::SeeElement)?;
        let r = &self.runner;
        r.invoke(Operation::SeeElement, || r.browser().see_element(selector))
            .await
    }

    pub async fn dont_see_element(&self, selector: &str) -> Result<()> {
        self.gate(Operation::DontSeeElement)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeElement, || {
            r.browser().dont_see_element(selector)
        })
        .await
    }

    pub async fn see_link(&self, text: &str, url: Option<&str>) -> Result<()> {
        self.gate(Operation::SeeLink)?;
        let r = &self.runner;
        r.invoke(Operation::SeeLink, || r.browser().see_link(text, url))
            .await
    }

    pub async fn dont_see_link(&self, text: &str, url: Option<&str>) -> Result<()> {
        self.gate(Operation::DontSeeLink)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeLink, || {
            r.browser().dont_see_link(text, url)
        })
        .await
    }

    pub async fn see_in_title(&self, title: &str) -> Result<()> {
        self.gate(Operation::SeeInTitle)?;
        let r = &self.runner;
        r.invoke(Operation::SeeInTitle, || r.browser().see_in_title(title))
            .await
    }

    pub async fn dont_see_in_title(&self, title: &str) -> Result<()> {
        self.gate(Operation::DontSeeInTitle)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeInTitle, || {
            r.browser().dont_see_in_title(title)
        })
        .await
    }

    pub async fn see_in_field(&self, field: &str, value: &str) -> Result<()> {
        self.gate(Operation::SeeInField)?;
        let r = &self.runner;
        r.invoke(Operation::SeeInField, || {
            r.browser().see_in_field(field, value)
        })
        .await
    }

    pub async fn dont_see_in_field(&self, field: &str, value: &str) -> Result<()> {
        self.gate(Operation::DontSeeInField)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeInField, || {
            r.browser().dont_see_in_field(field, value)
        })
        .await
    }

    pub async fn see_checkbox_is_checked(&self, checkbox: &str) -> Result<()> {
        self.gate(Operation::SeeCheckboxIsChecked)?;
        let r = &self.runner;
        r.invoke(Operation::SeeCheckboxIsChecked, || {
            r.browser().see_checkbox_is_checked(checkbox)
        })
        .await
    }

    pub async fn dont_see_checkbox_is_checked(&self, checkbox: &str) -> Result<()> {
        self.gate(Operation::DontSeeCheckboxIsChecked)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeCheckboxIsChecked, || {
            r.browser().dont_see_checkbox_is_checked(checkbox)
        })
        .await
    }

    pub async fn see_option_is_selected(&self, select: &str, text: &str) -> Result<()> {
        self.gate(Operation::SeeOptionIsSelected)?;
        let r = &self.runner;
        r.invoke(Operation::SeeOptionIsSelected, || {
            r.browser().see_option_is_selected(select, text)
        })
        .await
    }

    pub async fn dont_see_option_is_selected(&self, select: &str, text: &str) -> Result<()> {
        self.gate(Operation::DontSeeOptionIsSelected)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeOptionIsSelected, || {
            r.browser().dont_see_option_is_selected(select, text)
        })
        .await
    }

    pub async fn see_number_of_elements(&self, selector: &str, expected: usize) -> Result<()> {
        self.gate(Operation::SeeNumberOfElements)?;
        let r = &self.runner;
        r.invoke(Operation::SeeNumberOfElements, || {
            r.browser().see_number_of_elements(selector, expected)
        })
        .await
    }

    // --- current URL ---

    pub async fn see_in_current_url(&self, fragment: &str) -> Result<()> {
        self.gate(Operation::SeeInCurrentUrl)?;
        let r = &self.runner;
        r.invoke(Operation::SeeInCurrentUrl, || {
            r.browser().see_in_current_url(fragment)
        })
        .await
    }

    pub async fn dont_see_in_current_url(&self, fragment: &str) -> Result<()> {
        self.gate(Operation::DontSeeInCurrentUrl)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeInCurrentUrl, || {
            r.browser().dont_see_in_current_url(fragment)
        })
        .await
    }

    pub async fn see_current_url_equals(&self, uri: &str) -> Result<()> {
        self.gate(Operation::SeeCurrentUrlEquals)?;
        let r = &self.runner;
        r.invoke(Operation::SeeCurrentUrlEquals, || {
            r.browser().see_current_url_equals(uri)
        })
        .await
    }

    pub async fn dont_see_current_url_equals(&self, uri: &str) -> Result<()> {
        self.gate(Operation::DontSeeCurrentUrlEquals)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeCurrentUrlEquals, || {
            r.browser().dont_see_current_url_equals(uri)
        })
        .await
    }

    pub async fn see_current_url_matches(&self, pattern: &str) -> Result<()> {
        self.gate(Operation::SeeCurrentUrlMatches)?;
        let r = &self.runner;
        r.invoke(Operation::SeeCurrentUrlMatches, || {
            r.browser().see_current_url_matches(pattern)
        })
        .await
    }

    pub async fn dont_see_current_url_matches(&self, pattern: &str) -> Result<()> {
        self.gate(Operation::DontSeeCurrentUrlMatches)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeCurrentUrlMatches, || {
            r.browser().dont_see_current_url_matches(pattern)
        })
        .await
    }

    pub async fn grab_from_current_url(&self, pattern: Option<&str>) -> Result<String> {
        self.gate(Operation::GrabFromCurrentUrl)?;
        let r = &self.runner;
        r.invoke(Operation::GrabFromCurrentUrl, || {
            r.browser().grab_from_current_url(pattern)
        })
        .await
    }

    // --- extraction ---

    pub async fn grab_text_from(&self, selector: &str) -> Result<String> {
        self.gate(Operation::GrabTextFrom)?;
        let r = &self.runner;
        r.invoke(Operation::GrabTextFrom, || {
            r.browser().grab_text_from(selector)
        })
        .await
    }

    pub async fn grab_value_from(&self, field: &str) -> Result<String> {
        self.gate(Operation::GrabValueFrom)?;
        let r = &self.runner;
        r.invoke(Operation::GrabValueFrom, || {
            r.browser().grab_value_from(field)
        })
        .await
    }

    pub async fn grab_attribute_from(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>> {
        self.gate(Operation::GrabAttributeFrom)?;
        let r = &self.runner;
        r.invoke(Operation::GrabAttributeFrom, || {
            r.browser().grab_attribute_from(selector, attribute)
        })
        .await
    }

    // --- derived element queries ---

    /// Whether any element matches `selector`, without failing the scenario.
    ///
    /// The two kinds answer this differently on purpose. The HTTP emulation
    /// downgrades its visibility assertion to a boolean, while the remote
    /// driver counts DOM matches, so an element hidden by CSS registers only
    /// on the remote driver.
    pub async fn element_exists(&self, selector: &str) -> Result<bool> {
        self.gate(Operation::ElementExists)?;
        match self.kind() {
            BackendKind::DirectHttp => {
                let r = &self.runner;
                match r
                    .invoke(Operation::ElementExists, || {
                        r.browser().see_element(selector)
                    })
                    .await
                {
                    Ok(()) => Ok(true),
                    Err(ShimError::AssertionFailed(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            }
            BackendKind::RemoteDriver => Ok(self.count_elements(selector).await? > 0),
        }
    }

    pub async fn count_elements(&self, selector: &str) -> Result<usize> {
        self.gate(Operation::CountElements)?;
        let r = &self.runner;
        r.invoke(Operation::CountElements, || {
            r.browser().count_elements(selector)
        })
        .await
    }

    // --- cookies ---

    pub async fn set_cookie(&self, name: &str, value: &str) -> Result<()> {
        self.gate(Operation::SetCookie)?;
        let r = &self.runner;
        r.invoke(Operation::SetCookie, || r.browser().set_cookie(name, value))
            .await
    }

    pub async fn grab_cookie(&self, name: &str) -> Result<Option<String>> {
        self.gate(Operation::GrabCookie)?;
        let r = &self.runner;
        r.invoke(Operation::GrabCookie, || r.browser().grab_cookie(name))
            .await
    }

    pub async fn see_cookie(&self, name: &str) -> Result<()> {
        self.gate(Operation::SeeCookie)?;
        let r = &self.runner;
        r.invoke(Operation::SeeCookie, || r.browser().see_cookie(name))
            .await
    }

    pub async fn dont_see_cookie(&self, name: &str) -> Result<()> {
        self.gate(Operation::DontSeeCookie)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeCookie, || r.browser().dont_see_cookie(name))
            .await
    }

    pub async fn reset_cookie(&self, name: &str) -> Result<()> {
        self.gate(Operation::ResetCookie)?;
        let r = &self.runner;
        r.invoke(Operation::ResetCookie, || r.browser().reset_cookie(name))
            .await
    }

    // --- timing ---

    /// Blocks the scenario for `seconds`. Zero returns immediately; each kind
    /// applies its own ceiling.
    pub async fn wait(&self, seconds: u64) -> Result<()> {
        self.gate(Operation::Wait)?;
        let r = &self.runner;
        r.invoke(Operation::Wait, || r.browser().wait(seconds)).await
    }

    // --- session ---

    pub async fn get_url(&self) -> Result<String> {
        self.gate(Operation::GetUrl)?;
        let r = &self.runner;
        r.invoke(Operation::GetUrl, || r.browser().get_url()).await
    }

    pub async fn initialize_session(&self) -> Result<()> {
        self.gate(Operation::InitializeSession)?;
        let r = &self.runner;
        r.invoke(Operation::InitializeSession, || {
            r.browser().initialize_session()
        })
        .await
    }

    pub async fn load_session_data(&self, data: &SessionData) -> Result<()> {
        self.gate(Operation::LoadSessionData)?;
        let r = &self.runner;
        r.invoke(Operation::LoadSessionData, || {
            r.browser().load_session_data(data)
        })
        .await
    }

    pub async fn backup_session_data(&self) -> Result<SessionData> {
        self.gate(Operation::BackupSessionData)?;
        let r = &self.runner;
        r.invoke(Operation::BackupSessionData, || {
            r.browser().backup_session_data()
        })
        .await
    }

    pub async fn close_session(&self) -> Result<()> {
        self.gate(Operation::CloseSession)?;
        let r = &self.runner;
        r.invoke(Operation::CloseSession, || r.browser().close_session())
            .await
    }

    // --- HTTP emulation only ---

    pub async fn am_http_authenticated(&self, username: &str, password: &str) -> Result<()> {
        self.gate(Operation::AmHttpAuthenticated)?;
        let r = &self.runner;
        r.invoke(Operation::AmHttpAuthenticated, || {
            r.browser().am_http_authenticated(username, password)
        })
        .await
    }

    pub async fn execute_in_http_engine(&self, call: &HttpEngineCall) -> Result<Value> {
        self.gate(Operation::ExecuteInHttpEngine)?;
        let r = &self.runner;
        r.invoke(Operation::ExecuteInHttpEngine, || {
            r.browser().execute_in_http_engine(call)
        })
        .await
    }

    pub async fn see_page_not_found(&self) -> Result<()> {
        self.gate(Operation::SeePageNotFound)?;
        let r = &self.runner;
        r.invoke(Operation::SeePageNotFound, || {
            r.browser().see_page_not_found()
        })
        .await
    }

    pub async fn see_response_code_is(&self, code: u16) -> Result<()> {
        self.gate(Operation::SeeResponseCodeIs)?;
        let r = &self.runner;
        r.invoke(Operation::SeeResponseCodeIs, || {
            r.browser().see_response_code_is(code)
        })
        .await
    }

    pub async fn send_ajax_get_request(
        &self,
        uri: &str,
        params: &[(String, String)],
    ) -> Result<()> {
        self.gate(Operation::SendAjaxGetRequest)?;
        let r = &self.runner;
        r.invoke(Operation::SendAjaxGetRequest, || {
            r.browser().send_ajax_get_request(uri, params)
        })
        .await
    }

    pub async fn send_ajax_post_request(
        &self,
        uri: &str,
        params: &[(String, String)],
    ) -> Result<()> {
        self.gate(Operation::SendAjaxPostRequest)?;
        let r = &self.runner;
        r.invoke(Operation::SendAjaxPostRequest, || {
            r.browser().send_ajax_post_request(uri, params)
        })
        .await
    }

    pub async fn send_ajax_request(
        &self,
        method: &str,
        uri: &str,
        params: &[(String, String)],
    ) -> Result<()> {
        self.gate(Operation::SendAjaxRequest)?;
        let r = &self.runner;
        r.invoke(Operation::SendAjaxRequest, || {
            r.browser().send_ajax_request(method, uri, params)
        })
        .await
    }

    pub async fn set_header(&self, name: &str, value: &str) -> Result<()> {
        self.gate(Operation::SetHeader)?;
        let r = &self.runner;
        r.invoke(Operation::SetHeader, || r.browser().set_header(name, value))
            .await
    }

    // --- real browser only ---

    pub async fn accept_popup(&self) -> Result<()> {
        self.gate(Operation::AcceptPopup)?;
        let r = &self.runner;
        r.invoke(Operation::AcceptPopup, || r.browser().accept_popup())
            .await
    }

    pub async fn cancel_popup(&self) -> Result<()> {
        self.gate(Operation::CancelPopup)?;
        let r = &self.runner;
        r.invoke(Operation::CancelPopup, || r.browser().cancel_popup())
            .await
    }

    pub async fn see_in_popup(&self, text: &str) -> Result<()> {
        self.gate(Operation::SeeInPopup)?;
        let r = &self.runner;
        r.invoke(Operation::SeeInPopup, || r.browser().see_in_popup(text))
            .await
    }

    pub async fn type_in_popup(&self, keys: &str) -> Result<()> {
        self.gate(Operation::TypeInPopup)?;
        let r = &self.runner;
        r.invoke(Operation::TypeInPopup, || r.browser().type_in_popup(keys))
            .await
    }

    pub async fn append_field(&self, field: &str, value: &str) -> Result<()> {
        self.gate(Operation::AppendField)?;
        let r = &self.runner;
        r.invoke(Operation::AppendField, || {
            r.browser().append_field(field, value)
        })
        .await
    }

    pub async fn unselect_option(&self, select: &str, option: &str) -> Result<()> {
        self.gate(Operation::UnselectOption)?;
        let r = &self.runner;
        r.invoke(Operation::UnselectOption, || {
            r.browser().unselect_option(select, option)
        })
        .await
    }

    pub async fn click_with_right_button(&self, selector: &str) -> Result<()> {
        self.gate(Operation::ClickWithRightButton)?;
        let r = &self.runner;
        r.invoke(Operation::ClickWithRightButton, || {
            r.browser().click_with_right_button(selector)
        })
        .await
    }

    pub async fn double_click(&self, selector: &str) -> Result<()> {
        self.gate(Operation::DoubleClick)?;
        let r = &self.runner;
        r.invoke(Operation::DoubleClick, || r.browser().double_click(selector))
            .await
    }

    pub async fn drag_and_drop(&self, source: &str, target: &str) -> Result<()> {
        self.gate(Operation::DragAndDrop)?;
        let r = &self.runner;
        r.invoke(Operation::DragAndDrop, || {
            r.browser().drag_and_drop(source, target)
        })
        .await
    }

    pub async fn move_mouse_over(
        &self,
        selector: &str,
        offset: Option<(i64, i64)>,
    ) -> Result<()> {
        self.gate(Operation::MoveMouseOver)?;
        let r = &self.runner;
        r.invoke(Operation::MoveMouseOver, || {
            r.browser().move_mouse_over(selector, offset)
        })
        .await
    }

    pub async fn press_key(&self, selector: &str, key: &str) -> Result<()> {
        self.gate(Operation::PressKey)?;
        let r = &self.runner;
        r.invoke(Operation::PressKey, || r.browser().press_key(selector, key))
            .await
    }

    pub async fn see_element_in_dom(&self, selector: &str) -> Result<()> {
        self.gate(Operation::SeeElementInDom)?;
        let r = &self.runner;
        r.invoke(Operation::SeeElementInDom, || {
            r.browser().see_element_in_dom(selector)
        })
        .await
    }

    pub async fn dont_see_element_in_dom(&self, selector: &str) -> Result<()> {
        self.gate(Operation::DontSeeElementInDom)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeElementInDom, || {
            r.browser().dont_see_element_in_dom(selector)
        })
        .await
    }

    pub async fn see_in_page_source(&self, text: &str) -> Result<()> {
        self.gate(Operation::SeeInPageSource)?;
        let r = &self.runner;
        r.invoke(Operation::SeeInPageSource, || {
            r.browser().see_in_page_source(text)
        })
        .await
    }

    pub async fn dont_see_in_page_source(&self, text: &str) -> Result<()> {
        self.gate(Operation::DontSeeInPageSource)?;
        let r = &self.runner;
        r.invoke(Operation::DontSeeInPageSource, || {
            r.browser().dont_see_in_page_source(text)
        })
        .await
    }

    pub async fn get_visible_text(&self) -> Result<String> {
        self.gate(Operation::GetVisibleText)?;
        let r = &self.runner;
        r.invoke(Operation::GetVisibleText, || r.browser().get_visible_text())
            .await
    }

    pub async fn execute_js(&self, script: &str) -> Result<Value> {
        self.gate(Operation::ExecuteJs)?;
        let r = &self.runner;
        r.invoke(Operation::ExecuteJs, || r.browser().execute_js(script))
            .await
    }

    pub async fn execute_in_web_driver(&self, call: &WebDriverCall) -> Result<Value> {
        self.gate(Operation::ExecuteInWebDriver)?;
        let r = &self.runner;
        r.invoke(Operation::ExecuteInWebDriver, || {
            r.browser().execute_in_web_driver(call)
        })
        .await
    }

    pub async fn make_screenshot(&self, name: &str) -> Result<()> {
        self.gate(Operation::MakeScreenshot)?;
        let r = &self.runner;
        r.invoke(Operation::MakeScreenshot, || {
            r.browser().make_screenshot(name)
        })
        .await
    }

    pub async fn maximize_window(&self) -> Result<()> {
        self.gate(Operation::MaximizeWindow)?;
        let r = &self.runner;
        r.invoke(Operation::MaximizeWindow, || r.browser().maximize_window())
            .await
    }

    pub async fn resize_window(&self, width: u32, height: u32) -> Result<()> {
        self.gate(Operation::ResizeWindow)?;
        let r = &self.runner;
        r.invoke(Operation::ResizeWindow, || {
            r.browser().resize_window(width, height)
        })
        .await
    }

    pub async fn move_back(&self) -> Result<()> {
        self.gate(Operation::MoveBack)?;
        let r = &self.runner;
        r.invoke(Operation::MoveBack, || r.browser().move_back()).await
    }

    pub async fn move_forward(&self) -> Result<()> {
        self.gate(Operation::MoveForward)?;
        let r = &self.runner;
        r.invoke(Operation::MoveForward, || r.browser().move_forward())
            .await
    }

    pub async fn reload_page(&self) -> Result<()> {
        self.gate(Operation::ReloadPage)?;
        let r = &self.runner;
        r.invoke(Operation::ReloadPage, || r.browser().reload_page())
            .await
    }

    pub async fn switch_to_iframe(&self, locator: Option<&str>) -> Result<()> {
        self.gate(Operation::SwitchToIframe)?;
        let r = &self.runner;
        r.invoke(Operation::SwitchToIframe, || {
            r.browser().switch_to_iframe(locator)
        })
        .await
    }

    pub async fn switch_to_window(&self, name: Option<&str>) -> Result<()> {
        self.gate(Operation::SwitchToWindow)?;
        let r = &self.runner;
        r.invoke(Operation::SwitchToWindow, || {
            r.browser().switch_to_window(name)
        })
        .await
    }

    pub async fn pause_execution(&self) -> Result<()> {
        self.gate(Operation::PauseExecution)?;
        let r = &self.runner;
        r.invoke(Operation::PauseExecution, || r.browser().pause_execution())
            .await
    }

    pub async fn wait_for_element(&self, selector: &str, timeout_secs: u64) -> Result<()> {
        self.gate(Operation::WaitForElement)?;
        let r = &self.runner;
        r.invoke(Operation::WaitForElement, || {
            r.browser().wait_for_element(selector, timeout_secs)
        })
        .await
    }

    pub async fn wait_for_element_visible(
        &self,
        selector: &str,
        timeout_secs: u64,
    ) -> Result<()> {
        self.gate(Operation::WaitForElementVisible)?;
        let r = &self.runner;
        r.invoke(Operation::WaitForElementVisible, || {
            r.browser().wait_for_element_visible(selector, timeout_secs)
        })
        .await
    }

    pub async fn wait_for_element_not_visible(
        &self,
        selector: &str,
        timeout_secs: u64,
    ) -> Result<()> {
        self.gate(Operation::WaitForElementNotVisible)?;
        let r = &self.runner;
        r.invoke(Operation::WaitForElementNotVisible, || {
            r.browser().wait_for_element_not_visible(selector, timeout_secs)
        })
        .await
    }

    pub async fn wait_for_element_change(
        &self,
        selector: &str,
        check: &ElementPredicate,
        timeout_secs: u64,
    ) -> Result<()> {
        self.gate(Operation::WaitForElementChange)?;
        let r = &self.runner;
        r.invoke(Operation::WaitForElementChange, || {
            r.browser().wait_for_element_change(selector, check, timeout_secs)
        })
        .await
    }

    pub async fn wait_for_js(&self, script: &str, timeout_secs: u64) -> Result<()> {
        self.gate(Operation::WaitForJs)?;
        let r = &self.runner;
        r.invoke(Operation::WaitForJs, || {
            r.browser().wait_for_js(script, timeout_secs)
        })
        .await
    }

    pub async fn wait_for_text(
        &self,
        text: &str,
        timeout_secs: u64,
        selector: Option<&str>,
    ) -> Result<()> {
        self.gate(Operation::WaitForText)?;
        let r = &self.runner;
        r.invoke(Operation::WaitForText, || {
            r.browser().wait_for_text(text, timeout_secs, selector)
        })
        .await
    }

    // --- lifecycle hooks, not gated and not retried ---

    pub async fn initialize(&self) -> Result<()> {
        self.runner.browser().initialize().await
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.runner.browser().cleanup().await
    }

    pub async fn before_suite(&self) -> Result<()> {
        self.runner.browser().before_suite().await
    }

    pub async fn after_suite(&self) -> Result<()> {
        self.runner.browser().after_suite().await
    }

    pub async fn before_step(&self, step: &str) -> Result<()> {
        self.runner.browser().before_step(step).await
    }

    pub async fn after_step(&self, step: &str) -> Result<()> {
        self.runner.browser().after_step(step).await
    }

    pub async fn before_test(&self, test: &str) -> Result<()> {
        self.runner.browser().before_test(test).await
    }

    pub async fn after_test(&self, test: &str) -> Result<()> {
        self.runner.browser().after_test(test).await
    }

    pub async fn on_failure(&self, test: &str) -> Result<()> {
        self.runner.browser().on_failure(test).await
    }
}

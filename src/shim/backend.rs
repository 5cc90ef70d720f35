//! The backend trait both Automation Instances implement.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BackendKind;
use crate::error::{Result, ShimError};
use crate::shim::capability::Operation;

/// Escape hatch callback run against the raw HTTP engine.
pub type HttpEngineCall = Box<
    dyn for<'a> Fn(&'a reqwest::Client, &'a reqwest::Url) -> BoxFuture<'a, Result<Value>>
        + Send
        + Sync,
>;

/// Escape hatch callback run against the raw WebDriver session.
pub type WebDriverCall =
    Box<dyn for<'a> Fn(&'a thirtyfour::WebDriver) -> BoxFuture<'a, Result<Value>> + Send + Sync>;

/// Predicate polled by `wait_for_element_change`.
pub type ElementPredicate =
    Box<dyn for<'a> Fn(&'a thirtyfour::WebElement) -> BoxFuture<'a, Result<bool>> + Send + Sync>;

/// Session state snapshot that can be carried across tests and restored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    pub cookies: Vec<SessionCookie>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

/// Union operation surface of the two backend kinds.
///
/// Shared operations are required methods. Kind-restricted operations come
/// with a default body returning the typed unsupported error, so each backend
/// implements exactly the set it can honor. The actor gates calls against the
/// capability table before dispatch; the defaults answer direct backend use.
#[async_trait]
pub trait Browser: Send + Sync {
    fn kind(&self) -> BackendKind;

    // --- navigation ---

    /// Opens `path` relative to the configured base URL.
    async fn am_on_page(&self, path: &str) -> Result<()>;

    /// Swaps the leftmost host label of the base URL. Does not navigate.
    async fn am_on_subdomain(&self, subdomain: &str) -> Result<()>;

    /// Opens an absolute URL and rebases the session host onto it.
    async fn am_on_url(&self, url: &str) -> Result<()>;

    // --- page interaction ---

    async fn attach_file(&self, field: &str, filename: &str) -> Result<()>;
    async fn check_option(&self, option: &str) -> Result<()>;

    /// Clicks a link or button matched by visible text or CSS selector,
    /// optionally scoped to a `context` selector.
    async fn click(&self, target: &str, context: Option<&str>) -> Result<()>;

    async fn fill_field(&self, field: &str, value: &str) -> Result<()>;
    async fn select_option(&self, select: &str, option: &str) -> Result<()>;
    async fn uncheck_option(&self, option: &str) -> Result<()>;

    // --- assertions ---

    async fn see(&self, text: &str, selector: Option<&str>) -> Result<()>;
    async fn dont_see(&self, text: &str, selector: Option<&str>) -> Result<()>;
    async fn see_element(&self, selector: &str) -> Result<()>;
    async fn dont_see_element(&self, selector: &str) -> Result<()>;
    async fn see_link(&self, text: &str, url: Option<&str>) -> Result<()>;
    async fn dont_see_link(&self, text: &str, url: Option<&str>) -> Result<()>;
    async fn see_in_title(&self, title: &str) -> Result<()>;
    async fn dont_see_in_title(&self, title: &str) -> Result<()>;
    async fn see_in_field(&self, field: &str, value: &str) -> Result<()>;
    async fn dont_see_in_field(&self, field: &str, value: &str) -> Result<()>;
    async fn see_checkbox_is_checked(&self, checkbox: &str) -> Result<()>;
    async fn dont_see_checkbox_is_checked(&self, checkbox: &str) -> Result<()>;
    async fn see_option_is_selected(&self, select: &str, text: &str) -> Result<()>;
    async fn dont_see_option_is_selected(&self, select: &str, text: &str) -> Result<()>;
    async fn see_number_of_elements(&self, selector: &str, expected: usize) -> Result<()>;

    // --- current URL ---

    async fn see_in_current_url(&self, fragment: &str) -> Result<()>;
    async fn dont_see_in_current_url(&self, fragment: &str) -> Result<()>;
    async fn see_current_url_equals(&self, uri: &str) -> Result<()>;
    async fn dont_see_current_url_equals(&self, uri: &str) -> Result<()>;
    async fn see_current_url_matches(&self, pattern: &str) -> Result<()>;
    async fn dont_see_current_url_matches(&self, pattern: &str) -> Result<()>;

    /// Returns the current relative URI, or the first capture of `pattern`
    /// applied to it.
    async fn grab_from_current_url(&self, pattern: Option<&str>) -> Result<String>;

    // --- extraction ---

    async fn grab_text_from(&self, selector: &str) -> Result<String>;
    async fn grab_value_from(&self, field: &str) -> Result<String>;
    async fn grab_attribute_from(&self, selector: &str, attribute: &str)
        -> Result<Option<String>>;

    // --- cookies ---

    async fn set_cookie(&self, name: &str, value: &str) -> Result<()>;
    async fn grab_cookie(&self, name: &str) -> Result<Option<String>>;
    async fn see_cookie(&self, name: &str) -> Result<()>;
    async fn dont_see_cookie(&self, name: &str) -> Result<()>;
    async fn reset_cookie(&self, name: &str) -> Result<()>;

    // --- timing ---

    /// Blocks the scenario for `seconds`. Zero must return without sleeping.
    async fn wait(&self, seconds: u64) -> Result<()>;

    // --- session ---

    async fn get_url(&self) -> Result<String>;
    async fn initialize_session(&self) -> Result<()>;
    async fn load_session_data(&self, data: &SessionData) -> Result<()>;
    async fn backup_session_data(&self) -> Result<SessionData>;
    async fn close_session(&self) -> Result<()>;

    // --- HTTP emulation only ---

    async fn am_http_authenticated(&self, _username: &str, _password: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::AmHttpAuthenticated.name(),
            self.kind(),
        ))
    }

    async fn execute_in_http_engine(&self, _call: &HttpEngineCall) -> Result<Value> {
        Err(ShimError::unsupported(
            Operation::ExecuteInHttpEngine.name(),
            self.kind(),
        ))
    }

    async fn see_page_not_found(&self) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SeePageNotFound.name(),
            self.kind(),
        ))
    }

    async fn see_response_code_is(&self, _code: u16) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SeeResponseCodeIs.name(),
            self.kind(),
        ))
    }

    async fn send_ajax_get_request(&self, _uri: &str, _params: &[(String, String)]) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SendAjaxGetRequest.name(),
            self.kind(),
        ))
    }

    async fn send_ajax_post_request(&self, _uri: &str, _params: &[(String, String)]) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SendAjaxPostRequest.name(),
            self.kind(),
        ))
    }

    async fn send_ajax_request(
        &self,
        _method: &str,
        _uri: &str,
        _params: &[(String, String)],
    ) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SendAjaxRequest.name(),
            self.kind(),
        ))
    }

    async fn set_header(&self, _name: &str, _value: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SetHeader.name(),
            self.kind(),
        ))
    }

    // --- real browser only ---

    async fn accept_popup(&self) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::AcceptPopup.name(),
            self.kind(),
        ))
    }

    async fn cancel_popup(&self) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::CancelPopup.name(),
            self.kind(),
        ))
    }

    async fn see_in_popup(&self, _text: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SeeInPopup.name(),
            self.kind(),
        ))
    }

    async fn type_in_popup(&self, _keys: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::TypeInPopup.name(),
            self.kind(),
        ))
    }

    async fn append_field(&self, _field: &str, _value: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::AppendField.name(),
            self.kind(),
        ))
    }

    async fn unselect_option(&self, _select: &str, _option: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::UnselectOption.name(),
            self.kind(),
        ))
    }

    async fn click_with_right_button(&self, _selector: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::ClickWithRightButton.name(),
            self.kind(),
        ))
    }

    async fn double_click(&self, _selector: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::DoubleClick.name(),
            self.kind(),
        ))
    }

    async fn drag_and_drop(&self, _source: &str, _target: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::DragAndDrop.name(),
            self.kind(),
        ))
    }

    async fn move_mouse_over(&self, _selector: &str, _offset: Option<(i64, i64)>) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::MoveMouseOver.name(),
            self.kind(),
        ))
    }

    async fn press_key(&self, _selector: &str, _key: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::PressKey.name(),
            self.kind(),
        ))
    }

    /// Number of elements currently matching `selector`.
    async fn count_elements(&self, _selector: &str) -> Result<usize> {
        Err(ShimError::unsupported(
            Operation::CountElements.name(),
            self.kind(),
        ))
    }

    async fn see_element_in_dom(&self, _selector: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SeeElementInDom.name(),
            self.kind(),
        ))
    }

    async fn dont_see_element_in_dom(&self, _selector: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::DontSeeElementInDom.name(),
            self.kind(),
        ))
    }

    async fn see_in_page_source(&self, _text: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SeeInPageSource.name(),
            self.kind(),
        ))
    }

    async fn dont_see_in_page_source(&self, _text: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::DontSeeInPageSource.name(),
            self.kind(),
        ))
    }

    async fn get_visible_text(&self) -> Result<String> {
        Err(ShimError::unsupported(
            Operation::GetVisibleText.name(),
            self.kind(),
        ))
    }

    async fn execute_js(&self, _script: &str) -> Result<Value> {
        Err(ShimError::unsupported(
            Operation::ExecuteJs.name(),
            self.kind(),
        ))
    }

    async fn execute_in_web_driver(&self, _call: &WebDriverCall) -> Result<Value> {
        Err(ShimError::unsupported(
            Operation::ExecuteInWebDriver.name(),
            self.kind(),
        ))
    }

    async fn make_screenshot(&self, _name: &str) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::MakeScreenshot.name(),
            self.kind(),
        ))
    }

    async fn maximize_window(&self) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::MaximizeWindow.name(),
            self.kind(),
        ))
    }

    async fn resize_window(&self, _width: u32, _height: u32) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::ResizeWindow.name(),
            self.kind(),
        ))
    }

    async fn move_back(&self) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::MoveBack.name(),
            self.kind(),
        ))
    }

    async fn move_forward(&self) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::MoveForward.name(),
            self.kind(),
        ))
    }

    async fn reload_page(&self) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::ReloadPage.name(),
            self.kind(),
        ))
    }

    async fn switch_to_iframe(&self, _locator: Option<&str>) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SwitchToIframe.name(),
            self.kind(),
        ))
    }

    async fn switch_to_window(&self, _name: Option<&str>) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::SwitchToWindow.name(),
            self.kind(),
        ))
    }

    async fn pause_execution(&self) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::PauseExecution.name(),
            self.kind(),
        ))
    }

    async fn wait_for_element(&self, _selector: &str, _timeout_secs: u64) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::WaitForElement.name(),
            self.kind(),
        ))
    }

    async fn wait_for_element_visible(&self, _selector: &str, _timeout_secs: u64) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::WaitForElementVisible.name(),
            self.kind(),
        ))
    }

    async fn wait_for_element_not_visible(
        &self,
        _selector: &str,
        _timeout_secs: u64,
    ) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::WaitForElementNotVisible.name(),
            self.kind(),
        ))
    }

    async fn wait_for_element_change(
        &self,
        _selector: &str,
        _check: &ElementPredicate,
        _timeout_secs: u64,
    ) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::WaitForElementChange.name(),
            self.kind(),
        ))
    }

    async fn wait_for_js(&self, _script: &str, _timeout_secs: u64) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::WaitForJs.name(),
            self.kind(),
        ))
    }

    async fn wait_for_text(
        &self,
        _text: &str,
        _timeout_secs: u64,
        _selector: Option<&str>,
    ) -> Result<()> {
        Err(ShimError::unsupported(
            Operation::WaitForText.name(),
            self.kind(),
        ))
    }

    // --- lifecycle hooks, forwarded verbatim by the actor ---

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    async fn before_suite(&self) -> Result<()> {
        Ok(())
    }

    async fn after_suite(&self) -> Result<()> {
        Ok(())
    }

    async fn before_step(&self, _step: &str) -> Result<()> {
        Ok(())
    }

    async fn after_step(&self, _step: &str) -> Result<()> {
        Ok(())
    }

    async fn before_test(&self, _test: &str) -> Result<()> {
        Ok(())
    }

    async fn after_test(&self, _test: &str) -> Result<()> {
        Ok(())
    }

    /// Called when a test failed. Must not fail itself.
    async fn on_failure(&self, _test: &str) -> Result<()> {
        Ok(())
    }
}

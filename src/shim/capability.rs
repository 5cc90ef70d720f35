//! Capability table for the multiplexed operation surface.
//!
//! Every operation the actor forwards is named here and tagged with the
//! backend kinds that implement it. The actor consults this table once per
//! call, before anything reaches the backend, so an unsupported call can
//! never leave a half-applied side effect behind.

use crate::config::BackendKind;

/// Which backend kinds implement an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Implemented by both backend kinds.
    Common,
    /// Only meaningful for the HTTP browser emulation.
    DirectHttpOnly,
    /// Requires a real browser behind a WebDriver session.
    RemoteDriverOnly,
}

/// Every operation the actor can forward, one variant per public method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    // Shared surface
    AmOnPage,
    AmOnSubdomain,
    AmOnUrl,
    AttachFile,
    CheckOption,
    Click,
    DontSee,
    DontSeeCheckboxIsChecked,
    DontSeeCookie,
    DontSeeCurrentUrlEquals,
    DontSeeCurrentUrlMatches,
    DontSeeElement,
    DontSeeInCurrentUrl,
    DontSeeInField,
    DontSeeInTitle,
    DontSeeLink,
    DontSeeOptionIsSelected,
    FillField,
    GrabAttributeFrom,
    GrabCookie,
    GrabFromCurrentUrl,
    GrabTextFrom,
    GrabValueFrom,
    ResetCookie,
    See,
    SeeCheckboxIsChecked,
    SeeCookie,
    SeeCurrentUrlEquals,
    SeeCurrentUrlMatches,
    SeeElement,
    SeeInCurrentUrl,
    SeeInField,
    SeeInTitle,
    SeeLink,
    SeeNumberOfElements,
    SeeOptionIsSelected,
    SelectOption,
    SetCookie,
    UncheckOption,
    Wait,
    ElementExists,
    GetUrl,
    InitializeSession,
    LoadSessionData,
    BackupSessionData,
    CloseSession,

    // HTTP emulation only
    AmHttpAuthenticated,
    ExecuteInHttpEngine,
    SeePageNotFound,
    SeeResponseCodeIs,
    SendAjaxGetRequest,
    SendAjaxPostRequest,
    SendAjaxRequest,
    SetHeader,

    // Real browser only
    AcceptPopup,
    AppendField,
    CancelPopup,
    ClickWithRightButton,
    CountElements,
    DontSeeElementInDom,
    DontSeeInPageSource,
    DoubleClick,
    DragAndDrop,
    ExecuteInWebDriver,
    ExecuteJs,
    GetVisibleText,
    MakeScreenshot,
    MaximizeWindow,
    MoveBack,
    MoveForward,
    MoveMouseOver,
    PauseExecution,
    PressKey,
    ReloadPage,
    ResizeWindow,
    SeeElementInDom,
    SeeInPageSource,
    SeeInPopup,
    SwitchToIframe,
    SwitchToWindow,
    TypeInPopup,
    UnselectOption,
    WaitForElement,
    WaitForElementChange,
    WaitForElementNotVisible,
    WaitForElementVisible,
    WaitForJs,
    WaitForText,
}

impl Operation {
    /// Capability tag for this operation. Exhaustive on purpose: adding an
    /// operation without classifying it must not compile.
    pub fn capability(&self) -> Capability {
        use Operation::*;
        match self {
            AmOnPage | AmOnSubdomain | AmOnUrl | AttachFile | CheckOption | Click | DontSee
            | DontSeeCheckboxIsChecked | DontSeeCookie | DontSeeCurrentUrlEquals
            | DontSeeCurrentUrlMatches | DontSeeElement | DontSeeInCurrentUrl | DontSeeInField
            | DontSeeInTitle | DontSeeLink | DontSeeOptionIsSelected | FillField
            | GrabAttributeFrom | GrabCookie | GrabFromCurrentUrl | GrabTextFrom
            | GrabValueFrom | ResetCookie | See | SeeCheckboxIsChecked | SeeCookie
            | SeeCurrentUrlEquals | SeeCurrentUrlMatches | SeeElement | SeeInCurrentUrl
            | SeeInField | SeeInTitle | SeeLink | SeeNumberOfElements | SeeOptionIsSelected
            | SelectOption | SetCookie | UncheckOption | Wait | ElementExists | GetUrl
            | InitializeSession | LoadSessionData | BackupSessionData | CloseSession => {
                Capability::Common
            }

            AmHttpAuthenticated | ExecuteInHttpEngine | SeePageNotFound | SeeResponseCodeIs
            | SendAjaxGetRequest | SendAjaxPostRequest | SendAjaxRequest | SetHeader => {
                Capability::DirectHttpOnly
            }

            AcceptPopup | AppendField | CancelPopup | ClickWithRightButton | CountElements
            | DontSeeElementInDom | DontSeeInPageSource | DoubleClick | DragAndDrop
            | ExecuteInWebDriver | ExecuteJs | GetVisibleText | MakeScreenshot
            | MaximizeWindow | MoveBack | MoveForward | MoveMouseOver | PauseExecution
            | PressKey | ReloadPage | ResizeWindow | SeeElementInDom | SeeInPageSource
            | SeeInPopup | SwitchToIframe | SwitchToWindow | TypeInPopup | UnselectOption
            | WaitForElement | WaitForElementChange | WaitForElementNotVisible
            | WaitForElementVisible | WaitForJs | WaitForText => Capability::RemoteDriverOnly,
        }
    }

    pub fn supported_by(&self, kind: BackendKind) -> bool {
        match self.capability() {
            Capability::Common => true,
            Capability::DirectHttpOnly => kind == BackendKind::DirectHttp,
            Capability::RemoteDriverOnly => kind == BackendKind::RemoteDriver,
        }
    }

    /// Method name as it appears on the actor, used in error and log text.
    pub fn name(&self) -> &'static str {
        use Operation::*;
        match self {
            AmOnPage => "am_on_page",
            AmOnSubdomain => "am_on_subdomain",
            AmOnUrl => "am_on_url",
            AttachFile => "attach_file",
            CheckOption => "check_option",
            Click => "click",
            DontSee => "dont_see",
            DontSeeCheckboxIsChecked => "dont_see_checkbox_is_checked",
            DontSeeCookie => "dont_see_cookie",
            DontSeeCurrentUrlEquals => "dont_see_current_url_equals",
            DontSeeCurrentUrlMatches => "dont_see_current_url_matches",
            DontSeeElement => "dont_see_element",
            DontSeeInCurrentUrl => "dont_see_in_current_url",
            DontSeeInField => "dont_see_in_field",
            DontSeeInTitle => "dont_see_in_title",
            DontSeeLink => "dont_see_link",
            DontSeeOptionIsSelected => "dont_see_option_is_selected",
            FillField => "fill_field",
            GrabAttributeFrom => "grab_attribute_from",
            GrabCookie => "grab_cookie",
            GrabFromCurrentUrl => "grab_from_current_url",
            GrabTextFrom => "grab_text_from",
            GrabValueFrom => "grab_value_from",
            ResetCookie => "reset_cookie",
            See => "see",
            SeeCheckboxIsChecked => "see_checkbox_is_checked",
            SeeCookie => "see_cookie",
            SeeCurrentUrlEquals => "see_current_url_equals",
            SeeCurrentUrlMatches => "see_current_url_matches",
            SeeElement => "see_element",
            SeeInCurrentUrl => "see_in_current_url",
            SeeInField => "see_in_field",
            SeeInTitle => "see_in_title",
            SeeLink => "see_link",
            SeeNumberOfElements => "see_number_of_elements",
            SeeOptionIsSelected => "see_option_is_selected",
            SelectOption => "select_option",
            SetCookie => "set_cookie",
            UncheckOption => "uncheck_option",
            Wait => "wait",
            ElementExists => "element_exists",
            GetUrl => "get_url",
            InitializeSession => "initialize_session",
            LoadSessionData => "load_session_data",
            BackupSessionData => "backup_session_data",
            CloseSession => "close_session",
            AmHttpAuthenticated => "am_http_authenticated",
            ExecuteInHttpEngine => "execute_in_http_engine",
            SeePageNotFound => "see_page_not_found",
            SeeResponseCodeIs => "see_response_code_is",
            SendAjaxGetRequest => "send_ajax_get_request",
            SendAjaxPostRequest => "send_ajax_post_request",
            SendAjaxRequest => "send_ajax_request",
            SetHeader => "set_header",
            AcceptPopup => "accept_popup",
            AppendField => "append_field",
            CancelPopup => "cancel_popup",
            ClickWithRightButton => "click_with_right_button",
            CountElements => "count_elements",
            DontSeeElementInDom => "dont_see_element_in_dom",
            DontSeeInPageSource => "dont_see_in_page_source",
            DoubleClick => "double_click",
            DragAndDrop => "drag_and_drop",
            ExecuteInWebDriver => "execute_in_web_driver",
            ExecuteJs => "execute_js",
            GetVisibleText => "get_visible_text",
            MakeScreenshot => "make_screenshot",
            MaximizeWindow => "maximize_window",
            MoveBack => "move_back",
            MoveForward => "move_forward",
            MoveMouseOver => "move_mouse_over",
            PauseExecution => "pause_execution",
            PressKey => "press_key",
            ReloadPage => "reload_page",
            ResizeWindow => "resize_window",
            SeeElementInDom => "see_element_in_dom",
            SeeInPageSource => "see_in_page_source",
            SeeInPopup => "see_in_popup",
            SwitchToIframe => "switch_to_iframe",
            SwitchToWindow => "switch_to_window",
            TypeInPopup => "type_in_popup",
            UnselectOption => "unselect_option",
            WaitForElement => "wait_for_element",
            WaitForElementChange => "wait_for_element_change",
            WaitForElementNotVisible => "wait_for_element_not_visible",
            WaitForElementVisible => "wait_for_element_visible",
            WaitForJs => "wait_for_js",
            WaitForText => "wait_for_text",
        }
    }
}

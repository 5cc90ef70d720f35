//! The search form on the home page.

use crate::error::Result;
use crate::pages::{base, ResultsPage};
use crate::shim::BrowserActor;

pub const FROM_FIELD: &str = "input[id='from_filter']";
pub const TO_FIELD: &str = "input[id='to_filter']";
pub const DEPARTURE_DATE: &str = "#departure_date";
pub const PERSON_COUNTER: &str = "div[id='person-counter']";
pub const SEARCH_BUTTON: &str = "#search-form__submit-btn";
pub const HOTEL_CHECKBOX: &str = ".hotel-checkboxes";
pub const AIRBNB_CHECKBOX: &str = "[data-partner='airbnb'] span";

/// How long a search may take to settle on the results page.
const PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

pub struct SearchPage<'a> {
    actor: &'a BrowserActor,
}

impl<'a> SearchPage<'a> {
    pub fn of(actor: &'a BrowserActor) -> Self {
        Self { actor }
    }

    /// Opens the home page and checks that no error banner is shown.
    pub async fn open(self) -> Result<Self> {
        base::open_page(self.actor, "/").await?;
        base::assert_no_http_errors_displayed(self.actor).await?;
        Ok(self)
    }

    /// Searches with the default departure date and lands on the results
    /// page. Only a real browser needs to wait for the page to finish
    /// rendering; the HTTP emulation is done when the response is parsed.
    pub async fn search(&self, from: &str, to: &str) -> Result<ResultsPage<'a>> {
        let i = self.actor;
        i.fill_field(FROM_FIELD, from).await?;
        i.fill_field(TO_FIELD, to).await?;
        i.click(SEARCH_BUTTON, None).await?;
        if i.is_remote_driver() {
            i.wait_for_js(
                "return document.readyState === 'complete'",
                PAGE_LOAD_TIMEOUT_SECS,
            )
            .await?;
        }
        Ok(ResultsPage::of(i))
    }
}

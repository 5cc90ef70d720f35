//! The search results page.

use crate::error::{Result, ShimError};
use crate::shim::BrowserActor;

pub const SORT_BY_PRICE: &str = "#sortby-price";
pub const SORT_BY_TRAVEL_TIME: &str = "#sortby-traveltime";
pub const TRAIN_RESULT: &str = "div[id='results-train'] div[class='result']";
pub const NEXT_PAGE_LINK: &str = ".pagination a[rel='next']";

/// How long the result list may take to become visible.
const RESULTS_TIMEOUT_SECS: u64 = 30;

pub struct ResultsPage<'a> {
    actor: &'a BrowserActor,
}

impl<'a> ResultsPage<'a> {
    pub fn of(actor: &'a BrowserActor) -> Self {
        Self { actor }
    }

    pub async fn sort_by_price(&self) -> Result<()> {
        self.actor.click(SORT_BY_PRICE, None).await
    }

    pub async fn has_next_page(&self) -> Result<bool> {
        self.actor.element_exists(NEXT_PAGE_LINK).await
    }

    pub async fn go_to_next_page(&self) -> Result<()> {
        self.actor.click(NEXT_PAGE_LINK, None).await
    }

    /// Number of train results on the current page.
    ///
    /// The remote driver waits for the list to render, then counts matches.
    /// The HTTP emulation has no counting operation, so it probes result
    /// positions until one is missing.
    pub async fn train_results_on_page(&self) -> Result<usize> {
        if self.actor.is_remote_driver() {
            self.actor
                .wait_for_element_visible(TRAIN_RESULT, RESULTS_TIMEOUT_SECS)
                .await?;
            return self.actor.count_elements(TRAIN_RESULT).await;
        }
        let mut count = 0;
        loop {
            let probe = format!("{TRAIN_RESULT}:nth-child({})", count + 1);
            if !self.actor.element_exists(&probe).await? {
                return Ok(count);
            }
            count += 1;
        }
    }

    /// Train fare at `position` (1-based), assembled from the integer and
    /// decimal price fragments.
    pub async fn train_fare(&self, position: usize) -> Result<f64> {
        let result = format!("{TRAIN_RESULT}:nth-child({position})");
        let units = self
            .actor
            .grab_text_from(&format!("{result} .currency-beforecomma"))
            .await?;
        let cents = self
            .actor
            .grab_text_from(&format!("{result} .currency-decimals"))
            .await?;
        let fare = format!("{}.{}", units.trim(), cents.trim());
        fare.parse().map_err(|_| {
            ShimError::assertion(format!(
                "fare '{fare}' at position {position} is not a number"
            ))
        })
    }

    /// Walks every result page and asserts fares never decrease.
    pub async fn verify_prices_ascending(&self) -> Result<()> {
        let mut previous = 0.0_f64;
        let mut page = 1_u32;
        loop {
            if page > 1 {
                self.go_to_next_page().await?;
            }
            let count = self.train_results_on_page().await?;
            tracing::debug!(page, count, "checking fares");
            for position in 1..=count {
                let fare = self.train_fare(position).await?;
                if fare < previous {
                    return Err(ShimError::assertion(format!(
                        "fare {fare} at position {position} on page {page} is below {previous}"
                    )));
                }
                previous = fare;
            }
            if !self.has_next_page().await? {
                return Ok(());
            }
            page += 1;
        }
    }
}

//! Assertions shared by every page object.

use crate::error::Result;
use crate::shim::BrowserActor;

/// Error banners the site renders when one of its upstream calls failed.
const HTTP_ERROR_MARKERS: [&str; 3] = ["HTTP 404", "HTTP 504", "HTTP 503"];

pub async fn open_page(actor: &BrowserActor, path: &str) -> Result<()> {
    actor.am_on_page(path).await
}

/// The page rendered without any of the HTTP error banners.
pub async fn assert_no_http_errors_displayed(actor: &BrowserActor) -> Result<()> {
    for marker in HTTP_ERROR_MARKERS {
        actor.dont_see(marker, None).await?;
    }
    Ok(())
}

pub async fn assert_no_fatal_error(actor: &BrowserActor) -> Result<()> {
    actor.dont_see("Fatal Error", None).await
}

pub async fn assert_url(actor: &BrowserActor, fragment: &str) -> Result<()> {
    actor.see_in_current_url(fragment).await
}

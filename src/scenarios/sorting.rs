//! Price sorting scenarios for train search results.

use crate::error::Result;
use crate::pages::SearchPage;
use crate::shim::BrowserActor;

/// All train fares on the first result page are sorted ascending by price.
pub async fn price_ascending_single_page(actor: &BrowserActor) -> Result<()> {
    let results = SearchPage::of(actor)
        .open()
        .await?
        .search("Berlin, Germany", "Prague, Czech Republic")
        .await?;
    results.sort_by_price().await?;
    results.verify_prices_ascending().await
}

/// Fares remain ascending when walking every result page of a longer route.
pub async fn price_ascending_across_pages(actor: &BrowserActor) -> Result<()> {
    let results = SearchPage::of(actor)
        .open()
        .await?
        .search("Berlin, Germany", "Munich, Germany")
        .await?;
    results.sort_by_price().await?;
    results.verify_prices_ascending().await
}
